use crate::cmd::open_vault;
use crate::output::print_json;
use anyhow::Context;
use forge_core::vault::{Provider, SettingsUpdate};
use std::path::Path;

pub fn run(
    home: &Path,
    default_model: Option<String>,
    default_provider: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let mut vault = open_vault(home)?;
    let provider = default_provider
        .map(str::parse::<Provider>)
        .transpose()
        .context("invalid --default-provider")?;
    let already = vault.is_initialized();

    vault
        .update_settings(SettingsUpdate {
            default_model,
            default_provider: provider,
            ..Default::default()
        })
        .context("failed to store settings")?;
    if !already {
        vault.mark_initialized().context("failed to initialize vault")?;
    }

    if json {
        return print_json(&serde_json::json!({
            "vault": vault.file_path(),
            "skills_dir": vault.skills_dir(),
            "agents_dir": vault.agents_dir(),
            "already_initialized": already,
        }));
    }

    if already {
        println!("Vault already initialized: {}", vault.file_path().display());
    } else {
        println!("Initialized vault: {}", vault.file_path().display());
    }
    println!("  skills:     {}", vault.skills_dir().display());
    println!("  agents:     {}", vault.agents_dir().display());
    println!("  blueprints: {}", vault.blueprints_dir().display());
    let missing = vault.missing_keys();
    if !missing.is_empty() {
        println!(
            "\nNo API key yet for {} provider(s). Add one with: forge vault set-key <provider> <key>",
            missing.len()
        );
    }
    Ok(())
}
