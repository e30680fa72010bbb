use crate::cmd::open_vault;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use forge_core::theme;
use forge_core::vault::{DirOverrides, Provider, SettingsUpdate, Vault};
use std::path::Path;

// ---------------------------------------------------------------------------
// Subcommand tree
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum VaultSubcommand {
    /// Key status and settings at a glance
    Status,
    /// Masked keys of the active profile
    Keys,
    /// Store a provider key on the active profile
    SetKey {
        /// google_ai, anthropic, github_copilot, nvidia or opencode_zen
        provider: String,
        value: String,
    },
    /// Clear a provider key on the active profile
    UnsetKey { provider: String },
    /// Keys for custom endpoints
    CustomKey {
        #[command(subcommand)]
        subcommand: CustomKeySubcommand,
    },
    /// Named key profiles
    Profile {
        #[command(subcommand)]
        subcommand: ProfileSubcommand,
    },
    /// Update global settings
    Set {
        #[arg(long)]
        default_model: Option<String>,
        #[arg(long)]
        default_provider: Option<String>,
        #[arg(long)]
        base_path: Option<String>,
        #[arg(long)]
        theme: Option<String>,
        /// Skill marketplace index URL (empty string resets to the default)
        #[arg(long)]
        marketplace_url: Option<String>,
    },
    /// Override global directories
    Dirs {
        #[arg(long)]
        skills: Option<String>,
        #[arg(long)]
        agents: Option<String>,
        #[arg(long)]
        logs: Option<String>,
        #[arg(long)]
        blueprints: Option<String>,
    },
    /// Override per-project subdirectories
    ProjectDirs {
        #[arg(long)]
        skills: Option<String>,
        #[arg(long)]
        agents: Option<String>,
    },
    /// Print shell export lines for the active keys
    Export {
        /// Also write them to ~/.nebula-forge/exports.sh
        #[arg(long)]
        write: bool,
    },
    /// List available themes
    Themes,
}

#[derive(Subcommand)]
pub enum CustomKeySubcommand {
    Set { name: String, value: String },
    Remove { name: String },
}

#[derive(Subcommand)]
pub enum ProfileSubcommand {
    List,
    Create { name: String },
    Switch { name: String },
    Delete { name: String },
}

fn parse_provider(raw: &str) -> anyhow::Result<Provider> {
    raw.parse::<Provider>().with_context(|| {
        let known: Vec<&str> = Provider::all().iter().map(|p| p.as_str()).collect();
        format!("expected one of: {}", known.join(", "))
    })
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub fn run(home: &Path, subcmd: VaultSubcommand, json: bool) -> anyhow::Result<()> {
    let mut vault = open_vault(home)?;
    match subcmd {
        VaultSubcommand::Status => status(&vault, json),
        VaultSubcommand::Keys => keys(&vault, json),
        VaultSubcommand::SetKey { provider, value } => {
            let p = parse_provider(&provider)?;
            vault.set_key(p, &value).context("failed to store key")?;
            println!("{} key set on profile '{}'", p.label(), vault.active_profile());
            Ok(())
        }
        VaultSubcommand::UnsetKey { provider } => {
            let p = parse_provider(&provider)?;
            vault.unset_key(p).context("failed to clear key")?;
            println!("{} key cleared", p.label());
            Ok(())
        }
        VaultSubcommand::CustomKey { subcommand } => match subcommand {
            CustomKeySubcommand::Set { name, value } => {
                vault.set_custom_key(&name, &value).context("failed to store custom key")?;
                println!("Custom key '{name}' set");
                Ok(())
            }
            CustomKeySubcommand::Remove { name } => {
                vault.remove_custom_key(&name).context("failed to remove custom key")?;
                println!("Custom key '{name}' removed");
                Ok(())
            }
        },
        VaultSubcommand::Profile { subcommand } => profile(&mut vault, subcommand, json),
        VaultSubcommand::Set {
            default_model,
            default_provider,
            base_path,
            theme,
            marketplace_url,
        } => {
            let default_provider = default_provider.as_deref().map(parse_provider).transpose()?;
            vault
                .update_settings(SettingsUpdate {
                    default_model,
                    default_provider,
                    base_path,
                    theme,
                    marketplace_url,
                })
                .context("failed to update settings")?;
            println!("Settings saved");
            Ok(())
        }
        VaultSubcommand::Dirs {
            skills,
            agents,
            logs,
            blueprints,
        } => {
            vault
                .update_dirs(DirOverrides { skills, agents, logs, blueprints })
                .context("failed to update directories")?;
            vault.ensure_dirs()?;
            println!("skills:     {}", vault.skills_dir().display());
            println!("agents:     {}", vault.agents_dir().display());
            println!("logs:       {}", vault.logs_dir().display());
            println!("blueprints: {}", vault.blueprints_dir().display());
            Ok(())
        }
        VaultSubcommand::ProjectDirs { skills, agents } => {
            vault
                .update_project_dirs(skills, agents)
                .context("failed to update project directories")?;
            let cfg = vault.config();
            println!("project skills: {}", cfg.project_skills_subdir);
            println!("project agents: {}", cfg.project_agents_subdir);
            Ok(())
        }
        VaultSubcommand::Export { write } => {
            let exports = vault.env_exports();
            if write {
                let path = vault.write_exports().context("failed to write exports")?;
                eprintln!("wrote {}", path.display());
            }
            if !exports.is_empty() {
                println!("{exports}");
            }
            Ok(())
        }
        VaultSubcommand::Themes => themes(&vault, json),
    }
}

// ---------------------------------------------------------------------------
// Views
// ---------------------------------------------------------------------------

fn status(vault: &Vault, json: bool) -> anyhow::Result<()> {
    let summary = vault.status_summary().context("failed to read vault status")?;
    if json {
        let map: serde_json::Map<String, serde_json::Value> = summary
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        return print_json(&map);
    }
    print_table(
        &["ITEM", "VALUE"],
        summary.into_iter().map(|(k, v)| vec![k, v]).collect(),
    );
    Ok(())
}

fn keys(vault: &Vault, json: bool) -> anyhow::Result<()> {
    let masked = vault.masked_keys();
    if json {
        let map: serde_json::Map<String, serde_json::Value> = masked
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect();
        return print_json(&map);
    }
    println!("Profile: {}", vault.active_profile());
    print_table(
        &["PROVIDER", "KEY"],
        masked.into_iter().map(|(k, v)| vec![k, v]).collect(),
    );
    Ok(())
}

fn profile(vault: &mut Vault, subcmd: ProfileSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        ProfileSubcommand::List => {
            let active = vault.active_profile().to_string();
            let profiles = vault.list_profiles();
            if json {
                return print_json(&serde_json::json!({
                    "active": active,
                    "profiles": profiles,
                }));
            }
            for p in profiles {
                let marker = if p == active { "*" } else { " " };
                println!("{marker} {p}");
            }
        }
        ProfileSubcommand::Create { name } => {
            let name = vault.create_profile(&name).context("failed to create profile")?;
            println!("Profile '{name}' created");
        }
        ProfileSubcommand::Switch { name } => {
            vault.switch_profile(&name).context("failed to switch profile")?;
            println!("Active profile: {name}");
        }
        ProfileSubcommand::Delete { name } => {
            vault.delete_profile(&name).context("failed to delete profile")?;
            println!("Profile '{name}' deleted");
        }
    }
    Ok(())
}

fn themes(vault: &Vault, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(&theme::THEMES);
    }
    let current = &vault.config().theme;
    print_table(
        &["", "KEY", "NAME"],
        theme::THEMES
            .iter()
            .map(|t| {
                let marker = if t.key == current.as_str() { "*" } else { "" };
                vec![marker.to_string(), t.key.to_string(), t.label.to_string()]
            })
            .collect(),
    );
    Ok(())
}
