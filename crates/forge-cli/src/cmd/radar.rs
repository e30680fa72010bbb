use crate::cmd::open_vault;
use crate::output::print_json;
use anyhow::Context;
use forge_core::radar::{self, Severity};
use std::path::Path;

pub fn run(home: &Path, project: &Path, json: bool) -> anyhow::Result<()> {
    let vault = open_vault(home)?;
    let health = radar::scan(&vault, project)
        .with_context(|| format!("failed to scan {}", project.display()))?;
    if json {
        return print_json(&health);
    }

    let check = |ok: bool| if ok { "✓" } else { "✗" };
    println!("Radar: {}", health.project_path.display());
    println!("  {} AGENTS.md", check(health.has_agents_md));
    println!("  {} opencode.json", check(health.has_opencode_json));
    println!("  {} .opencode/", check(health.has_opencode_dir));
    println!("  git: {}", health.git_status);
    if health.active_skills.is_empty() {
        println!("  skills: none");
    } else {
        println!("  skills: {}", health.active_skills.join(", "));
    }

    if health.is_healthy() {
        println!("\nAll clear.");
        return Ok(());
    }
    println!();
    for w in &health.warnings {
        let icon = match w.severity {
            Severity::Error => "✗",
            Severity::Warning => "!",
            Severity::Info => "·",
        };
        println!("{icon} [{}] {} ({})", w.code, w.message, w.action);
    }
    Ok(())
}
