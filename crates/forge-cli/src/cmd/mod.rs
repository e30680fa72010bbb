pub mod blueprint;
pub mod cookbook;
pub mod init;
pub mod market;
pub mod mcp;
pub mod plugin;
pub mod project;
pub mod radar;
pub mod session;
pub mod skill;
pub mod sync;
pub mod vault;

use anyhow::Context;
use forge_core::io;
use forge_core::provisioner::{self, ExecutionReport, ProvisionPlan};
use forge_core::vault::Vault;
use std::path::Path;

pub(crate) fn open_vault(home: &Path) -> anyhow::Result<Vault> {
    Vault::open(home).with_context(|| format!("failed to open vault under {}", home.display()))
}

/// Print the ghost diff of `plan`: one line per entry, then unified diffs
/// when `full` is set.
pub(crate) fn print_ghost_diff(plan: &ProvisionPlan, full: bool) -> anyhow::Result<()> {
    let entries = provisioner::ghost_diff(plan).context("failed to preview plan")?;
    println!("{}", plan.title);
    println!("  {}", plan.summary());
    for e in &entries {
        let stats = if e.stats.is_empty() {
            String::new()
        } else {
            format!("  (+{} -{})", e.stats.added, e.stats.removed)
        };
        println!("  {:<8} {}{stats}", e.action.as_str(), e.path);
    }
    if full {
        for e in &entries {
            if let Some(diff) = e.unified.as_deref().filter(|d| !d.is_empty()) {
                println!();
                print!("{diff}");
                if !diff.ends_with('\n') {
                    println!();
                }
            }
        }
    }
    Ok(())
}

/// Execute `plan`, echo progress, and record the run in the provision log.
pub(crate) fn apply_plan(vault: &Vault, plan: &ProvisionPlan, quiet: bool) -> anyhow::Result<ExecutionReport> {
    let report = provisioner::execute_plan(plan, |msg, fraction| {
        if !quiet {
            println!("[{:>3.0}%] {msg}", fraction * 100.0);
        }
    })
    .with_context(|| format!("failed to apply '{}'", plan.title))?;

    let line = format!(
        "{} {}: applied {}, skipped {}\n",
        chrono::Local::now().format("%Y-%m-%dT%H:%M:%S"),
        plan.title,
        report.applied.len(),
        report.skipped.len()
    );
    if let Err(e) = io::append_text(&vault.logs_dir().join("provision.log"), &line) {
        tracing::warn!("could not write provision log: {e}");
    }
    Ok(report)
}
