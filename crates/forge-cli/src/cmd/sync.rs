use crate::cmd::open_vault;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use forge_core::sync::ForgeSync;
use std::path::Path;

#[derive(Subcommand)]
pub enum SyncSubcommand {
    /// Show sync configuration and counts
    Status,
    /// Set the skills repository
    Configure {
        /// Git URL of the shared skills repository
        url: String,
        #[arg(long, default_value = "main")]
        branch: String,
        /// Sync automatically
        #[arg(long)]
        auto: bool,
    },
    /// Pull remote skills into the global library
    Pull,
    /// Push the global library to the remote
    Push,
}

pub fn run(home: &Path, subcmd: SyncSubcommand, json: bool) -> anyhow::Result<()> {
    let mut vault = open_vault(home)?;
    let mut sync = ForgeSync::new(&mut vault);
    match subcmd {
        SyncSubcommand::Status => {
            let status = sync.status().context("failed to read sync status")?;
            if json {
                return print_json(&status);
            }
            print_table(
                &["ITEM", "VALUE"],
                vec![
                    vec!["Repository".into(), status.repo_url.clone()],
                    vec!["Branch".into(), status.branch.clone()],
                    vec!["Auto".into(), status.auto.to_string()],
                    vec!["Connected".into(), status.connected.to_string()],
                    vec!["Local skills".into(), status.local_skills.to_string()],
                    vec!["Remote skills".into(), status.remote_skills.to_string()],
                    vec!["Last pull".into(), status.last_pull.clone()],
                    vec!["Last push".into(), status.last_push.clone()],
                    vec!["Status".into(), status.message.clone()],
                ],
            );
            Ok(())
        }
        SyncSubcommand::Configure { url, branch, auto } => {
            sync.configure(&url, &branch, auto).context("failed to configure sync")?;
            println!("Sync configured: {url}");
            Ok(())
        }
        SyncSubcommand::Pull => {
            let n = sync.pull().context("sync pull failed")?;
            if json {
                return print_json(&serde_json::json!({ "pulled": n }));
            }
            println!("Pulled {n} skill(s) into the global library");
            Ok(())
        }
        SyncSubcommand::Push => {
            let n = sync.push().context("sync push failed")?;
            if json {
                return print_json(&serde_json::json!({ "pushed": n }));
            }
            println!("Pushed {n} skill(s)");
            Ok(())
        }
    }
}
