use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use clap::Subcommand;
use forge_core::session::{EventKind, SessionLoader, DEFAULT_LIMIT};
use std::path::Path;

#[derive(Subcommand)]
pub enum SessionSubcommand {
    /// List recent sessions, newest first
    List {
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: usize,
    },
    /// Replay one session's events
    Show { id: String },
}

pub fn run(home: &Path, subcmd: SessionSubcommand, json: bool) -> anyhow::Result<()> {
    let loader = SessionLoader::new(home);
    match subcmd {
        SessionSubcommand::List { limit } => {
            let sessions = loader.load(limit).context("failed to read session logs")?;
            if json {
                return print_json(&sessions);
            }
            if sessions.is_empty() {
                println!("No session logs found under ~/.opencode/sessions or ~/.claude/projects");
                return Ok(());
            }
            print_table(
                &["ID", "AGENT", "STARTED", "EVENTS", "EDITS", "PROJECT"],
                sessions
                    .iter()
                    .map(|s| {
                        vec![
                            truncate(&s.id, 36),
                            s.agent.to_string(),
                            s.started_at.clone(),
                            s.events.len().to_string(),
                            s.count(EventKind::Edit).to_string(),
                            s.project_path.clone(),
                        ]
                    })
                    .collect(),
            );
            Ok(())
        }
        SessionSubcommand::Show { id } => {
            let session = loader.find(&id)?;
            if json {
                return print_json(&session);
            }
            println!("{} ({})", session.id, session.agent);
            println!("  project: {}", session.project_path);
            if !session.branch.is_empty() {
                println!("  branch:  {}", session.branch);
            }
            println!(
                "  time:    {} → {}",
                session.started_at,
                session.ended_at.as_deref().unwrap_or("?")
            );
            println!();
            for e in &session.events {
                println!("{:<20} {:<8} {}", e.timestamp, e.kind.as_str(), e.summary);
            }
            Ok(())
        }
    }
}
