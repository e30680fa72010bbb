use crate::cmd::open_vault;
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use clap::Subcommand;
use forge_core::marketplace::{self, InstallMethod, MarketIndex, Marketplace, DEFAULT_TIMEOUT};
use std::path::Path;

#[derive(Subcommand)]
pub enum MarketSubcommand {
    /// Browse the marketplace, optionally filtered
    List {
        query: Option<String>,
        /// Use the cached index or built-ins only
        #[arg(long)]
        offline: bool,
    },
    /// Install a marketplace skill
    Install {
        id: String,
        /// Install into the project instead of the global library
        #[arg(long)]
        local: bool,
        #[arg(long)]
        offline: bool,
    },
}

fn load(market: &Marketplace, offline: bool) -> MarketIndex {
    if offline {
        market.load_offline()
    } else {
        market.fetch_index(DEFAULT_TIMEOUT)
    }
}

pub fn run(home: &Path, root: &Path, subcmd: MarketSubcommand, json: bool) -> anyhow::Result<()> {
    let vault = open_vault(home)?;
    let market = Marketplace::new(&vault);
    match subcmd {
        MarketSubcommand::List { query, offline } => {
            let index = load(&market, offline);
            let hits = index.search(query.as_deref().unwrap_or(""));
            if json {
                return print_json(&serde_json::json!({
                    "source": index.source,
                    "skills": hits,
                }));
            }
            eprintln!("source: {}", index.source);
            if hits.is_empty() {
                println!("No matching skills");
                return Ok(());
            }
            print_table(
                &["ID", "AUTHOR", "STARS", "DOWNLOADS", "DESCRIPTION"],
                hits.iter()
                    .map(|s| {
                        let author = if s.verified { format!("{} ✓", s.author) } else { s.author.clone() };
                        vec![
                            s.id.clone(),
                            author,
                            format!("{:.1}", s.stars),
                            s.downloads.to_string(),
                            truncate(&s.description, 56),
                        ]
                    })
                    .collect(),
            );
            Ok(())
        }
        MarketSubcommand::Install { id, local, offline } => {
            let index = load(&market, offline);
            let skill = index.find(&id)?;
            let target_root = if local {
                vault.project_skills_dir(root)
            } else {
                vault.skills_dir()
            };
            let outcome = marketplace::install(skill, &target_root)
                .with_context(|| format!("failed to install '{id}'"))?;
            if json {
                return print_json(&outcome);
            }
            let how = match outcome.method {
                InstallMethod::Cloned => "cloned",
                InstallMethod::Scaffolded => "scaffolded from listing",
            };
            println!("Installed '{}' ({how}) at {}", skill.name, outcome.path.display());
            Ok(())
        }
    }
}
