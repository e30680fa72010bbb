use crate::cmd::open_vault;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use forge_core::cookbook;
use std::path::Path;

#[derive(Subcommand)]
pub enum CookbookSubcommand {
    /// List cookbook recipes, optionally filtered
    List { query: Option<String> },
    /// Print a recipe's SKILL.md
    Show { id: String },
    /// Install a recipe as a skill
    Install {
        id: String,
        #[arg(long)]
        local: bool,
    },
}

pub fn run(home: &Path, root: &Path, subcmd: CookbookSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        CookbookSubcommand::List { query } => {
            let entries = cookbook::search_cookbook(query.as_deref().unwrap_or(""));
            if json {
                return print_json(&entries);
            }
            print_table(
                &["ID", "CATEGORY", "MODEL", "DESCRIPTION"],
                entries
                    .iter()
                    .map(|e| {
                        vec![
                            e.id.to_string(),
                            e.category.to_string(),
                            e.model_preference.to_string(),
                            e.description.to_string(),
                        ]
                    })
                    .collect(),
            );
            Ok(())
        }
        CookbookSubcommand::Show { id } => {
            let entry = cookbook::find(&id)?;
            print!("{}", entry.markdown);
            Ok(())
        }
        CookbookSubcommand::Install { id, local } => {
            let entry = cookbook::find(&id)?;
            let vault = open_vault(home)?;
            let target = if local {
                vault.project_skills_dir(root)
            } else {
                vault.skills_dir()
            };
            let dir = entry
                .install(&target)
                .with_context(|| format!("failed to install '{id}'"))?;
            if json {
                return print_json(&serde_json::json!({ "id": entry.id, "path": dir }));
            }
            println!("Installed '{}' at {}", entry.title, dir.display());
            Ok(())
        }
    }
}
