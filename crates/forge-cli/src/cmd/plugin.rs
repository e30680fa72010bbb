use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use forge_core::plugins::{self, PluginScope};
use std::path::Path;

#[derive(Subcommand)]
pub enum PluginSubcommand {
    /// Show the catalogue, marking installed plugins
    List {
        #[arg(long)]
        global: bool,
    },
    /// Add a plugin to opencode.json
    Install {
        name: String,
        /// Use ~/.config/opencode/opencode.json instead of the project's
        #[arg(long)]
        global: bool,
    },
    /// Remove a plugin from opencode.json
    Remove {
        name: String,
        #[arg(long)]
        global: bool,
    },
}

fn scope(global: bool) -> PluginScope {
    if global {
        PluginScope::Global
    } else {
        PluginScope::Project
    }
}

pub fn run(home: &Path, root: &Path, subcmd: PluginSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        PluginSubcommand::List { global } => {
            let path = scope(global).config_path(root, home);
            let installed = plugins::installed_plugins(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            if json {
                let rows: Vec<_> = plugins::PLUGINS
                    .iter()
                    .map(|p| {
                        serde_json::json!({
                            "name": p.name,
                            "display": p.display,
                            "category": p.category,
                            "description": p.description,
                            "installed": installed.iter().any(|i| i == p.name),
                        })
                    })
                    .collect();
                return print_json(&rows);
            }
            let mut rows = Vec::new();
            for (category, list) in plugins::by_category() {
                for p in list {
                    let mark = if installed.iter().any(|i| i == p.name) { "✓" } else { "" };
                    rows.push(vec![
                        mark.to_string(),
                        p.name.to_string(),
                        category.to_string(),
                        p.description.to_string(),
                    ]);
                }
            }
            print_table(&["", "NAME", "CATEGORY", "DESCRIPTION"], rows);
            Ok(())
        }
        PluginSubcommand::Install { name, global } => {
            let scope = scope(global);
            let plugin = plugins::find_plugin(&name)?;
            let path = scope.config_path(root, home);
            plugins::install_plugin(&path, plugin.name, plugin.config_snippet())
                .with_context(|| format!("failed to install '{name}'"))?;
            println!("Installed {} ({scope}): {}", plugin.display, path.display());
            Ok(())
        }
        PluginSubcommand::Remove { name, global } => {
            let scope = scope(global);
            let path = scope.config_path(root, home);
            plugins::remove_plugin(&path, &name)
                .with_context(|| format!("failed to remove '{name}'"))?;
            println!("Removed {name} ({scope})");
            Ok(())
        }
    }
}
