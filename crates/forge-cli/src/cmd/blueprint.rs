use crate::cmd::open_vault;
use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use forge_core::blueprint::{self, TEMPLATES};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Subcommand)]
pub enum BlueprintSubcommand {
    /// List templates
    List,
    /// Show a template's variables
    Show { id: String },
    /// Render a template
    Generate {
        id: String,
        /// Variable value as KEY=VALUE (repeatable)
        #[arg(long = "var", value_parser = parse_kv)]
        vars: Vec<(String, String)>,
        /// Project name (default: the project root's directory name)
        #[arg(long)]
        project: Option<String>,
        /// Save under the blueprints directory instead of printing
        #[arg(long)]
        save: bool,
    },
    /// List saved blueprints
    Saved,
}

fn parse_kv(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((k, _)) if k.trim().is_empty() => Err(format!("key cannot be empty in: {s}")),
        Some((k, v)) => Ok((k.trim().to_string(), v.to_string())),
        None => Err(format!("expected KEY=VALUE, got: {s}")),
    }
}

pub fn run(home: &Path, root: &Path, subcmd: BlueprintSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        BlueprintSubcommand::List => {
            if json {
                return print_json(&TEMPLATES);
            }
            print_table(
                &["ID", "NAME", "VARS", "DESCRIPTION"],
                TEMPLATES
                    .iter()
                    .map(|t| {
                        vec![
                            t.id.to_string(),
                            format!("{} {}", t.icon, t.name),
                            t.variables.len().to_string(),
                            t.description.to_string(),
                        ]
                    })
                    .collect(),
            );
            Ok(())
        }
        BlueprintSubcommand::Show { id } => {
            let template = blueprint::find_template(&id)?;
            if json {
                return print_json(template);
            }
            println!("{} ({})", template.name, template.kind);
            println!("{}\n", template.description);
            print_table(
                &["KEY", "LABEL", "DEFAULT / EXAMPLE"],
                template
                    .variables
                    .iter()
                    .map(|v| {
                        let hint = if v.default.is_empty() {
                            format!("e.g. {}", v.placeholder)
                        } else {
                            v.default.to_string()
                        };
                        vec![v.key.to_string(), v.label.to_string(), hint]
                    })
                    .collect(),
            );
            Ok(())
        }
        BlueprintSubcommand::Generate {
            id,
            vars,
            project,
            save,
        } => {
            let template = blueprint::find_template(&id)?;
            let supplied: BTreeMap<String, String> = vars.into_iter().collect();
            let project_name = project.unwrap_or_else(|| {
                root.file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

            let resolved = blueprint::resolve_variables(template, &supplied);
            let missing: Vec<&String> = resolved
                .missing
                .iter()
                .filter(|k| !(k.as_str() == "project" && !project_name.is_empty()))
                .collect();
            if !missing.is_empty() {
                let keys: Vec<&str> = missing.iter().map(|k| k.as_str()).collect();
                eprintln!(
                    "warning: unset variables render as {}: {}",
                    blueprint::UNRESOLVED,
                    keys.join(", ")
                );
            }

            let content = blueprint::generate_blueprint(template, &supplied, &project_name);
            if !save {
                print!("{content}");
                return Ok(());
            }
            let vault = open_vault(home)?;
            let filename = blueprint::blueprint_filename(template, &chrono::Local::now());
            let path = blueprint::save_blueprint(&vault, &content, &filename)
                .context("failed to save blueprint")?;
            if json {
                return print_json(&serde_json::json!({ "path": path }));
            }
            println!("Saved {}", path.display());
            Ok(())
        }
        BlueprintSubcommand::Saved => {
            let vault = open_vault(home)?;
            let saved = blueprint::list_saved(&vault).context("failed to list blueprints")?;
            if json {
                return print_json(&saved);
            }
            if saved.is_empty() {
                println!("No saved blueprints in {}", vault.blueprints_dir().display());
                return Ok(());
            }
            print_table(
                &["NAME", "BYTES"],
                saved
                    .iter()
                    .map(|b| vec![b.name.clone(), b.bytes.to_string()])
                    .collect(),
            );
            Ok(())
        }
    }
}
