use crate::cmd::{apply_plan, open_vault, print_ghost_diff};
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use clap::Subcommand;
use forge_core::provisioner;
use forge_core::scorer::{self, ComposerInput, QualityScore};
use forge_core::skill::{self, SkillMetadata};
use forge_core::vault::Vault;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Subcommand types
// ---------------------------------------------------------------------------

#[derive(Subcommand)]
pub enum SkillSubcommand {
    /// List skills in the global library (or the project with --local)
    List {
        #[arg(long)]
        local: bool,
    },
    /// Print a skill's SKILL.md
    Show {
        name: String,
        #[arg(long)]
        local: bool,
    },
    /// Create a skill from the standard template
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        description: String,
        #[arg(long, default_value = "general")]
        category: String,
        /// Comma-separated tags
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long)]
        model: Option<String>,
        /// Create in the project instead of the global library
        #[arg(long)]
        local: bool,
        /// Show the ghost diff without writing anything
        #[arg(long)]
        dry_run: bool,
    },
    /// Delete a skill directory
    Delete {
        name: String,
        #[arg(long)]
        local: bool,
    },
    /// Copy a global skill into the project
    Copy { name: String },
    /// Build a SKILL.md from individual fields and score it
    Compose {
        #[arg(long, default_value = "")]
        name: String,
        #[arg(long, default_value = "general")]
        category: String,
        #[arg(long, default_value = "")]
        model: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, value_delimiter = ',')]
        tags: Vec<String>,
        #[arg(long, default_value = "")]
        trigger: String,
        #[arg(long, default_value = "")]
        instructions: String,
        #[arg(long, default_value = "")]
        output_format: String,
        /// Write the composed skill
        #[arg(long)]
        save: bool,
        #[arg(long)]
        local: bool,
    },
    /// Quality score of an existing skill
    Score {
        name: String,
        #[arg(long)]
        local: bool,
    },
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn skills_root(vault: &Vault, root: &Path, local: bool) -> PathBuf {
    if local {
        vault.project_skills_dir(root)
    } else {
        vault.skills_dir()
    }
}

pub fn run(home: &Path, root: &Path, subcmd: SkillSubcommand, json: bool) -> anyhow::Result<()> {
    let vault = open_vault(home)?;
    match subcmd {
        SkillSubcommand::List { local } => list(&skills_root(&vault, root, local), json),
        SkillSubcommand::Show { name, local } => {
            let content = skill::read_skill(&skills_root(&vault, root, local), &name)
                .with_context(|| format!("failed to read skill '{name}'"))?;
            print!("{content}");
            Ok(())
        }
        SkillSubcommand::Create {
            name,
            description,
            category,
            tags,
            model,
            local,
            dry_run,
        } => {
            let mut meta = SkillMetadata::new(&name, &category, &description)?.with_tags(&tags);
            if let Some(m) = model.as_deref() {
                meta = meta.with_model(m);
            }
            let target = local.then(|| vault.project_skills_dir(root));
            let plan = provisioner::plan_skill_creation(&vault, &meta, target.as_deref())
                .context("failed to plan skill")?;
            if dry_run {
                return print_ghost_diff(&plan, true);
            }
            apply_plan(&vault, &plan, json)?;
            let dir = skills_root(&vault, root, local).join(&meta.name);
            if json {
                return print_json(&serde_json::json!({ "name": meta.name, "path": dir }));
            }
            println!("Created skill '{}' at {}", meta.name, dir.display());
            Ok(())
        }
        SkillSubcommand::Delete { name, local } => {
            let removed = skill::delete_skill(&skills_root(&vault, root, local), &name)
                .with_context(|| format!("failed to delete skill '{name}'"))?;
            println!("Deleted {}", removed.display());
            Ok(())
        }
        SkillSubcommand::Copy { name } => {
            let plan = provisioner::plan_skill_copy(&vault, &name, root)
                .with_context(|| format!("failed to plan copy of '{name}'"))?;
            apply_plan(&vault, &plan, json)?;
            println!("Copied '{name}' into {}", vault.project_skills_dir(root).display());
            Ok(())
        }
        SkillSubcommand::Compose {
            name,
            category,
            model,
            description,
            tags,
            trigger,
            instructions,
            output_format,
            save,
            local,
        } => {
            let input = ComposerInput {
                name,
                category,
                model,
                description,
                tags,
                trigger,
                instructions,
                output_format,
            };
            compose(&vault, root, &input, save, local, json)
        }
        SkillSubcommand::Score { name, local } => {
            let content = skill::read_skill(&skills_root(&vault, root, local), &name)
                .with_context(|| format!("failed to read skill '{name}'"))?;
            let score = scorer::score_skill_md(&content)
                .with_context(|| format!("skill '{name}' is malformed"))?;
            print_score(&score, json)
        }
    }
}

// ---------------------------------------------------------------------------
// list
// ---------------------------------------------------------------------------

fn list(dir: &Path, json: bool) -> anyhow::Result<()> {
    let skills = skill::list_skills(dir).context("failed to list skills")?;
    if json {
        return print_json(&skills);
    }
    if skills.is_empty() {
        println!("No skills in {}", dir.display());
        return Ok(());
    }
    print_table(
        &["NAME", "CATEGORY", "VERSION", "DESCRIPTION"],
        skills
            .iter()
            .map(|s| {
                vec![
                    s.name.clone(),
                    s.category.clone(),
                    s.version.clone().unwrap_or_else(|| "-".to_string()),
                    truncate(&s.description, 60),
                ]
            })
            .collect(),
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// compose / score
// ---------------------------------------------------------------------------

fn compose(
    vault: &Vault,
    root: &Path,
    input: &ComposerInput,
    save: bool,
    local: bool,
    json: bool,
) -> anyhow::Result<()> {
    let markdown = scorer::compose_skill_md(input);
    let score = scorer::score_composer(input);

    if save {
        let name = if input.name.trim().is_empty() { "new-skill" } else { input.name.as_str() };
        let meta = SkillMetadata::new(name, &input.category, &input.description)?
            .with_tags(&input.tags)
            .with_model(&input.model);
        let target = local.then(|| vault.project_skills_dir(root));
        let plan = provisioner::plan_skill_file(vault, &meta, target.as_deref(), markdown.clone())
            .context("failed to plan composed skill")?;
        apply_plan(vault, &plan, true)?;
        if !json {
            println!("Saved '{}' ({}/100)", meta.name, score.total);
        }
    }

    if json {
        return print_json(&serde_json::json!({
            "markdown": markdown,
            "score": score,
        }));
    }
    if !save {
        print!("{markdown}");
        println!();
        print_score(&score, false)?;
    }
    Ok(())
}

fn print_score(score: &QualityScore, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(score);
    }
    println!("Quality: {}/100", score.total);
    for c in &score.criteria {
        let mark = if c.passed { "✓" } else { "✗" };
        println!("  {mark} {:<18} {:>2}", c.key, c.points);
    }
    if !score.suggestions.is_empty() {
        println!("Suggestions:");
        for s in &score.suggestions {
            println!("  - {s}");
        }
    }
    Ok(())
}
