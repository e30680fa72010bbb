use crate::cmd::{apply_plan, open_vault, print_ghost_diff};
use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use forge_core::provisioner::{self, BootstrapOptions, ProjectContext};
use forge_core::vault::Vault;
use std::path::Path;

#[derive(Subcommand)]
pub enum ProjectSubcommand {
    /// Show what Forge detects in the project
    Detect,
    /// Preview the bootstrap plan as a ghost diff
    Plan {
        /// Global skill to link into the project (repeatable)
        #[arg(long = "skill")]
        skills: Vec<String>,
        /// Also write CLAUDE.md, gemini.json and .nebula/
        #[arg(long)]
        legacy: bool,
    },
    /// Apply the bootstrap plan
    Bootstrap {
        #[arg(long = "skill")]
        skills: Vec<String>,
        #[arg(long)]
        legacy: bool,
        /// Write the changes; without it only the ghost diff is shown
        #[arg(long, short = 'y')]
        yes: bool,
    },
}

pub fn run(home: &Path, root: &Path, subcmd: ProjectSubcommand, json: bool) -> anyhow::Result<()> {
    let vault = open_vault(home)?;
    let ctx = provisioner::detect_project(&vault, root)
        .with_context(|| format!("failed to inspect {}", root.display()))?;
    match subcmd {
        ProjectSubcommand::Detect => detect(&ctx, json),
        ProjectSubcommand::Plan { skills, legacy } => {
            let options = BootstrapOptions { skills, legacy };
            plan(&vault, &ctx, &options, false, json)
        }
        ProjectSubcommand::Bootstrap { skills, legacy, yes } => {
            let options = BootstrapOptions { skills, legacy };
            plan(&vault, &ctx, &options, yes, json)
        }
    }
}

fn flag(b: bool) -> &'static str {
    if b {
        "yes"
    } else {
        "no"
    }
}

fn detect(ctx: &ProjectContext, json: bool) -> anyhow::Result<()> {
    if json {
        return print_json(ctx);
    }
    println!("Project: {} ({})", ctx.name, ctx.path.display());
    println!("  stack:         {}", ctx.stack_label());
    println!("  git:           {}", flag(ctx.has_git));
    println!("  AGENTS.md:     {}", flag(ctx.has_agents_md));
    println!("  opencode.json: {}", flag(ctx.has_opencode_json));
    println!("  .opencode/:    {}", flag(ctx.has_opencode_dir));
    if ctx.has_claude_md || ctx.has_gemini_json || ctx.has_nebula_agents {
        println!("  legacy files:  present");
    }
    println!("  global skills: {}", ctx.available_skills.len());
    Ok(())
}

fn plan(
    vault: &Vault,
    ctx: &ProjectContext,
    options: &BootstrapOptions,
    apply: bool,
    json: bool,
) -> anyhow::Result<()> {
    let plan = provisioner::plan_project_bootstrap(vault, ctx, options)
        .context("failed to build bootstrap plan")?;

    if plan.is_empty() {
        if json {
            return print_json(&plan);
        }
        println!("{} is already provisioned", ctx.name);
        return Ok(());
    }

    if !apply {
        if json {
            let diff = provisioner::ghost_diff(&plan).context("failed to preview plan")?;
            return print_json(&serde_json::json!({
                "title": plan.title,
                "summary": plan.summary(),
                "entries": diff,
            }));
        }
        print_ghost_diff(&plan, true)?;
        println!("\nNothing written. Re-run `forge project bootstrap --yes` to apply.");
        return Ok(());
    }

    let report = apply_plan(vault, &plan, json)?;
    if json {
        return print_json(&report);
    }
    println!(
        "Bootstrapped {}: {} applied, {} skipped",
        ctx.name,
        report.applied.len(),
        report.skipped.len()
    );
    Ok(())
}
