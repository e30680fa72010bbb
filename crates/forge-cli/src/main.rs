mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    blueprint::BlueprintSubcommand, cookbook::CookbookSubcommand, market::MarketSubcommand,
    mcp::McpSubcommand, plugin::PluginSubcommand, project::ProjectSubcommand,
    session::SessionSubcommand, skill::SkillSubcommand, sync::SyncSubcommand,
    vault::VaultSubcommand,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "forge",
    about = "Agentic orchestrator console: API keys, skills, project provisioning and blueprints",
    version,
    propagate_version = true
)]
struct Cli {
    /// Home directory holding .nebula-forge/ (default: your home)
    #[arg(long, global = true, env = "FORGE_HOME")]
    home: Option<PathBuf>,

    /// Project root (default: auto-detect from .opencode/ or .git/)
    #[arg(long, global = true, env = "FORGE_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    /// Debug logging
    #[arg(long, global = true, short = 'v')]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the vault and the standard directory layout
    Init {
        #[arg(long)]
        default_model: Option<String>,
        /// One of: google_ai, anthropic, github_copilot, nvidia, opencode_zen
        #[arg(long)]
        default_provider: Option<String>,
    },

    /// API keys, profiles and settings
    Vault {
        #[command(subcommand)]
        subcommand: VaultSubcommand,
    },

    /// Manage the skill library
    Skill {
        #[command(subcommand)]
        subcommand: SkillSubcommand,
    },

    /// Detect, plan and bootstrap the current project
    Project {
        #[command(subcommand)]
        subcommand: ProjectSubcommand,
    },

    /// OpenCode plugin catalogue
    Plugin {
        #[command(subcommand)]
        subcommand: PluginSubcommand,
    },

    /// Generate planning documents from templates
    Blueprint {
        #[command(subcommand)]
        subcommand: BlueprintSubcommand,
    },

    /// Share skills through a git repository
    Sync {
        #[command(subcommand)]
        subcommand: SyncSubcommand,
    },

    /// Browse and install community skills
    Market {
        #[command(subcommand)]
        subcommand: MarketSubcommand,
    },

    /// Curated example skills
    Cookbook {
        #[command(subcommand)]
        subcommand: CookbookSubcommand,
    },

    /// Project health check
    Radar {
        /// Project directory (default: project root)
        path: Option<PathBuf>,
    },

    /// Replay agent sessions from local logs
    Session {
        #[command(subcommand)]
        subcommand: SessionSubcommand,
    },

    /// Scaffold MCP servers from a description
    Mcp {
        #[command(subcommand)]
        subcommand: McpSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let result = root::resolve_home(cli.home.as_deref()).and_then(|home| {
        let root = root::resolve_root(cli.root.as_deref());
        let json = cli.json;
        match cli.command {
            Commands::Init {
                default_model,
                default_provider,
            } => cmd::init::run(&home, default_model, default_provider.as_deref(), json),
            Commands::Vault { subcommand } => cmd::vault::run(&home, subcommand, json),
            Commands::Skill { subcommand } => cmd::skill::run(&home, &root, subcommand, json),
            Commands::Project { subcommand } => cmd::project::run(&home, &root, subcommand, json),
            Commands::Plugin { subcommand } => cmd::plugin::run(&home, &root, subcommand, json),
            Commands::Blueprint { subcommand } => {
                cmd::blueprint::run(&home, &root, subcommand, json)
            }
            Commands::Sync { subcommand } => cmd::sync::run(&home, subcommand, json),
            Commands::Market { subcommand } => cmd::market::run(&home, &root, subcommand, json),
            Commands::Cookbook { subcommand } => {
                cmd::cookbook::run(&home, &root, subcommand, json)
            }
            Commands::Radar { path } => {
                cmd::radar::run(&home, path.as_deref().unwrap_or(&root), json)
            }
            Commands::Session { subcommand } => cmd::session::run(&home, subcommand, json),
            Commands::Mcp { subcommand } => cmd::mcp::run(&root, subcommand, json),
        }
    });

    if let Err(e) = result {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
