use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use forge_core::mcp;
use std::path::Path;

#[derive(Subcommand)]
pub enum McpSubcommand {
    /// Show which tools a description implies
    Analyze { text: String },
    /// Write an MCP server scaffold into the project and register it
    Generate {
        name: String,
        #[arg(long)]
        description: String,
    },
}

pub fn run(root: &Path, subcmd: McpSubcommand, json: bool) -> anyhow::Result<()> {
    match subcmd {
        McpSubcommand::Analyze { text } => {
            let tools = mcp::analyze_description(&text);
            if json {
                return print_json(&tools);
            }
            for t in &tools {
                println!("{:<16} {}", t.name, t.description);
            }
            Ok(())
        }
        McpSubcommand::Generate { name, description } => {
            let tools = mcp::analyze_description(&description);
            let plugin = mcp::write_plugin(root, &name, &tools)
                .with_context(|| format!("failed to generate MCP plugin '{name}'"))?;
            if json {
                return print_json(&plugin);
            }
            println!("Generated MCP plugin '{}' at {}", plugin.name, plugin.root.display());
            for t in &tools {
                println!("  tool: {}", t.name);
            }
            let prefix = plugin.root.display();
            println!("Build it with: npm install --prefix {prefix} && npm run build --prefix {prefix}");
            Ok(())
        }
    }
}
