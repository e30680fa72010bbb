//! MCP plugin builder: guess tools from a plain-language description and
//! scaffold a TypeScript MCP server under `.opencode/mcp-servers/`.

use crate::error::Result;
use crate::{io, paths, plugins};
use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct McpTool {
    pub name: String,
    pub description: String,
}

impl McpTool {
    fn new(name: &str, description: impl Into<String>) -> Self {
        Self { name: name.to_string(), description: description.into() }
    }
}

const KEYWORDS: &[(&str, &str)] = &[
    ("search", "search_records"),
    ("read", "read_record"),
    ("get", "read_record"),
    ("create", "create_record"),
    ("update", "update_record"),
    ("delete", "delete_record"),
    ("list", "list_records"),
    ("find", "search_records"),
];

/// Tools implied by keywords in `description`, first match wins per tool.
/// Falls back to a generic `run_task`/`get_status` pair.
pub fn analyze_description(description: &str) -> Vec<McpTool> {
    let text = description.to_lowercase();
    let mut tools: Vec<McpTool> = Vec::new();
    for (keyword, tool) in KEYWORDS {
        if text.contains(keyword) && !tools.iter().any(|t| t.name == *tool) {
            tools.push(McpTool::new(tool, format!("Auto-detected from keyword: {keyword}")));
        }
    }
    if tools.is_empty() {
        tools = vec![
            McpTool::new("run_task", "Generic task execution tool"),
            McpTool::new("get_status", "Generic status retrieval tool"),
        ];
    }
    tools
}

static UNSAFE_RE: OnceLock<Regex> = OnceLock::new();

/// Directory/package name for a plugin: lowercase, `[a-z0-9_-]` only.
pub fn safe_name(raw: &str) -> String {
    let re = UNSAFE_RE.get_or_init(|| Regex::new(r"[^a-zA-Z0-9_-]").unwrap());
    let safe = re.replace_all(&raw.trim().to_lowercase(), "-").into_owned();
    if safe.is_empty() {
        "mcp-plugin".to_string()
    } else {
        safe
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

fn tool_decl(tool: &McpTool) -> String {
    format!(
        r#"      {{
        name: "{name}",
        description: "{desc}",
        inputSchema: {{
          type: "object",
          properties: {{
            input: {{ type: "string" }}
          }},
          required: ["input"]
        }}
      }}"#,
        name = tool.name,
        desc = tool.description.replace('"', "'"),
    )
}

fn tool_handler(plugin: &str, tool: &McpTool) -> String {
    format!(
        r#"  if (name === "{name}") {{
    return {{
      content: [
        {{ type: "text", text: `[{plugin}] {name} executed with input: ${{args?.input ?? ""}}` }}
      ]
    }};
  }}"#,
        name = tool.name,
    )
}

pub fn generate_server_ts(plugin: &str, tools: &[McpTool]) -> String {
    let decls: Vec<String> = tools.iter().map(tool_decl).collect();
    let handlers: Vec<String> = tools.iter().map(|t| tool_handler(plugin, t)).collect();
    format!(
        r#"import {{ Server }} from "@modelcontextprotocol/sdk/server/index.js";
import {{ StdioServerTransport }} from "@modelcontextprotocol/sdk/server/stdio.js";
import {{ CallToolRequestSchema, ListToolsRequestSchema }} from "@modelcontextprotocol/sdk/types.js";

const server = new Server(
  {{ name: "{plugin}", version: "1.0.0" }},
  {{ capabilities: {{ tools: {{}} }} }}
);

server.setRequestHandler(ListToolsRequestSchema, async () => {{
  return {{
    tools: [
{decls}
    ]
  }};
}});

server.setRequestHandler(CallToolRequestSchema, async (request) => {{
  const name = request.params.name;
  const args = request.params.arguments as Record<string, unknown> | undefined;

{handlers}

  throw new Error(`Unknown tool: ${{name}}`);
}});

const transport = new StdioServerTransport();
await server.connect(transport);
"#,
        decls = decls.join(",\n"),
        handlers = handlers.join("\n\n"),
    )
}

fn pretty(value: &Value) -> Result<String> {
    let mut out = serde_json::to_string_pretty(value)?;
    out.push('\n');
    Ok(out)
}

pub fn generate_package_json(plugin: &str) -> Result<String> {
    pretty(&json!({
        "name": plugin,
        "version": "1.0.0",
        "type": "module",
        "private": true,
        "scripts": {
            "build": "tsc -p .",
            "start": "node dist/server.js"
        },
        "dependencies": {
            "@modelcontextprotocol/sdk": "^1.0.0"
        },
        "devDependencies": {
            "typescript": "^5.5.4"
        }
    }))
}

pub fn generate_tsconfig() -> Result<String> {
    pretty(&json!({
        "compilerOptions": {
            "target": "ES2022",
            "module": "NodeNext",
            "moduleResolution": "NodeNext",
            "outDir": "dist",
            "rootDir": "src",
            "strict": true,
            "esModuleInterop": true,
            "skipLibCheck": true
        },
        "include": ["src"]
    }))
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedPlugin {
    pub name: String,
    pub root: PathBuf,
    pub files: Vec<PathBuf>,
}

/// `opencode.json` for `project` with `name` registered under `mcp`. An
/// existing `mcp` value that is not an object is an error.
fn registration(project: &Path, name: &str) -> Result<(PathBuf, Map<String, Value>)> {
    let path = paths::project_opencode_json(project);
    let mut config = match plugins::load_opencode_json(&path)? {
        Some(c) => c,
        None => {
            let mut c = Map::new();
            c.insert("$schema".to_string(), Value::String(paths::OPENCODE_SCHEMA.to_string()));
            c
        }
    };
    let prefix = format!("{}/{name}", paths::MCP_SERVERS_DIR);
    let entry = json!({
        "type": "local",
        "command": ["npm", "run", "start", "--prefix", prefix],
        "enabled": true,
    });
    plugins::mcp_section(&path, &mut config)?.insert(name.to_string(), entry);
    Ok((path, config))
}

/// Write the server scaffold and register it in the project's
/// `opencode.json`. Regenerating an existing plugin overwrites its files.
pub fn write_plugin(project: &Path, name: &str, tools: &[McpTool]) -> Result<GeneratedPlugin> {
    let safe = safe_name(name);
    let root = project.join(paths::MCP_SERVERS_DIR).join(&safe);
    let (config_path, config) = registration(project, &safe)?;
    let files = vec![
        (root.join("src/server.ts"), generate_server_ts(&safe, tools)),
        (root.join("package.json"), generate_package_json(&safe)?),
        (root.join("tsconfig.json"), generate_tsconfig()?),
    ];
    for (path, content) in &files {
        io::atomic_write(path, content.as_bytes())?;
    }
    plugins::write_opencode_json(&config_path, &config)?;
    tracing::info!(plugin = %safe, root = %root.display(), "generated MCP plugin");
    Ok(GeneratedPlugin {
        name: safe,
        root,
        files: files.into_iter().map(|(p, _)| p).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ForgeError;
    use tempfile::TempDir;

    fn names(tools: &[McpTool]) -> Vec<&str> {
        tools.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn keywords_map_to_tools() {
        let tools = analyze_description("Search and find tickets, then create or delete them");
        assert_eq!(names(&tools), vec!["search_records", "create_record", "delete_record"]);
        assert_eq!(tools[0].description, "Auto-detected from keyword: search");
    }

    #[test]
    fn no_keywords_gives_generic_tools() {
        assert_eq!(names(&analyze_description("Talk to the weather")), vec!["run_task", "get_status"]);
    }

    #[test]
    fn safe_names() {
        assert_eq!(safe_name("  My Jira Bot! "), "my-jira-bot-");
        assert_eq!(safe_name("   "), "mcp-plugin");
        assert_eq!(safe_name("db_tools-2"), "db_tools-2");
    }

    #[test]
    fn server_declares_and_handles_each_tool() {
        let tools = vec![McpTool::new("list_records", "Lists \"things\"")];
        let ts = generate_server_ts("jira", &tools);
        assert!(ts.contains(r#"{ name: "jira", version: "1.0.0" }"#));
        assert!(ts.contains(r#"name: "list_records","#));
        assert!(ts.contains("description: \"Lists 'things'\""));
        assert!(ts.contains(r#"if (name === "list_records") {"#));
        assert!(ts.contains("`[jira] list_records executed with input: ${args?.input ?? \"\"}`"));
        assert!(ts.contains("throw new Error(`Unknown tool: ${name}`);"));
    }

    #[test]
    fn write_plugin_registers_in_opencode_json() {
        let project = TempDir::new().unwrap();
        std::fs::write(
            project.path().join("opencode.json"),
            r#"{"model": "copilot/gpt-5", "mcp": {"other": {"type": "local"}}}"#,
        )
        .unwrap();

        let tools = analyze_description("list issues");
        let plugin = write_plugin(project.path(), "Issue Tracker", &tools).unwrap();
        assert_eq!(plugin.name, "issue-tracker");
        for f in &plugin.files {
            assert!(f.is_file(), "{}", f.display());
        }
        let pkg: Value =
            serde_json::from_str(&std::fs::read_to_string(plugin.root.join("package.json")).unwrap()).unwrap();
        assert_eq!(pkg["name"], "issue-tracker");
        assert_eq!(pkg["scripts"]["start"], "node dist/server.js");

        let cfg: Value =
            serde_json::from_str(&std::fs::read_to_string(project.path().join("opencode.json")).unwrap()).unwrap();
        assert_eq!(cfg["model"], "copilot/gpt-5");
        assert!(cfg["mcp"]["other"].is_object());
        assert_eq!(
            cfg["mcp"]["issue-tracker"]["command"],
            json!(["npm", "run", "start", "--prefix", ".opencode/mcp-servers/issue-tracker"])
        );

        // regenerating replaces the entry rather than failing
        write_plugin(project.path(), "issue-tracker", &tools).unwrap();
    }

    #[test]
    fn non_object_mcp_section_is_left_alone() {
        let project = TempDir::new().unwrap();
        let config = project.path().join("opencode.json");
        std::fs::write(&config, r#"{"mcp": ["keep-me"]}"#).unwrap();

        let err = write_plugin(project.path(), "notes", &analyze_description("")).unwrap_err();
        assert!(matches!(err, ForgeError::InvalidOpencodeConfig { .. }));
        assert_eq!(std::fs::read_to_string(&config).unwrap(), r#"{"mcp": ["keep-me"]}"#);
        assert!(!project.path().join(".opencode/mcp-servers/notes").exists());
    }

    #[test]
    fn write_plugin_creates_config_with_schema() {
        let project = TempDir::new().unwrap();
        write_plugin(project.path(), "notes", &analyze_description("")).unwrap();
        let cfg: Value =
            serde_json::from_str(&std::fs::read_to_string(project.path().join("opencode.json")).unwrap()).unwrap();
        assert_eq!(cfg["$schema"], paths::OPENCODE_SCHEMA);
        assert_eq!(cfg["mcp"]["notes"]["enabled"], true);
    }
}
