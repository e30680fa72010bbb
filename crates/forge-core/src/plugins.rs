//! OpenCode plugin catalogue and `opencode.json` `mcp` editing.

use crate::error::{ForgeError, Result};
use crate::{io, paths};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct OpenCodePlugin {
    pub name: &'static str,
    pub display: &'static str,
    pub description: &'static str,
    pub category: &'static str,
}

const fn plugin(
    name: &'static str,
    display: &'static str,
    description: &'static str,
    category: &'static str,
) -> OpenCodePlugin {
    OpenCodePlugin { name, display, description, category }
}

pub const PLUGINS: &[OpenCodePlugin] = &[
    plugin("opencode-daytona", "Daytona Sandboxes", "Run OpenCode sessions in isolated Daytona sandboxes with git sync.", "workflow"),
    plugin("opencode-dynamic-context-pruning", "Dynamic Context Pruning", "Optimize token usage by pruning obsolete tool outputs.", "workflow"),
    plugin("opencode-morph-fast-apply", "Morph Fast Apply", "10x faster code editing with Morph Fast Apply API and lazy edit markers.", "workflow"),
    plugin("opencode-websearch-cited", "Web Search (Cited)", "Native websearch with Google grounded-style citations.", "workflow"),
    plugin("opencode-pty", "PTY (Background Processes)", "Enable AI agents to run background processes in a PTY.", "workflow"),
    plugin("opencode-shell-strategy", "Shell Strategy", "Instructions for non-interactive shell use; prevents TTY hangs.", "workflow"),
    plugin("opencode-supermemory", "Supermemory", "Persistent memory across sessions using Supermemory.", "memory"),
    plugin("oh-my-opencode", "Oh My OpenCode", "Background agents, LSP/AST/MCP tools, curated agents, Claude Code compatible.", "workflow"),
    plugin("opencode-workspace", "Workspace (Multi-Agent)", "Bundled multi-agent orchestration harness: 16 components, one install.", "workflow"),
    plugin("opencode-background-agents", "Background Agents", "Claude Code-style background agents with async delegation.", "workflow"),
    plugin("opencode-helicone-session", "Helicone Session", "Auto-inject Helicone session headers for request grouping.", "mcp"),
    plugin("opencode-openai-codex-auth", "OpenAI Codex Auth", "Use ChatGPT Plus/Pro subscription instead of API credits.", "auth"),
    plugin("opencode-gemini-auth", "Gemini Auth", "Use existing Gemini plan instead of API billing.", "auth"),
    plugin("opencode-antigravity-auth", "Antigravity Auth", "Use Antigravity's free models instead of API billing.", "auth"),
    plugin("opencode-devcontainers", "Dev Containers", "Multi-branch devcontainer isolation with shallow clones.", "workflow"),
    plugin("opencode-worktree", "Git Worktrees", "Zero-friction git worktrees for OpenCode.", "workflow"),
    plugin("opencode-wakatime", "WakaTime", "Track OpenCode usage with WakaTime.", "ui"),
    plugin("opencode-notify", "Notifications", "Native OS notifications so you know when tasks complete.", "notify"),
    plugin("opencode-scheduler", "Scheduler", "Schedule recurring jobs with cron syntax (launchd/systemd).", "workflow"),
    plugin("opencode-skillful", "Skillful", "Lazy load prompts on demand with skill discovery and injection.", "workflow"),
    plugin("opencode-type-inject", "Type Inject", "Auto-inject TypeScript/Svelte types into file reads.", "workflow"),
    plugin("opencode-md-table-formatter", "Markdown Table Formatter", "Clean up markdown tables produced by LLMs.", "ui"),
];

impl OpenCodePlugin {
    /// The `mcp.<name>` entry written to `opencode.json`.
    pub fn config_snippet(&self) -> Value {
        json!({
            "type": "local",
            "command": ["npx", "-y", self.name],
            "enabled": true,
        })
    }
}

pub fn find_plugin(name: &str) -> Result<&'static OpenCodePlugin> {
    PLUGINS
        .iter()
        .find(|p| p.name == name)
        .ok_or_else(|| ForgeError::PluginNotFound(name.to_string()))
}

pub fn by_category() -> BTreeMap<&'static str, Vec<&'static OpenCodePlugin>> {
    let mut out: BTreeMap<&'static str, Vec<&'static OpenCodePlugin>> = BTreeMap::new();
    for p in PLUGINS {
        out.entry(p.category).or_default().push(p);
    }
    out
}

// ---------------------------------------------------------------------------
// opencode.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PluginScope {
    Project,
    Global,
}

impl PluginScope {
    pub fn config_path(self, project: &Path, home: &Path) -> PathBuf {
        match self {
            PluginScope::Project => paths::project_opencode_json(project),
            PluginScope::Global => paths::global_opencode_json(home),
        }
    }
}

impl fmt::Display for PluginScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PluginScope::Project => "project",
            PluginScope::Global => "global",
        })
    }
}

fn invalid(path: &Path, reason: impl Into<String>) -> ForgeError {
    ForgeError::InvalidOpencodeConfig {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Load an `opencode.json` object. `None` when the file does not exist.
pub fn load_opencode_json(path: &Path) -> Result<Option<Map<String, Value>>> {
    let Some(raw) = io::read_optional(path)? else {
        return Ok(None);
    };
    if raw.trim().is_empty() {
        return Ok(Some(Map::new()));
    }
    match serde_json::from_str::<Value>(&raw) {
        Ok(Value::Object(map)) => Ok(Some(map)),
        Ok(_) => Err(invalid(path, "top level is not an object")),
        Err(e) => Err(invalid(path, e.to_string())),
    }
}

pub fn write_opencode_json(path: &Path, config: &Map<String, Value>) -> Result<()> {
    let mut body = serde_json::to_string_pretty(config)?;
    body.push('\n');
    io::atomic_write(path, body.as_bytes())
}

pub(crate) fn mcp_section<'a>(path: &Path, config: &'a mut Map<String, Value>) -> Result<&'a mut Map<String, Value>> {
    match config
        .entry("mcp")
        .or_insert_with(|| Value::Object(Map::new()))
    {
        Value::Object(m) => Ok(m),
        _ => Err(invalid(path, "'mcp' is not an object")),
    }
}

/// Names under `mcp` in the config at `path`; empty when the file is absent.
pub fn installed_plugins(path: &Path) -> Result<Vec<String>> {
    let Some(config) = load_opencode_json(path)? else {
        return Ok(Vec::new());
    };
    Ok(match config.get("mcp") {
        Some(Value::Object(m)) => m.keys().cloned().collect(),
        _ => Vec::new(),
    })
}

/// Add `mcp.<name> = snippet`, creating the file (with `$schema`) if needed.
/// Other keys in the file are preserved.
pub fn install_plugin(path: &Path, name: &str, snippet: Value) -> Result<()> {
    let mut config = match load_opencode_json(path)? {
        Some(c) => c,
        None => {
            let mut c = Map::new();
            c.insert("$schema".to_string(), Value::String(paths::OPENCODE_SCHEMA.to_string()));
            c
        }
    };
    let mcp = mcp_section(path, &mut config)?;
    if mcp.contains_key(name) {
        return Err(ForgeError::PluginInstalled(name.to_string()));
    }
    mcp.insert(name.to_string(), snippet);
    write_opencode_json(path, &config)?;
    tracing::info!(plugin = name, path = %path.display(), "plugin installed");
    Ok(())
}

pub fn remove_plugin(path: &Path, name: &str) -> Result<()> {
    let mut config =
        load_opencode_json(path)?.ok_or_else(|| ForgeError::PluginNotInstalled(name.to_string()))?;
    let mcp = mcp_section(path, &mut config)?;
    if mcp.remove(name).is_none() {
        return Err(ForgeError::PluginNotInstalled(name.to_string()));
    }
    write_opencode_json(path, &config)?;
    tracing::info!(plugin = name, path = %path.display(), "plugin removed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn catalogue_has_unique_names() {
        assert_eq!(PLUGINS.len(), 22);
        let mut names: Vec<_> = PLUGINS.iter().map(|p| p.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), PLUGINS.len());
        assert_eq!(by_category()["auth"].len(), 3);
    }

    #[test]
    fn snippet_runs_through_npx() {
        let p = find_plugin("opencode-pty").unwrap();
        assert_eq!(
            p.config_snippet(),
            json!({"type": "local", "command": ["npx", "-y", "opencode-pty"], "enabled": true})
        );
        assert!(find_plugin("nope").is_err());
    }

    #[test]
    fn install_creates_file_with_schema() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("opencode.json");
        let p = find_plugin("opencode-notify").unwrap();
        install_plugin(&path, p.name, p.config_snippet()).unwrap();

        let v: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["$schema"], paths::OPENCODE_SCHEMA);
        assert_eq!(v["mcp"]["opencode-notify"]["enabled"], true);
        assert_eq!(installed_plugins(&path).unwrap(), vec!["opencode-notify"]);

        assert!(matches!(
            install_plugin(&path, p.name, p.config_snippet()),
            Err(ForgeError::PluginInstalled(_))
        ));
    }

    #[test]
    fn remove_preserves_other_keys() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("opencode.json");
        std::fs::write(
            &path,
            r#"{"model": "copilot/gpt-5", "mcp": {"a": {"type": "local"}, "b": {}}}"#,
        )
        .unwrap();

        remove_plugin(&path, "a").unwrap();
        let v: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(v["model"], "copilot/gpt-5");
        assert_eq!(installed_plugins(&path).unwrap(), vec!["b"]);
        assert!(matches!(
            remove_plugin(&path, "a"),
            Err(ForgeError::PluginNotInstalled(_))
        ));
    }

    #[test]
    fn invalid_json_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("opencode.json");
        std::fs::write(&path, "[1, 2]").unwrap();
        assert!(matches!(
            installed_plugins(&path),
            Err(ForgeError::InvalidOpencodeConfig { .. })
        ));
    }

    #[test]
    fn missing_file_has_no_plugins() {
        let dir = TempDir::new().unwrap();
        assert!(installed_plugins(&dir.path().join("opencode.json")).unwrap().is_empty());
    }
}
