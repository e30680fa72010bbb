//! Session replay: read agent JSONL logs from OpenCode and Claude Code.

use crate::error::{ForgeError, Result};
use crate::paths;
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::io::BufRead;
use std::path::{Path, PathBuf};

pub const DEFAULT_LIMIT: usize = 200;
const SUMMARY_MAX: usize = 160;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Read,
    Edit,
    Run,
    Commit,
    Message,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EventKind::Read => "read",
            EventKind::Edit => "edit",
            EventKind::Run => "run",
            EventKind::Commit => "commit",
            EventKind::Message => "message",
        }
    }

    /// Map a raw tool or event name onto one of the five kinds.
    pub fn classify(raw: &str) -> Self {
        let t = raw.to_lowercase();
        let has = |needles: &[&str]| needles.iter().any(|n| t.contains(n));
        if has(&["read", "open_file"]) {
            EventKind::Read
        } else if has(&["edit", "write", "apply"]) {
            EventKind::Edit
        } else if has(&["run", "shell", "command", "exec"]) {
            EventKind::Run
        } else if t.contains("commit") {
            EventKind::Commit
        } else {
            EventKind::Message
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AgentKind {
    #[serde(rename = "opencode")]
    OpenCode,
    #[serde(rename = "claude-code")]
    ClaudeCode,
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AgentKind::OpenCode => "opencode",
            AgentKind::ClaudeCode => "claude-code",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionEvent {
    pub timestamp: String,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    pub summary: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct AgentSession {
    pub id: String,
    pub agent: AgentKind,
    pub project_path: String,
    pub branch: String,
    pub started_at: String,
    pub ended_at: Option<String>,
    pub source: PathBuf,
    pub events: Vec<SessionEvent>,
}

impl AgentSession {
    pub fn count(&self, kind: EventKind) -> usize {
        self.events.iter().filter(|e| e.kind == kind).count()
    }
}

// ---------------------------------------------------------------------------
// Line parsing
// ---------------------------------------------------------------------------

/// First non-empty scalar among `keys`, rendered as a string.
fn scalar(data: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| match data.get(*k)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn collapse(text: &str) -> String {
    let joined = text.split_whitespace().collect::<Vec<_>>().join(" ");
    joined.chars().take(SUMMARY_MAX).collect()
}

fn summarize(data: &Value, tool: &str, path: Option<&str>) -> String {
    for key in ["summary", "message", "content", "text", "prompt", "command"] {
        let text = match data.get(key) {
            Some(Value::String(s)) => Some(s.as_str()),
            // Claude Code nests the text under message.content
            Some(Value::Object(m)) => m.get("content").and_then(Value::as_str),
            _ => None,
        };
        if let Some(t) = text.filter(|t| !t.trim().is_empty()) {
            return collapse(t);
        }
    }
    match path {
        Some(p) => format!("{tool}: {p}"),
        None if tool.is_empty() => "event".to_string(),
        None => tool.to_string(),
    }
}

/// Parse one JSONL log. Malformed lines are skipped; a log without any
/// event yields `None`.
pub fn parse_log(path: &Path, agent: AgentKind) -> Result<Option<AgentSession>> {
    let file = std::fs::File::open(path)?;
    let mut events = Vec::new();
    let mut started_at = String::new();
    let mut branch = String::new();
    let mut project_path = path
        .parent()
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    for raw in std::io::BufReader::new(file).split(b'\n') {
        let raw = raw?;
        let Ok(line) = std::str::from_utf8(&raw) else {
            tracing::debug!(file = %path.display(), "skipping non-UTF-8 session line");
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Ok(data) = serde_json::from_str::<Value>(line) else {
            tracing::debug!(file = %path.display(), "skipping malformed session line");
            continue;
        };
        if !data.is_object() {
            continue;
        }

        let timestamp = scalar(&data, &["timestamp", "time", "created_at"]).unwrap_or_default();
        if started_at.is_empty() {
            started_at = timestamp.clone();
        }
        if branch.is_empty() {
            branch = scalar(&data, &["branch", "gitBranch"]).unwrap_or_default();
        }
        if let Some(p) = scalar(&data, &["project_path", "cwd"]) {
            project_path = p;
        }

        let tool = scalar(&data, &["tool", "type"])
            .unwrap_or_else(|| "message".to_string())
            .to_lowercase();
        let file_path = scalar(&data, &["path", "file", "file_path"]);
        events.push(SessionEvent {
            summary: summarize(&data, &tool, file_path.as_deref()),
            kind: EventKind::classify(&tool),
            path: file_path,
            timestamp,
        });
    }

    if events.is_empty() {
        return Ok(None);
    }
    let id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    Ok(Some(AgentSession {
        id,
        agent,
        project_path,
        branch,
        started_at,
        ended_at: events.last().map(|e| e.timestamp.clone()).filter(|t| !t.is_empty()),
        source: path.to_path_buf(),
        events,
    }))
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

fn jsonl_files(dir: &Path, recursive: bool, out: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                jsonl_files(&path, true, out)?;
            }
        } else if path.extension().is_some_and(|e| e == "jsonl") {
            out.push(path);
        }
    }
    Ok(())
}

pub struct SessionLoader {
    opencode_root: PathBuf,
    claude_root: PathBuf,
}

impl SessionLoader {
    pub fn new(home: &Path) -> Self {
        Self {
            opencode_root: home.join(paths::OPENCODE_SESSIONS_DIR),
            claude_root: home.join(paths::CLAUDE_PROJECTS_DIR),
        }
    }

    fn load_source(&self, root: &Path, recursive: bool, agent: AgentKind, limit: usize) -> Result<Vec<AgentSession>> {
        let mut files = Vec::new();
        jsonl_files(root, recursive, &mut files)?;
        files.sort_by(|a, b| b.cmp(a));

        let mut out = Vec::new();
        for file in files.into_iter().take(limit) {
            match parse_log(&file, agent) {
                Ok(Some(session)) => out.push(session),
                Ok(None) => {}
                Err(e) => tracing::warn!(file = %file.display(), "unreadable session log: {e}"),
            }
        }
        Ok(out)
    }

    /// All sessions from both agents, newest first, at most `limit`.
    pub fn load(&self, limit: usize) -> Result<Vec<AgentSession>> {
        let mut sessions = self.load_source(&self.opencode_root, false, AgentKind::OpenCode, limit)?;
        sessions.extend(self.load_source(&self.claude_root, true, AgentKind::ClaudeCode, limit)?);
        sessions.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        sessions.truncate(limit);
        Ok(sessions)
    }

    pub fn find(&self, id: &str) -> Result<AgentSession> {
        self.load(usize::MAX)?
            .into_iter()
            .find(|s| s.id == id)
            .ok_or_else(|| ForgeError::SessionNotFound(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, body: &str) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn classify_event_names() {
        assert_eq!(EventKind::classify("read_file"), EventKind::Read);
        assert_eq!(EventKind::classify("open_file"), EventKind::Read);
        assert_eq!(EventKind::classify("apply_patch"), EventKind::Edit);
        assert_eq!(EventKind::classify("Bash"), EventKind::Message);
        assert_eq!(EventKind::classify("shell"), EventKind::Run);
        assert_eq!(EventKind::classify("git_commit"), EventKind::Commit);
        assert_eq!(EventKind::classify("assistant"), EventKind::Message);
    }

    #[test]
    fn opencode_log_is_parsed() {
        let home = TempDir::new().unwrap();
        let log = home.path().join(".opencode/sessions/s-001.jsonl");
        let long = "word ".repeat(100);
        write(
            &log,
            &format!(
                "{{\"timestamp\": \"2026-01-02T10:00:00\", \"type\": \"message\", \"message\": \"Fix   the\\n login bug\", \"branch\": \"feat/login\", \"project_path\": \"/work/app\"}}\n\
                 not json at all\n\
                 \n\
                 {{\"timestamp\": \"2026-01-02T10:01:00\", \"tool\": \"read_file\", \"path\": \"src/login.rs\"}}\n\
                 {{\"timestamp\": \"2026-01-02T10:05:00\", \"tool\": \"run\", \"command\": \"{long}\"}}\n"
            ),
        );

        let sessions = SessionLoader::new(home.path()).load(DEFAULT_LIMIT).unwrap();
        assert_eq!(sessions.len(), 1);
        let s = &sessions[0];
        assert_eq!(s.id, "s-001");
        assert_eq!(s.agent, AgentKind::OpenCode);
        assert_eq!(s.branch, "feat/login");
        assert_eq!(s.project_path, "/work/app");
        assert_eq!(s.started_at, "2026-01-02T10:00:00");
        assert_eq!(s.ended_at.as_deref(), Some("2026-01-02T10:05:00"));
        assert_eq!(s.events.len(), 3);
        assert_eq!(s.events[0].summary, "Fix the login bug");
        assert_eq!(s.events[1].summary, "read_file: src/login.rs");
        assert_eq!(s.events[1].kind, EventKind::Read);
        assert_eq!(s.events[2].summary.chars().count(), 160);
        assert_eq!(s.count(EventKind::Run), 1);
    }

    #[test]
    fn claude_logs_are_found_recursively_and_sorted() {
        let home = TempDir::new().unwrap();
        write(
            &home.path().join(".claude/projects/-work-api/older.jsonl"),
            r#"{"timestamp": "2026-01-01T09:00:00", "type": "user", "cwd": "/work/api", "gitBranch": "main", "message": {"role": "user", "content": "add tests"}}"#,
        );
        write(
            &home.path().join(".opencode/sessions/newer.jsonl"),
            r#"{"timestamp": "2026-03-01T09:00:00", "tool": "edit", "file": "a.rs"}"#,
        );
        write(&home.path().join(".opencode/sessions/empty.jsonl"), "\n\n");

        let loader = SessionLoader::new(home.path());
        let sessions = loader.load(10).unwrap();
        let ids: Vec<_> = sessions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec!["newer", "older"]);
        assert_eq!(sessions[1].agent, AgentKind::ClaudeCode);
        assert_eq!(sessions[1].project_path, "/work/api");
        assert_eq!(sessions[1].branch, "main");
        assert_eq!(sessions[1].events[0].summary, "add tests");

        assert_eq!(loader.load(1).unwrap().len(), 1);
        assert_eq!(loader.find("older").unwrap().agent, AgentKind::ClaudeCode);
        assert!(matches!(loader.find("missing"), Err(ForgeError::SessionNotFound(_))));
    }

    #[test]
    fn non_utf8_line_is_skipped() {
        let dir = TempDir::new().unwrap();
        let log = dir.path().join("mixed.jsonl");
        let mut bytes = b"{\"timestamp\": \"2026-01-01T10:00:00\", \"tool\": \"read\", \"path\": \"a.rs\"}\n".to_vec();
        bytes.extend_from_slice(b"\xff\xfe garbage\n");
        bytes.extend_from_slice(b"{\"timestamp\": \"2026-01-01T10:05:00\", \"tool\": \"edit\", \"path\": \"a.rs\"}\n");
        std::fs::write(&log, bytes).unwrap();

        let session = parse_log(&log, AgentKind::OpenCode).unwrap().unwrap();
        assert_eq!(session.events.len(), 2);
        assert_eq!(session.events[0].kind, EventKind::Read);
        assert_eq!(session.events[1].kind, EventKind::Edit);
    }

    #[test]
    fn no_logs_means_no_sessions() {
        let home = TempDir::new().unwrap();
        assert!(SessionLoader::new(home.path()).load(DEFAULT_LIMIT).unwrap().is_empty());
    }
}
