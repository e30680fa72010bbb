//! Blueprint templates: long-form planning documents with `{{key}}`
//! placeholders, rendered with YAML frontmatter and saved under the vault's
//! blueprints directory.

use crate::error::{ForgeError, Result};
use crate::vault::{now_iso, Vault};
use crate::{io, paths};
use chrono::{DateTime, Local};
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Rendered in place of any value that is still empty.
pub const UNRESOLVED: &str = "_TBD_";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BlueprintVariable {
    pub key: &'static str,
    pub label: &'static str,
    pub placeholder: &'static str,
    pub required: bool,
    pub default: &'static str,
}

const fn var(key: &'static str, label: &'static str, placeholder: &'static str) -> BlueprintVariable {
    BlueprintVariable { key, label, placeholder, required: true, default: "" }
}

const fn var_default(key: &'static str, label: &'static str, default: &'static str) -> BlueprintVariable {
    BlueprintVariable { key, label, placeholder: "", required: true, default }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BlueprintKind {
    Refactor,
    Migration,
    Architecture,
}

impl fmt::Display for BlueprintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BlueprintKind::Refactor => "refactor",
            BlueprintKind::Migration => "migration",
            BlueprintKind::Architecture => "architecture",
        })
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct BlueprintTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub kind: BlueprintKind,
    pub variables: &'static [BlueprintVariable],
    pub thinking_mode: &'static str,
    pub model_context: &'static str,
    pub preferred_model: &'static str,
    pub icon: &'static str,
    #[serde(skip)]
    pub body: &'static str,
}

pub const TEMPLATES: &[BlueprintTemplate] = &[
    BlueprintTemplate {
        id: "refactor",
        name: "Massive Refactor",
        description: "Multi-file refactor with test safety net, phased approach, and conventional commits.",
        kind: BlueprintKind::Refactor,
        variables: &[
            var("project", "Project Name", "MyApp"),
            var("module", "Target Module/Path", "src/auth/"),
            var("objective", "Refactor Objective", "Improve modularity"),
            var_default("complexity", "Complexity", "High"),
            var("coverage", "Current Test Coverage", "~60%"),
            var("test_cmd", "Test Command", "npm test"),
            var("issues", "Known Issues", "High coupling, no types"),
            var("goal1", "Goal 1", "Add TypeScript types"),
            var("goal2", "Goal 2", "Reduce file size"),
            var("goal3", "Goal 3", "Add unit tests"),
            var("critical_paths", "Critical Paths", "login, checkout"),
            var("success", "Success Criteria", "All tests pass"),
            var_default("model", "Preferred Model", "copilot/claude-opus-4-6"),
        ],
        thinking_mode: "ultra",
        model_context: "high_effort",
        preferred_model: "copilot/claude-opus-4-6",
        icon: "◉",
        body: include_str!("../assets/blueprints/refactor.md"),
    },
    BlueprintTemplate {
        id: "migration",
        name: "Legacy Migration",
        description: "Strangler fig pattern migration from legacy to modern stack with rollback strategy.",
        kind: BlueprintKind::Migration,
        variables: &[
            var("project", "Project Name", "LegacyApp"),
            var("from_tech", "From Technology", "PHP Monolith"),
            var("to_tech", "To Technology", "Node.js Microservices"),
            var("timeline", "Timeline", "Q1 2026"),
            var("risks", "High Risk Areas", "auth, payments"),
            var("domain1", "Domain 1", "Auth"),
            var("domain2", "Domain 2", "Products"),
            var("domain3", "Domain 3", "Orders"),
            var_default("error_threshold", "Rollback Error Threshold", "1%"),
            var_default("soak_period", "Soak Period", "2 weeks"),
            var("rollback", "Rollback Strategy", "Feature flags"),
            var_default("model", "Preferred Model", "copilot/gemini-3.1-pro-preview"),
        ],
        thinking_mode: "ultra",
        model_context: "high_effort",
        preferred_model: "copilot/gemini-3.1-pro-preview",
        icon: "⟲",
        body: include_str!("../assets/blueprints/migration.md"),
    },
    BlueprintTemplate {
        id: "architecture",
        name: "System Architecture",
        description: "C4 model system design with NFRs, data model, API design, and infrastructure plan.",
        kind: BlueprintKind::Architecture,
        variables: &[
            var("project", "Project Name", "NewPlatform"),
            var("system_name", "System Name", "Payment Service"),
            var("scope", "Scope", "Core Platform"),
            var("req1", "Requirement 1", "Users can register"),
            var("req2", "Requirement 2", "Process payments"),
            var("req3", "Requirement 3", "Send notifications"),
            var_default("availability", "Availability SLA", "99.9%"),
            var_default("latency", "Latency Target", "p99 < 200ms"),
            var_default("scale", "Scale Target", "10k concurrent users"),
            var_default("security", "Security Requirements", "SOC2"),
            var("api_tech", "API Gateway Tech", "Kong"),
            var("app_tech", "App Tech", "FastAPI"),
            var("db_tech", "Database", "PostgreSQL"),
            var_default("cache_tech", "Cache", "Redis"),
            var_default("queue_tech", "Queue", "SQS"),
            var_default("api_style", "API Style", "REST"),
            var_default("auth", "Auth Method", "JWT + OAuth2"),
            var_default("cloud", "Cloud Provider", "AWS"),
            var_default("deploy_target", "Deploy Target", "ECS"),
            var("adr1", "ADR 1", "Why PostgreSQL"),
            var("adr2", "ADR 2", "Sync vs async"),
            var("question1", "Open Question 1", "Sharding strategy?"),
            var("question2", "Open Question 2", "Cache invalidation?"),
            var_default("model", "Preferred Model", "copilot/claude-opus-4-6"),
        ],
        thinking_mode: "ultra",
        model_context: "high_effort",
        preferred_model: "copilot/claude-opus-4-6",
        icon: "⬡",
        body: include_str!("../assets/blueprints/architecture.md"),
    },
];

pub fn find_template(id: &str) -> Result<&'static BlueprintTemplate> {
    TEMPLATES
        .iter()
        .find(|t| t.id == id)
        .ok_or_else(|| ForgeError::BlueprintNotFound(id.to_string()))
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ResolvedVariables {
    pub values: BTreeMap<String, String>,
    /// Required keys that are still empty after defaults.
    pub missing: Vec<String>,
}

/// Apply defaults to `supplied`. Blank supplied values count as unset.
pub fn resolve_variables(
    template: &BlueprintTemplate,
    supplied: &BTreeMap<String, String>,
) -> ResolvedVariables {
    let mut out = ResolvedVariables::default();
    for v in template.variables {
        let value = supplied
            .get(v.key)
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .unwrap_or(v.default)
            .to_string();
        if value.is_empty() && v.required {
            out.missing.push(v.key.to_string());
        }
        out.values.insert(v.key.to_string(), value);
    }
    out
}

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{\{\s*(\w+)\s*\}\}").unwrap())
}

fn interpolate(body: &str, values: &BTreeMap<String, String>) -> String {
    placeholder_re()
        .replace_all(body, |caps: &Captures<'_>| {
            values
                .get(&caps[1])
                .filter(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| UNRESOLVED.to_string())
        })
        .into_owned()
}

/// Render `template` as markdown. `project_name` fills the `project`
/// variable when it was not supplied.
pub fn generate_blueprint(
    template: &BlueprintTemplate,
    supplied: &BTreeMap<String, String>,
    project_name: &str,
) -> String {
    let mut supplied = supplied.clone();
    let has_project = supplied.get("project").is_some_and(|p| !p.trim().is_empty());
    if !has_project && !project_name.trim().is_empty() {
        supplied.insert("project".to_string(), project_name.trim().to_string());
    }
    let resolved = resolve_variables(template, &supplied);
    let project = resolved
        .values
        .get("project")
        .filter(|p| !p.is_empty())
        .map(String::as_str)
        .unwrap_or(UNRESOLVED);
    let model = resolved
        .values
        .get("model")
        .filter(|m| !m.is_empty())
        .map(String::as_str)
        .unwrap_or(template.preferred_model);

    format!(
        "---\n\
blueprint: {id}\n\
project: {project}\n\
thinking_mode: {thinking}\n\
model_context: {context}\n\
preferred_model: {model}\n\
generated_at: {at}\n\
---\n\
\n\
{body}",
        id = template.id,
        thinking = template.thinking_mode,
        context = template.model_context,
        at = now_iso(),
        body = interpolate(template.body, &resolved.values),
    )
}

/// `<slugified template name>-YYYYmmdd-HHMM.md`
pub fn blueprint_filename(template: &BlueprintTemplate, now: &DateTime<Local>) -> String {
    format!("{}-{}.md", paths::slugify(template.name), now.format("%Y%m%d-%H%M"))
}

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Write `content` to the blueprints dir. `.md` is appended when missing.
pub fn save_blueprint(vault: &Vault, content: &str, filename: &str) -> Result<PathBuf> {
    let base = Path::new(filename)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| ForgeError::InvalidName(filename.to_string()))?;
    let name = if base.ends_with(".md") { base } else { format!("{base}.md") };
    let path = vault.blueprints_dir().join(name);
    io::atomic_write(&path, content.as_bytes())?;
    tracing::info!(path = %path.display(), "blueprint saved");
    Ok(path)
}

#[derive(Debug, Clone, Serialize)]
pub struct SavedBlueprint {
    pub name: String,
    pub path: PathBuf,
    pub bytes: u64,
}

/// Saved `.md` blueprints, newest file name first.
pub fn list_saved(vault: &Vault) -> Result<Vec<SavedBlueprint>> {
    let dir = vault.blueprints_dir();
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        out.push(SavedBlueprint {
            name: entry.file_name().to_string_lossy().into_owned(),
            bytes: entry.metadata()?.len(),
            path,
        });
    }
    out.sort_by(|a, b| b.name.cmp(&a.name));
    Ok(out)
}
