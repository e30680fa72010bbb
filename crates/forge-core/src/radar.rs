//! Forge Radar: a quick health snapshot of a project with actionable
//! warnings.

use crate::error::{ForgeError, Result};
use crate::vault::{list_subdirs, Vault};
use crate::{git, paths, plugins};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum GitStatus {
    NoGit,
    Clean,
    Dirty,
}

impl GitStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            GitStatus::NoGit => "no_git",
            GitStatus::Clean => "clean",
            GitStatus::Dirty => "dirty",
        }
    }
}

impl fmt::Display for GitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl Severity {
    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RadarWarning {
    pub severity: Severity,
    pub code: &'static str,
    pub message: String,
    pub action: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectHealth {
    pub project_path: PathBuf,
    pub has_agents_md: bool,
    pub has_opencode_json: bool,
    pub has_opencode_dir: bool,
    pub active_skills: Vec<String>,
    pub git_status: GitStatus,
    pub warnings: Vec<RadarWarning>,
}

impl ProjectHealth {
    pub fn has_code(&self, code: &str) -> bool {
        self.warnings.iter().any(|w| w.code == code)
    }

    pub fn is_healthy(&self) -> bool {
        self.warnings.is_empty()
    }
}

fn git_status(project: &Path) -> GitStatus {
    if !git::is_repo(project) {
        return GitStatus::NoGit;
    }
    match git::status_porcelain(project) {
        Ok(out) if out.is_empty() => GitStatus::Clean,
        Ok(_) => GitStatus::Dirty,
        Err(e) => {
            tracing::debug!(path = %project.display(), "git status failed: {e}");
            GitStatus::NoGit
        }
    }
}

fn warn(severity: Severity, code: &'static str, message: impl Into<String>, action: &'static str) -> RadarWarning {
    RadarWarning { severity, code, message: message.into(), action }
}

pub fn scan(vault: &Vault, project: &Path) -> Result<ProjectHealth> {
    if !project.is_dir() {
        return Err(ForgeError::PathNotFound(project.display().to_string()));
    }
    let project_path = std::fs::canonicalize(project)?;

    let active_skills = list_subdirs(&vault.project_skills_dir(&project_path))?
        .iter()
        .filter_map(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();

    let mut health = ProjectHealth {
        has_agents_md: project_path.join(paths::AGENTS_MD).exists(),
        has_opencode_json: paths::project_opencode_json(&project_path).exists(),
        has_opencode_dir: project_path.join(".opencode").is_dir(),
        active_skills,
        git_status: git_status(&project_path),
        warnings: Vec::new(),
        project_path,
    };

    if !health.has_agents_md {
        health.warnings.push(warn(
            Severity::Error,
            "AGENTS_MD_MISSING",
            "AGENTS.md is missing: agent context is incomplete.",
            "Bootstrap project",
        ));
    }
    if !health.has_opencode_json {
        health.warnings.push(warn(
            Severity::Warning,
            "OPENCODE_JSON_MISSING",
            "opencode.json is missing: MCP servers and plugins cannot be configured.",
            "Run Provisioner",
        ));
    }
    if !health.has_opencode_dir {
        health.warnings.push(warn(
            Severity::Warning,
            "OPENCODE_DIR_MISSING",
            ".opencode/ directory not found.",
            "Run Provisioner",
        ));
    }
    if health.git_status == GitStatus::Dirty {
        health.warnings.push(warn(
            Severity::Info,
            "GIT_DIRTY",
            "Git workspace has uncommitted changes.",
            "Review changes",
        ));
    }
    let missing = vault.missing_keys().len();
    if missing > 0 {
        health.warnings.push(warn(
            Severity::Info,
            "KEYS_INCOMPLETE",
            format!("{missing} API key(s) are not set in the Vault."),
            "Open Vault",
        ));
    }

    tracing::debug!(warnings = health.warnings.len(), "radar scan complete");
    Ok(health)
}

/// The project's `opencode.json`, or an empty map when it is missing or
/// unreadable.
pub fn load_opencode_config(project: &Path) -> Map<String, Value> {
    match plugins::load_opencode_json(&paths::project_opencode_json(project)) {
        Ok(Some(map)) => map,
        Ok(None) => Map::new(),
        Err(e) => {
            tracing::warn!("{e}");
            Map::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testutil::git;
    use crate::vault::Provider;
    use tempfile::TempDir;

    #[test]
    fn empty_project_reports_everything() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let vault = Vault::open(home.path()).unwrap();

        let health = scan(&vault, project.path()).unwrap();
        assert_eq!(health.git_status, GitStatus::NoGit);
        for code in ["AGENTS_MD_MISSING", "OPENCODE_JSON_MISSING", "OPENCODE_DIR_MISSING", "KEYS_INCOMPLETE"] {
            assert!(health.has_code(code), "missing {code}");
        }
        assert!(!health.has_code("GIT_DIRTY"));
        assert_eq!(health.warnings[0].severity, Severity::Error);
        assert!(health.warnings[3].message.starts_with("5 API key(s)"));
    }

    #[test]
    fn provisioned_project_lists_skills() {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let mut vault = Vault::open(home.path()).unwrap();
        for p in Provider::all() {
            vault.set_key(*p, "sk-test-1234567890").unwrap();
        }
        std::fs::write(project.path().join("AGENTS.md"), "# agents\n").unwrap();
        std::fs::write(project.path().join("opencode.json"), "{}").unwrap();
        let skills = vault.project_skills_dir(project.path());
        std::fs::create_dir_all(skills.join("reviewer")).unwrap();
        std::fs::create_dir_all(skills.join("api-helper")).unwrap();

        let health = scan(&vault, project.path()).unwrap();
        assert!(health.is_healthy(), "{:?}", health.warnings);
        assert_eq!(health.active_skills, vec!["api-helper", "reviewer"]);
    }

    #[test]
    fn dirty_worktree_is_flagged() {
        if !git::git_available() {
            return;
        }
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let vault = Vault::open(home.path()).unwrap();
        git(&["init", "-q"], project.path());
        assert_eq!(scan(&vault, project.path()).unwrap().git_status, GitStatus::Clean);

        std::fs::write(project.path().join("main.rs"), "fn main() {}\n").unwrap();
        let health = scan(&vault, project.path()).unwrap();
        assert_eq!(health.git_status, GitStatus::Dirty);
        assert!(health.has_code("GIT_DIRTY"));
    }

    #[test]
    fn missing_project_errors() {
        let home = TempDir::new().unwrap();
        let vault = Vault::open(home.path()).unwrap();
        assert!(matches!(
            scan(&vault, &home.path().join("nope")),
            Err(ForgeError::PathNotFound(_))
        ));
    }

    #[test]
    fn opencode_config_is_best_effort() {
        let project = TempDir::new().unwrap();
        assert!(load_opencode_config(project.path()).is_empty());
        std::fs::write(project.path().join("opencode.json"), "{ not json").unwrap();
        assert!(load_opencode_config(project.path()).is_empty());
        std::fs::write(project.path().join("opencode.json"), r#"{"model": "m"}"#).unwrap();
        assert_eq!(load_opencode_config(project.path())["model"], "m");
    }
}
