use crate::error::{ForgeError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants (relative to the user's home)
// ---------------------------------------------------------------------------

pub const VAULT_DIR: &str = ".nebula-forge";
pub const VAULT_FILE: &str = ".nebula-forge/vault.json";
pub const LOGS_DIR: &str = ".nebula-forge/logs";
pub const BLUEPRINTS_DIR: &str = ".nebula-forge/blueprints";
pub const SYNC_REGISTRY_DIR: &str = ".nebula-forge/sync-registry";
pub const MARKETPLACE_CACHE: &str = ".nebula-forge/marketplace_cache.json";
pub const EXPORTS_FILE: &str = ".nebula-forge/exports.sh";

pub const SKILLS_DIR: &str = ".config/opencode/skills";
pub const AGENTS_DIR: &str = ".config/opencode/agents";
pub const GLOBAL_OPENCODE_JSON: &str = ".config/opencode/opencode.json";

pub const OPENCODE_SESSIONS_DIR: &str = ".opencode/sessions";
pub const CLAUDE_PROJECTS_DIR: &str = ".claude/projects";

// ---------------------------------------------------------------------------
// Project-relative constants
// ---------------------------------------------------------------------------

pub const AGENTS_MD: &str = "AGENTS.md";
pub const OPENCODE_JSON: &str = "opencode.json";
pub const OPENCODE_DIR: &str = ".opencode";
pub const MCP_SERVERS_DIR: &str = ".opencode/mcp-servers";
pub const CLAUDE_MD: &str = "CLAUDE.md";
pub const GEMINI_JSON: &str = "gemini.json";
pub const NEBULA_DIR: &str = ".nebula";

pub const SKILL_FILE: &str = "SKILL.md";
pub const ORCHESTRATOR_FILE: &str = "orchestrator.md";

pub const OPENCODE_SCHEMA: &str = "https://opencode.ai/config.json";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn vault_dir(home: &Path) -> PathBuf {
    home.join(VAULT_DIR)
}

pub fn vault_file(home: &Path) -> PathBuf {
    home.join(VAULT_FILE)
}

pub fn sync_registry_dir(home: &Path) -> PathBuf {
    home.join(SYNC_REGISTRY_DIR)
}

pub fn marketplace_cache(home: &Path) -> PathBuf {
    home.join(MARKETPLACE_CACHE)
}

pub fn exports_file(home: &Path) -> PathBuf {
    home.join(EXPORTS_FILE)
}

pub fn global_opencode_json(home: &Path) -> PathBuf {
    home.join(GLOBAL_OPENCODE_JSON)
}

pub fn project_opencode_json(project: &Path) -> PathBuf {
    project.join(OPENCODE_JSON)
}

pub fn skill_file(skill_dir: &Path) -> PathBuf {
    skill_dir.join(SKILL_FILE)
}

/// The invoking user's home directory.
pub fn user_home() -> Result<PathBuf> {
    home::home_dir().ok_or(ForgeError::HomeNotFound)
}

/// Expand a leading `~` against `home`. Other paths are returned unchanged.
pub fn expand_tilde(raw: &str, home: &Path) -> PathBuf {
    if raw == "~" {
        return home.to_path_buf();
    }
    match raw.strip_prefix("~/") {
        Some(rest) => home.join(rest),
        None => PathBuf::from(raw),
    }
}

// ---------------------------------------------------------------------------
// Name sanitising
// ---------------------------------------------------------------------------

static NON_WORD_RE: OnceLock<Regex> = OnceLock::new();

fn non_word_re() -> &'static Regex {
    NON_WORD_RE.get_or_init(|| Regex::new(r"[^\w-]").unwrap())
}

/// Normalise a user-supplied skill/profile/plugin name.
///
/// Lowercases, trims, and replaces every character that is not a word
/// character or `-` with `-`. A result without any word character is rejected.
pub fn sanitize_name(raw: &str) -> Result<String> {
    let lowered = raw.trim().to_lowercase();
    let clean = non_word_re().replace_all(&lowered, "-").into_owned();
    if !clean.chars().any(|c| c.is_alphanumeric() || c == '_') {
        return Err(ForgeError::InvalidName(raw.to_string()));
    }
    Ok(clean)
}

/// Reject names that would escape their parent directory when joined onto it.
pub fn check_component(name: &str) -> Result<&str> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(ForgeError::InvalidName(name.to_string()));
    }
    Ok(name)
}

/// Slug for file names: sanitised, with runs of `-` collapsed and trimmed.
pub fn slugify(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    let replaced = non_word_re().replace_all(&lowered, "-");
    let mut out = String::with_capacity(replaced.len());
    for c in replaced.chars() {
        if c == '-' && out.ends_with('-') {
            continue;
        }
        out.push(c);
    }
    out.trim_matches('-').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_lowercases_and_replaces() {
        assert_eq!(sanitize_name("  Code Reviewer ").unwrap(), "code-reviewer");
        assert_eq!(sanitize_name("db_migrator!").unwrap(), "db_migrator-");
    }

    #[test]
    fn sanitize_rejects_empty() {
        for raw in ["", "   ", "!!!", "--"] {
            assert!(sanitize_name(raw).is_err(), "expected invalid: {raw:?}");
        }
    }

    #[test]
    fn component_check_rejects_traversal() {
        assert_eq!(check_component("api-helper").unwrap(), "api-helper");
        for raw in ["", ".", "..", "../x", "a/b", "a\\b"] {
            assert!(check_component(raw).is_err(), "expected invalid: {raw:?}");
        }
    }

    #[test]
    fn slugify_collapses_dashes() {
        assert_eq!(slugify("Massive Refactor"), "massive-refactor");
        assert_eq!(slugify("  Legacy -- Migration! "), "legacy-migration");
    }

    #[test]
    fn expand_tilde_against_home() {
        let home = Path::new("/home/dev");
        assert_eq!(expand_tilde("~/skills", home), PathBuf::from("/home/dev/skills"));
        assert_eq!(expand_tilde("~", home), PathBuf::from("/home/dev"));
        assert_eq!(expand_tilde("/opt/skills", home), PathBuf::from("/opt/skills"));
    }

    #[test]
    fn path_helpers() {
        let home = Path::new("/home/dev");
        assert_eq!(
            vault_file(home),
            PathBuf::from("/home/dev/.nebula-forge/vault.json")
        );
        assert_eq!(
            global_opencode_json(home),
            PathBuf::from("/home/dev/.config/opencode/opencode.json")
        );
    }
}
