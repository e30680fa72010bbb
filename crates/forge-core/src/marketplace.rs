//! Skill marketplace: a remote JSON index with a local cache and a small
//! built-in fallback, plus install by git clone.

use crate::error::{ForgeError, Result};
use crate::skill::{self, SkillMetadata};
use crate::vault::Vault;
use crate::{git, io, paths};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const REGISTRY_URL: &str = "https://skills.nebula-forge.dev/index.json";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketplaceSkill {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub author: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub stars: f64,
    #[serde(default)]
    pub downloads: u64,
    #[serde(default)]
    pub verified: bool,
    #[serde(default)]
    pub compatible_agents: Vec<String>,
    #[serde(default)]
    pub repo_url: String,
    #[serde(default = "default_version")]
    pub version: String,
}

fn default_category() -> String {
    "general".to_string()
}

fn default_version() -> String {
    skill::DEFAULT_VERSION.to_string()
}

#[derive(Debug, Deserialize)]
struct IndexPayload {
    #[serde(default)]
    skills: Vec<MarketplaceSkill>,
}

fn builtin_skills() -> Vec<MarketplaceSkill> {
    let entry = |id: &str,
                 description: &str,
                 author: &str,
                 category: &str,
                 tags: &[&str],
                 stars: f64,
                 downloads: u64,
                 verified: bool,
                 agents: &[&str]| MarketplaceSkill {
        id: id.to_string(),
        name: id.to_string(),
        description: description.to_string(),
        author: author.to_string(),
        category: category.to_string(),
        tags: tags.iter().map(|t| t.to_string()).collect(),
        stars,
        downloads,
        verified,
        compatible_agents: agents.iter().map(|a| a.to_string()).collect(),
        repo_url: format!("https://github.com/nebula-forge/skills-{id}.git"),
        version: skill::DEFAULT_VERSION.to_string(),
    };
    vec![
        entry(
            "code-reviewer",
            "Expert code review with security, performance, and style checks.",
            "nebula-community",
            "code-review",
            &["review", "security", "quality"],
            4.9,
            1200,
            true,
            &["opencode", "claude-code", "gemini"],
        ),
        entry(
            "db-migrator",
            "Generate safe, reversible DB migration plans with rollback strategy.",
            "sqlengineer",
            "database",
            &["database", "migrations", "postgres"],
            4.7,
            890,
            false,
            &["opencode", "claude-code"],
        ),
        entry(
            "api-contract-writer",
            "Write OpenAPI 3.1 contracts from code and product requirements.",
            "api_guild",
            "documentation",
            &["openapi", "rest", "docs"],
            4.6,
            743,
            false,
            &["opencode", "claude-code", "gemini"],
        ),
    ]
}

// ---------------------------------------------------------------------------
// Index
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexSource {
    Remote,
    Cache,
    Builtin,
}

impl fmt::Display for IndexSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            IndexSource::Remote => "remote",
            IndexSource::Cache => "cache",
            IndexSource::Builtin => "built-in",
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketIndex {
    pub source: IndexSource,
    pub skills: Vec<MarketplaceSkill>,
}

impl MarketIndex {
    /// Case-insensitive match over name, description, author, tags and
    /// category. A blank query returns everything.
    pub fn search(&self, query: &str) -> Vec<&MarketplaceSkill> {
        let q = query.trim().to_lowercase();
        self.skills
            .iter()
            .filter(|s| {
                q.is_empty()
                    || s.name.to_lowercase().contains(&q)
                    || s.description.to_lowercase().contains(&q)
                    || s.author.to_lowercase().contains(&q)
                    || s.tags.iter().any(|t| t.to_lowercase().contains(&q))
                    || s.category.to_lowercase().contains(&q)
            })
            .collect()
    }

    pub fn find(&self, id: &str) -> Result<&MarketplaceSkill> {
        self.skills
            .iter()
            .find(|s| s.id == id || s.name == id)
            .ok_or_else(|| ForgeError::MarketSkillNotFound(id.to_string()))
    }
}

pub struct Marketplace {
    url: String,
    cache_path: PathBuf,
}

impl Marketplace {
    /// Registry URL from the vault override, or the public registry.
    pub fn new(vault: &Vault) -> Self {
        let url = vault
            .config()
            .marketplace_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .unwrap_or_else(|| REGISTRY_URL.to_string());
        Self::with_url(url, paths::marketplace_cache(vault.home()))
    }

    pub fn with_url(url: impl Into<String>, cache_path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            cache_path: cache_path.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn fetch_remote(&self, timeout: Duration) -> Result<Vec<MarketplaceSkill>> {
        let client = reqwest::blocking::Client::builder().timeout(timeout).build()?;
        let raw = client.get(&self.url).send()?.error_for_status()?.text()?;
        let payload: IndexPayload = serde_json::from_str(&raw)?;
        io::atomic_write(&self.cache_path, raw.as_bytes())?;
        Ok(payload.skills)
    }

    fn load_cache(&self) -> Result<Vec<MarketplaceSkill>> {
        let Some(raw) = io::read_optional(&self.cache_path)? else {
            return Ok(Vec::new());
        };
        let payload: IndexPayload = serde_json::from_str(&raw)?;
        Ok(payload.skills)
    }

    /// Remote index, falling back to the cache and then the built-in list.
    pub fn fetch_index(&self, timeout: Duration) -> MarketIndex {
        match self.fetch_remote(timeout) {
            Ok(skills) if !skills.is_empty() => {
                return MarketIndex { source: IndexSource::Remote, skills };
            }
            Ok(_) => tracing::warn!(url = %self.url, "marketplace index is empty"),
            Err(e) => tracing::warn!(url = %self.url, "marketplace fetch failed: {e}"),
        }
        self.load_offline()
    }

    /// Cache, then built-ins. Never touches the network.
    pub fn load_offline(&self) -> MarketIndex {
        match self.load_cache() {
            Ok(skills) if !skills.is_empty() => MarketIndex { source: IndexSource::Cache, skills },
            Ok(_) => MarketIndex { source: IndexSource::Builtin, skills: builtin_skills() },
            Err(e) => {
                tracing::warn!(path = %self.cache_path.display(), "unreadable marketplace cache: {e}");
                MarketIndex { source: IndexSource::Builtin, skills: builtin_skills() }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Install
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallMethod {
    Cloned,
    Scaffolded,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutcome {
    pub path: PathBuf,
    pub method: InstallMethod,
}

/// Clone `skill` into `<target_root>/<name>`. A listing without a repo URL
/// is rejected. When the clone fails (private or missing repo, no git), a
/// starter SKILL.md is written from the listing.
pub fn install(skill: &MarketplaceSkill, target_root: &Path) -> Result<InstallOutcome> {
    let name = paths::sanitize_name(&skill.name)?;
    let target = target_root.join(&name);
    if target.exists() {
        return Err(ForgeError::SkillExists(target.display().to_string()));
    }
    if skill.repo_url.trim().is_empty() {
        return Err(ForgeError::MissingRepoUrl);
    }
    io::ensure_dir(target_root)?;

    match git::clone_shallow(skill.repo_url.trim(), None, &target) {
        Ok(()) => {
            tracing::info!(skill = %name, "cloned marketplace skill");
            return Ok(InstallOutcome { path: target, method: InstallMethod::Cloned });
        }
        Err(e) => {
            tracing::warn!(skill = %name, "clone failed, scaffolding instead: {e}");
            if target.exists() {
                std::fs::remove_dir_all(&target)?;
            }
        }
    }

    let mut meta = SkillMetadata::new(&name, &skill.category, &skill.description)?
        .with_tags(&skill.tags);
    if !skill.author.is_empty() {
        meta.author = skill.author.clone();
    }
    meta.version = skill.version.clone();
    io::atomic_write(&paths::skill_file(&target), skill::render_skill_md(&meta).as_bytes())?;
    Ok(InstallOutcome { path: target, method: InstallMethod::Scaffolded })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::testutil::bare_remote;
    use crate::skill::SkillSummary;
    use tempfile::TempDir;

    const INDEX: &str = r#"{"skills": [
        {"id": "k8s-operator", "name": "k8s-operator", "description": "Operate clusters",
         "author": "ops", "category": "infra", "tags": ["kubernetes"], "stars": 4.2,
         "downloads": 10, "repo_url": ""}
    ]}"#;

    #[test]
    fn remote_index_is_used_and_cached() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(INDEX)
            .create();
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("cache.json");
        let market = Marketplace::with_url(format!("{}/index.json", server.url()), &cache);

        let index = market.fetch_index(DEFAULT_TIMEOUT);
        mock.assert();
        assert_eq!(index.source, IndexSource::Remote);
        assert_eq!(index.skills[0].version, "1.0.0");
        assert!(cache.is_file());

        let offline = market.load_offline();
        assert_eq!(offline.source, IndexSource::Cache);
        assert_eq!(offline.skills.len(), 1);
    }

    #[test]
    fn server_error_falls_back_to_cache() {
        let mut server = mockito::Server::new();
        server.mock("GET", "/index.json").with_status(500).create();
        let dir = TempDir::new().unwrap();
        let cache = dir.path().join("cache.json");
        std::fs::write(&cache, INDEX).unwrap();
        let market = Marketplace::with_url(format!("{}/index.json", server.url()), &cache);

        let index = market.fetch_index(DEFAULT_TIMEOUT);
        assert_eq!(index.source, IndexSource::Cache);
        // a failed fetch must not clobber the cache
        assert_eq!(std::fs::read_to_string(&cache).unwrap(), INDEX);
    }

    #[test]
    fn empty_remote_and_no_cache_uses_builtins() {
        let mut server = mockito::Server::new();
        server
            .mock("GET", "/index.json")
            .with_status(200)
            .with_body(r#"{"skills": []}"#)
            .create();
        let dir = TempDir::new().unwrap();
        let market = Marketplace::with_url(
            format!("{}/index.json", server.url()),
            dir.path().join("missing-dir/cache.json"),
        );
        let index = market.fetch_index(DEFAULT_TIMEOUT);
        assert_eq!(index.source, IndexSource::Builtin);
        assert_eq!(index.skills.len(), 3);
    }

    #[test]
    fn search_covers_tags_author_and_category() {
        let index = MarketIndex { source: IndexSource::Builtin, skills: builtin_skills() };
        assert_eq!(index.search("POSTGRES")[0].id, "db-migrator");
        assert_eq!(index.search("api_guild")[0].id, "api-contract-writer");
        assert_eq!(index.search("code-review").len(), 1);
        assert_eq!(index.search("").len(), 3);
        assert!(index.search("haskell").is_empty());
        assert!(index.find("db-migrator").is_ok());
        assert!(index.find("nope").is_err());
    }

    #[test]
    fn vault_override_sets_url() {
        let home = TempDir::new().unwrap();
        let mut vault = Vault::open(home.path()).unwrap();
        assert_eq!(Marketplace::new(&vault).url(), REGISTRY_URL);
        vault.config_mut().marketplace_url = Some("http://localhost:9/index.json".into());
        assert_eq!(Marketplace::new(&vault).url(), "http://localhost:9/index.json");
    }

    #[test]
    fn failed_clone_scaffolds_skill() {
        let root = TempDir::new().unwrap();
        let mut skill = builtin_skills().remove(1);
        skill.repo_url = root.path().join("does-not-exist.git").display().to_string();

        let outcome = install(&skill, &root.path().join("skills")).unwrap();
        assert_eq!(outcome.method, InstallMethod::Scaffolded);
        let summary = SkillSummary::load(&outcome.path).unwrap();
        assert_eq!(summary.name, "db-migrator");
        assert_eq!(summary.category, "database");

        assert!(matches!(
            install(&skill, &root.path().join("skills")),
            Err(ForgeError::SkillExists(_))
        ));
    }

    #[test]
    fn listing_without_repo_url_is_rejected() {
        let root = TempDir::new().unwrap();
        let mut skill = builtin_skills().remove(0);
        skill.repo_url = "  ".into();

        let skills = root.path().join("skills");
        assert!(matches!(install(&skill, &skills), Err(ForgeError::MissingRepoUrl)));
        assert!(!skills.join("code-reviewer").exists());
    }

    #[test]
    fn clone_installs_repo() {
        if !git::git_available() {
            return;
        }
        let tmp = TempDir::new().unwrap();
        let remote = bare_remote(tmp.path(), &[("SKILL.md", "---\nname: remote-skill\n---\n")]);
        let mut skill = builtin_skills().remove(0);
        skill.repo_url = remote.display().to_string();

        let outcome = install(&skill, &tmp.path().join("skills")).unwrap();
        assert_eq!(outcome.method, InstallMethod::Cloned);
        assert!(outcome.path.join("SKILL.md").is_file());
    }
}
