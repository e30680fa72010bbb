//! The Vault: persistent user configuration, API key profiles and directory
//! overrides, stored as JSON at `~/.nebula-forge/vault.json`.
//!
//! Every mutating operation saves immediately. The file is written atomically
//! and restricted to the owner on Unix because it holds API keys in clear text.

use crate::error::{ForgeError, Result};
use crate::{io, paths, theme};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

pub const DEFAULT_MODEL: &str = "copilot/claude-opus-4-6";
pub const DEFAULT_PROFILE: &str = "default";
const MASK: &str = "••••••••";
const NOT_SET: &str = "⚠ NOT SET";

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    GoogleAi,
    Anthropic,
    GithubCopilot,
    Nvidia,
    OpencodeZen,
}

impl Provider {
    pub fn all() -> &'static [Provider] {
        &[
            Provider::GoogleAi,
            Provider::Anthropic,
            Provider::GithubCopilot,
            Provider::Nvidia,
            Provider::OpencodeZen,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Provider::GoogleAi => "google_ai",
            Provider::Anthropic => "anthropic",
            Provider::GithubCopilot => "github_copilot",
            Provider::Nvidia => "nvidia",
            Provider::OpencodeZen => "opencode_zen",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Provider::GoogleAi => "Google AI",
            Provider::Anthropic => "Anthropic",
            Provider::GithubCopilot => "GitHub Copilot",
            Provider::Nvidia => "NVIDIA NIM",
            Provider::OpencodeZen => "OpenCode Zen",
        }
    }

    /// Environment variable used by `env_exports`.
    pub fn env_var(self) -> &'static str {
        match self {
            Provider::GoogleAi => "GOOGLE_AI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::GithubCopilot => "GITHUB_COPILOT_TOKEN",
            Provider::Nvidia => "NVIDIA_API_KEY",
            Provider::OpencodeZen => "OPENCODE_ZEN_API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Provider {
    type Err = ForgeError;

    fn from_str(s: &str) -> Result<Self> {
        Provider::all()
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| ForgeError::UnknownProvider(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// ApiKeys
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default)]
    pub google_ai: Option<String>,
    #[serde(default)]
    pub anthropic: Option<String>,
    #[serde(default)]
    pub github_copilot: Option<String>,
    #[serde(default)]
    pub nvidia: Option<String>,
    #[serde(default)]
    pub opencode_zen: Option<String>,
    #[serde(default)]
    pub custom_endpoints: BTreeMap<String, String>,
}

impl ApiKeys {
    pub fn get(&self, provider: Provider) -> Option<&str> {
        let slot = match provider {
            Provider::GoogleAi => &self.google_ai,
            Provider::Anthropic => &self.anthropic,
            Provider::GithubCopilot => &self.github_copilot,
            Provider::Nvidia => &self.nvidia,
            Provider::OpencodeZen => &self.opencode_zen,
        };
        slot.as_deref().filter(|v| !v.is_empty())
    }

    fn slot_mut(&mut self, provider: Provider) -> &mut Option<String> {
        match provider {
            Provider::GoogleAi => &mut self.google_ai,
            Provider::Anthropic => &mut self.anthropic,
            Provider::GithubCopilot => &mut self.github_copilot,
            Provider::Nvidia => &mut self.nvidia,
            Provider::OpencodeZen => &mut self.opencode_zen,
        }
    }

    /// Providers without a value.
    pub fn missing(&self) -> Vec<Provider> {
        Provider::all()
            .iter()
            .copied()
            .filter(|p| self.get(*p).is_none())
            .collect()
    }

    /// Keys with values masked for display: the first 8 characters followed
    /// by a mask. Custom endpoints are always fully masked.
    pub fn masked(&self) -> Vec<(String, String)> {
        let mut out: Vec<(String, String)> = Provider::all()
            .iter()
            .map(|p| {
                let shown = match self.get(*p) {
                    Some(v) => mask(v),
                    None => NOT_SET.to_string(),
                };
                (p.as_str().to_string(), shown)
            })
            .collect();
        for name in self.custom_endpoints.keys() {
            out.push((format!("custom:{name}"), MASK.to_string()));
        }
        out
    }
}

fn mask(value: &str) -> String {
    let prefix: String = value.chars().take(8).collect();
    format!("{prefix}{MASK}")
}

// ---------------------------------------------------------------------------
// VaultConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub api_keys: ApiKeys,
    pub key_profiles: BTreeMap<String, ApiKeys>,
    pub active_profile: String,
    pub global_base_path: String,
    pub default_model: String,
    pub default_provider: String,
    pub initialized: bool,
    pub created_at: Option<String>,
    pub last_modified: Option<String>,
    pub theme: String,
    pub custom_skills_dir: Option<String>,
    pub custom_agents_dir: Option<String>,
    pub custom_logs_dir: Option<String>,
    pub custom_blueprints_dir: Option<String>,
    pub project_skills_subdir: String,
    pub project_agents_subdir: String,
    pub sync_repo_url: Option<String>,
    pub sync_branch: String,
    pub sync_auto: bool,
    pub sync_last_pull: Option<String>,
    pub sync_last_push: Option<String>,
    pub marketplace_url: Option<String>,
    /// Keys this version does not know about, kept so a save never drops them.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            api_keys: ApiKeys::default(),
            key_profiles: BTreeMap::new(),
            active_profile: DEFAULT_PROFILE.to_string(),
            global_base_path: String::new(),
            default_model: DEFAULT_MODEL.to_string(),
            default_provider: Provider::GithubCopilot.as_str().to_string(),
            initialized: false,
            created_at: None,
            last_modified: None,
            theme: theme::DEFAULT_THEME.to_string(),
            custom_skills_dir: None,
            custom_agents_dir: None,
            custom_logs_dir: None,
            custom_blueprints_dir: None,
            project_skills_subdir: ".opencode/skills".to_string(),
            project_agents_subdir: ".opencode/agents".to_string(),
            sync_repo_url: None,
            sync_branch: "main".to_string(),
            sync_auto: false,
            sync_last_pull: None,
            sync_last_push: None,
            marketplace_url: None,
            extra: serde_json::Map::new(),
        }
    }
}

/// Partial settings update; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct SettingsUpdate {
    pub default_model: Option<String>,
    pub default_provider: Option<Provider>,
    pub base_path: Option<String>,
    pub theme: Option<String>,
    pub marketplace_url: Option<String>,
}

/// Global directory overrides; `None` leaves a directory unchanged.
#[derive(Debug, Clone, Default)]
pub struct DirOverrides {
    pub skills: Option<String>,
    pub agents: Option<String>,
    pub logs: Option<String>,
    pub blueprints: Option<String>,
}

// ---------------------------------------------------------------------------
// Vault
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Vault {
    home: PathBuf,
    config: VaultConfig,
}

impl Vault {
    /// Load the vault for `home`. A missing file yields defaults; a file that
    /// cannot be parsed is an error so keys are never silently discarded.
    pub fn open(home: impl Into<PathBuf>) -> Result<Self> {
        let home = home.into();
        let path = paths::vault_file(&home);
        let config = match io::read_optional(&path)? {
            Some(raw) => serde_json::from_str(&raw)?,
            None => VaultConfig::default(),
        };
        let mut vault = Self { home, config };
        if vault.config.global_base_path.is_empty() {
            vault.config.global_base_path = vault.home.display().to_string();
        }
        if vault.migrate_profiles() {
            tracing::debug!("migrated vault keys into profile '{DEFAULT_PROFILE}'");
        }
        Ok(vault)
    }

    /// Ensure profile metadata exists. Returns true if anything changed.
    fn migrate_profiles(&mut self) -> bool {
        let mut changed = false;
        if self.config.key_profiles.is_empty() {
            self.config
                .key_profiles
                .insert(DEFAULT_PROFILE.to_string(), self.config.api_keys.clone());
            changed = true;
        }
        if !self.config.key_profiles.contains_key(&self.config.active_profile) {
            self.config.active_profile = DEFAULT_PROFILE.to_string();
            self.config
                .key_profiles
                .entry(DEFAULT_PROFILE.to_string())
                .or_insert_with(|| self.config.api_keys.clone());
            changed = true;
        }
        changed
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut VaultConfig {
        &mut self.config
    }

    pub fn file_path(&self) -> PathBuf {
        paths::vault_file(&self.home)
    }

    // -----------------------------------------------------------------------
    // Bootstrap / persistence
    // -----------------------------------------------------------------------

    /// Create the standard directory structure.
    pub fn ensure_dirs(&self) -> Result<()> {
        let agents = self.agents_dir();
        let dirs = [
            self.vault_dir(),
            self.skills_dir(),
            agents.clone(),
            agents.join("examples"),
            self.logs_dir(),
            self.blueprints_dir(),
        ];
        for dir in &dirs {
            io::ensure_dir(dir)?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.ensure_dirs()?;
        let data = serde_json::to_string_pretty(&self.config)?;
        io::write_private(&self.file_path(), data.as_bytes())?;
        tracing::debug!(path = %self.file_path().display(), "vault saved");
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.file_path().exists() && self.config.initialized
    }

    pub fn mark_initialized(&mut self) -> Result<()> {
        self.config.initialized = true;
        self.config.created_at = Some(now_iso());
        self.save()
    }

    // -----------------------------------------------------------------------
    // Keys (active profile)
    // -----------------------------------------------------------------------

    pub fn active_keys(&self) -> &ApiKeys {
        self.config
            .key_profiles
            .get(&self.config.active_profile)
            .unwrap_or(&self.config.api_keys)
    }

    pub fn get_key(&self, provider: Provider) -> Option<&str> {
        self.active_keys().get(provider)
    }

    fn edit_active_keys(&mut self, f: impl FnOnce(&mut ApiKeys)) {
        let active = self.config.active_profile.clone();
        let fallback = self.config.api_keys.clone();
        let keys = self.config.key_profiles.entry(active).or_insert(fallback);
        f(keys);
        self.config.api_keys = keys.clone();
    }

    /// Set a provider key on the active profile. Blank values are ignored.
    pub fn set_key(&mut self, provider: Provider, value: &str) -> Result<()> {
        let value = value.trim();
        if value.is_empty() {
            return Ok(());
        }
        self.edit_active_keys(|k| *k.slot_mut(provider) = Some(value.to_string()));
        self.touch();
        self.save()
    }

    pub fn unset_key(&mut self, provider: Provider) -> Result<()> {
        self.edit_active_keys(|k| *k.slot_mut(provider) = None);
        self.touch();
        self.save()
    }

    pub fn set_custom_key(&mut self, name: &str, value: &str) -> Result<()> {
        let name = name.trim();
        let value = value.trim();
        if name.is_empty() {
            return Err(ForgeError::InvalidName(name.to_string()));
        }
        if value.is_empty() {
            return Ok(());
        }
        self.edit_active_keys(|k| {
            k.custom_endpoints.insert(name.to_string(), value.to_string());
        });
        self.touch();
        self.save()
    }

    pub fn remove_custom_key(&mut self, name: &str) -> Result<()> {
        if !self.active_keys().custom_endpoints.contains_key(name) {
            return Err(ForgeError::CustomKeyNotFound(name.to_string()));
        }
        self.edit_active_keys(|k| {
            k.custom_endpoints.remove(name);
        });
        self.touch();
        self.save()
    }

    pub fn masked_keys(&self) -> Vec<(String, String)> {
        self.active_keys().masked()
    }

    pub fn missing_keys(&self) -> Vec<Provider> {
        self.active_keys().missing()
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    pub fn list_profiles(&self) -> Vec<String> {
        self.config.key_profiles.keys().cloned().collect()
    }

    pub fn active_profile(&self) -> &str {
        &self.config.active_profile
    }

    /// Create an empty key profile. Returns the sanitised profile name.
    pub fn create_profile(&mut self, name: &str) -> Result<String> {
        let name = paths::sanitize_name(name)?;
        if self.config.key_profiles.contains_key(&name) {
            return Err(ForgeError::ProfileExists(name));
        }
        self.config
            .key_profiles
            .insert(name.clone(), ApiKeys::default());
        self.touch();
        self.save()?;
        Ok(name)
    }

    pub fn switch_profile(&mut self, name: &str) -> Result<()> {
        let keys = self
            .config
            .key_profiles
            .get(name)
            .cloned()
            .ok_or_else(|| ForgeError::ProfileNotFound(name.to_string()))?;
        self.config.active_profile = name.to_string();
        self.config.api_keys = keys;
        self.touch();
        self.save()
    }

    pub fn delete_profile(&mut self, name: &str) -> Result<()> {
        if name == self.config.active_profile {
            return Err(ForgeError::ProfileActive(name.to_string()));
        }
        if self.config.key_profiles.remove(name).is_none() {
            return Err(ForgeError::ProfileNotFound(name.to_string()));
        }
        self.touch();
        self.save()
    }

    // -----------------------------------------------------------------------
    // Settings
    // -----------------------------------------------------------------------

    pub fn update_settings(&mut self, update: SettingsUpdate) -> Result<()> {
        if let Some(theme) = &update.theme {
            if !theme::is_known(theme) {
                return Err(ForgeError::UnknownTheme(theme.clone()));
            }
        }
        if let Some(model) = update.default_model.filter(|m| !m.trim().is_empty()) {
            self.config.default_model = model.trim().to_string();
        }
        if let Some(provider) = update.default_provider {
            self.config.default_provider = provider.as_str().to_string();
        }
        if let Some(base) = update.base_path.filter(|b| !b.trim().is_empty()) {
            let expanded = paths::expand_tilde(base.trim(), &self.home);
            self.config.global_base_path = expanded.display().to_string();
        }
        if let Some(theme) = update.theme {
            self.config.theme = theme;
        }
        if let Some(url) = update.marketplace_url {
            let url = url.trim().to_string();
            self.config.marketplace_url = if url.is_empty() { None } else { Some(url) };
        }
        self.touch();
        self.save()
    }

    /// Store global directory overrides. When a directory moves away from an
    /// existing empty directory, the old one is removed.
    pub fn update_dirs(&mut self, overrides: DirOverrides) -> Result<()> {
        let changes = [
            (overrides.skills, self.skills_dir(), DirKind::Skills),
            (overrides.agents, self.agents_dir(), DirKind::Agents),
            (overrides.logs, self.logs_dir(), DirKind::Logs),
            (overrides.blueprints, self.blueprints_dir(), DirKind::Blueprints),
        ];
        for (new_value, old_path, kind) in changes {
            let Some(raw) = new_value.filter(|v| !v.trim().is_empty()) else {
                continue;
            };
            let new_path = paths::expand_tilde(raw.trim(), &self.home);
            if new_path != old_path && io::remove_dir_if_empty(&old_path)? {
                tracing::info!(path = %old_path.display(), "removed empty directory");
            }
            let stored = Some(new_path.display().to_string());
            match kind {
                DirKind::Skills => self.config.custom_skills_dir = stored,
                DirKind::Agents => self.config.custom_agents_dir = stored,
                DirKind::Logs => self.config.custom_logs_dir = stored,
                DirKind::Blueprints => self.config.custom_blueprints_dir = stored,
            }
        }
        self.touch();
        self.save()
    }

    pub fn update_project_dirs(
        &mut self,
        skills_subdir: Option<String>,
        agents_subdir: Option<String>,
    ) -> Result<()> {
        if let Some(s) = skills_subdir.filter(|s| !s.trim().is_empty()) {
            self.config.project_skills_subdir = s.trim().to_string();
        }
        if let Some(a) = agents_subdir.filter(|a| !a.trim().is_empty()) {
            self.config.project_agents_subdir = a.trim().to_string();
        }
        self.touch();
        self.save()
    }

    fn touch(&mut self) {
        self.config.last_modified = Some(now_iso());
    }

    // -----------------------------------------------------------------------
    // Paths
    // -----------------------------------------------------------------------

    pub fn vault_dir(&self) -> PathBuf {
        paths::vault_dir(&self.home)
    }

    fn resolve(&self, custom: &Option<String>, default_rel: &str) -> PathBuf {
        match custom {
            Some(p) if !p.is_empty() => paths::expand_tilde(p, &self.home),
            _ => self.home.join(default_rel),
        }
    }

    pub fn skills_dir(&self) -> PathBuf {
        self.resolve(&self.config.custom_skills_dir, paths::SKILLS_DIR)
    }

    pub fn agents_dir(&self) -> PathBuf {
        self.resolve(&self.config.custom_agents_dir, paths::AGENTS_DIR)
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.resolve(&self.config.custom_logs_dir, paths::LOGS_DIR)
    }

    pub fn blueprints_dir(&self) -> PathBuf {
        self.resolve(&self.config.custom_blueprints_dir, paths::BLUEPRINTS_DIR)
    }

    pub fn project_skills_dir(&self, project: &Path) -> PathBuf {
        project.join(&self.config.project_skills_subdir)
    }

    pub fn project_agents_dir(&self, project: &Path) -> PathBuf {
        project.join(&self.config.project_agents_subdir)
    }

    // -----------------------------------------------------------------------
    // Skill registry
    // -----------------------------------------------------------------------

    /// Global skill directories, sorted by name.
    pub fn list_global_skills(&self) -> Result<Vec<PathBuf>> {
        list_subdirs(&self.skills_dir())
    }

    pub fn skill_exists(&self, name: &str) -> bool {
        self.skill_path(name).exists()
    }

    pub fn skill_path(&self, name: &str) -> PathBuf {
        self.skills_dir().join(name)
    }

    // -----------------------------------------------------------------------
    // Exports / status
    // -----------------------------------------------------------------------

    /// Shell `export` lines for every key that is set on the active profile.
    pub fn env_exports(&self) -> String {
        let keys = self.active_keys();
        let mut lines = Vec::new();
        for provider in Provider::all() {
            if let Some(v) = keys.get(*provider) {
                lines.push(format!("export {}={}", provider.env_var(), v));
            }
        }
        for (name, value) in &keys.custom_endpoints {
            lines.push(format!("export CUSTOM_{}_KEY={}", env_ident(name), value));
        }
        lines.join("\n")
    }

    /// Write `env_exports` to `~/.nebula-forge/exports.sh` (owner-only).
    pub fn write_exports(&self) -> Result<PathBuf> {
        let path = paths::exports_file(&self.home);
        let mut body = self.env_exports();
        body.push('\n');
        io::write_private(&path, body.as_bytes())?;
        Ok(path)
    }

    pub fn status_summary(&self) -> Result<Vec<(String, String)>> {
        let keys = self.active_keys();
        let mut out: Vec<(String, String)> = Provider::all()
            .iter()
            .map(|p| {
                let state = if keys.get(*p).is_some() { "✓ set" } else { "✗ missing" };
                (p.label().to_string(), state.to_string())
            })
            .collect();
        for name in keys.custom_endpoints.keys() {
            let short: String = name.chars().take(12).collect();
            out.push((format!("Custom: {short}"), "✓ set".to_string()));
        }
        out.push(("Default Model".into(), self.config.default_model.clone()));
        out.push(("Default Provider".into(), self.config.default_provider.clone()));
        out.push(("Base Path".into(), self.config.global_base_path.clone()));
        out.push((
            "Skills".into(),
            self.list_global_skills()?.len().to_string(),
        ));
        out.push(("Profile".into(), self.config.active_profile.clone()));
        out.push(("Theme".into(), self.config.theme.clone()));
        out.push((
            "Initialized".into(),
            if self.config.initialized { "yes" } else { "no" }.to_string(),
        ));
        Ok(out)
    }
}

enum DirKind {
    Skills,
    Agents,
    Logs,
    Blueprints,
}

/// Sorted subdirectories of `dir`; a missing directory is empty.
pub fn list_subdirs(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

fn env_ident(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect()
}

pub(crate) fn now_iso() -> String {
    Local::now().format("%Y-%m-%dT%H:%M:%S").to_string()
}
