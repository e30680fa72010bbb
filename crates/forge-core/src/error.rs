use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("invalid name '{0}': must contain at least one letter, digit, '_' or '-'")]
    InvalidName(String),

    #[error("unknown provider '{0}' (expected google_ai, anthropic, github_copilot, nvidia or opencode_zen)")]
    UnknownProvider(String),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("profile already exists: {0}")]
    ProfileExists(String),

    #[error("cannot delete the active profile '{0}'")]
    ProfileActive(String),

    #[error("custom endpoint not found: {0}")]
    CustomKeyNotFound(String),

    #[error("unknown theme '{0}'")]
    UnknownTheme(String),

    #[error("skill not found: {0}")]
    SkillNotFound(String),

    #[error("skill already exists at {0}")]
    SkillExists(String),

    #[error("invalid frontmatter: {0}")]
    Frontmatter(String),

    #[error("invalid skill file {path}: {reason}")]
    InvalidSkill { path: String, reason: String },

    #[error("path not found: {0}")]
    PathNotFound(String),

    #[error("blueprint template not found: {0}")]
    BlueprintNotFound(String),

    #[error("plugin not found: {0}")]
    PluginNotFound(String),

    #[error("plugin '{0}' is already installed")]
    PluginInstalled(String),

    #[error("plugin '{0}' is not installed")]
    PluginNotInstalled(String),

    #[error("invalid opencode.json at {path}: {reason}")]
    InvalidOpencodeConfig { path: String, reason: String },

    #[error("marketplace skill not found: {0}")]
    MarketSkillNotFound(String),

    #[error("cookbook entry not found: {0}")]
    CookbookNotFound(String),

    #[error("sync repository is not configured: run 'forge sync configure <url>'")]
    SyncNotConfigured,

    #[error("repository URL is required")]
    MissingRepoUrl,

    #[error("sync dir exists but is not a git repo: {0}")]
    NotAGitRepo(String),

    #[error("git is not installed or not on PATH")]
    GitNotInstalled,

    #[error("git {command} failed: {stderr}")]
    GitFailed { command: String, stderr: String },

    #[error("http error: {0}")]
    Http(String),

    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("home directory not found: set HOME or pass --home")]
    HomeNotFound,

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ForgeError {
    fn from(e: reqwest::Error) -> Self {
        ForgeError::Http(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ForgeError>;
