//! Project detection, provisioning plans, the Ghost Diff preview and plan
//! execution.
//!
//! Planning never touches the filesystem beyond reads. A plan is a list of
//! [`ProvisionEntry`] values that [`ghost_diff`] can preview and
//! [`execute_plan`] applies in order.

use crate::diff::{self, DiffStats};
use crate::error::{ForgeError, Result};
use crate::skill::{self, SkillMetadata};
use crate::vault::Vault;
use crate::{io, paths, plugins};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

pub const FORGE_SECTION_START: &str = "<!-- forge:start -->";
pub const FORGE_SECTION_END: &str = "<!-- forge:end -->";

/// Marker files and the stack label they imply, in display order.
const STACK_MARKERS: &[(&str, &str)] = &[
    ("package.json", "Node.js"),
    ("tsconfig.json", "TypeScript"),
    ("pyproject.toml", "Python"),
    ("requirements.txt", "Python"),
    ("setup.py", "Python"),
    ("Cargo.toml", "Rust"),
    ("go.mod", "Go"),
    ("pom.xml", "Java"),
    ("build.gradle", "Java"),
    ("Gemfile", "Ruby"),
    ("composer.json", "PHP"),
    ("Dockerfile", "Docker"),
];

// ---------------------------------------------------------------------------
// Project detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ProjectContext {
    pub path: PathBuf,
    pub name: String,
    pub has_git: bool,
    pub has_package_json: bool,
    pub has_pyproject: bool,
    pub has_agents_md: bool,
    pub has_opencode_json: bool,
    pub has_opencode_dir: bool,
    pub has_claude_md: bool,
    pub has_gemini_json: bool,
    pub has_nebula_agents: bool,
    pub detected_stack: Vec<String>,
    pub available_skills: Vec<String>,
}

impl ProjectContext {
    pub fn stack_label(&self) -> String {
        if self.detected_stack.is_empty() {
            "unknown".to_string()
        } else {
            self.detected_stack.join(", ")
        }
    }
}

pub fn detect_project(vault: &Vault, path: &Path) -> Result<ProjectContext> {
    if !path.is_dir() {
        return Err(ForgeError::PathNotFound(path.display().to_string()));
    }
    let name = std::fs::canonicalize(path)
        .ok()
        .and_then(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .unwrap_or_else(|| path.display().to_string());

    let mut detected_stack: Vec<String> = Vec::new();
    for (marker, label) in STACK_MARKERS {
        if path.join(marker).exists() && !detected_stack.iter().any(|s| s == label) {
            detected_stack.push(label.to_string());
        }
    }

    let available_skills = vault
        .list_global_skills()?
        .iter()
        .filter_map(|d| d.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();

    Ok(ProjectContext {
        path: path.to_path_buf(),
        name,
        has_git: path.join(".git").exists(),
        has_package_json: path.join("package.json").exists(),
        has_pyproject: path.join("pyproject.toml").exists(),
        has_agents_md: path.join(paths::AGENTS_MD).is_file(),
        has_opencode_json: path.join(paths::OPENCODE_JSON).is_file(),
        has_opencode_dir: path.join(paths::OPENCODE_DIR).is_dir(),
        has_claude_md: path.join(paths::CLAUDE_MD).is_file(),
        has_gemini_json: path.join(paths::GEMINI_JSON).is_file(),
        has_nebula_agents: path.join(paths::NEBULA_DIR).is_dir(),
        detected_stack,
        available_skills,
    })
}

// ---------------------------------------------------------------------------
// Plan types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionAction {
    Mkdir,
    Create,
    Modify,
    Symlink,
}

impl ProvisionAction {
    pub fn as_str(self) -> &'static str {
        match self {
            ProvisionAction::Mkdir => "mkdir",
            ProvisionAction::Create => "create",
            ProvisionAction::Modify => "modify",
            ProvisionAction::Symlink => "symlink",
        }
    }
}

impl fmt::Display for ProvisionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionEntry {
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub action: ProvisionAction,
    pub description: String,
    /// Link target for `Symlink`, copy source for skill copies.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
}

impl ProvisionEntry {
    fn mkdir(path: PathBuf, description: impl Into<String>) -> Self {
        Self {
            path,
            content: None,
            action: ProvisionAction::Mkdir,
            description: description.into(),
            source: None,
        }
    }

    fn file(
        action: ProvisionAction,
        path: PathBuf,
        content: String,
        description: impl Into<String>,
    ) -> Self {
        Self {
            path,
            content: Some(content),
            action,
            description: description.into(),
            source: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PlanCounts {
    pub mkdir: usize,
    pub create: usize,
    pub modify: usize,
    pub symlink: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionPlan {
    pub title: String,
    pub description: String,
    pub project_path: Option<PathBuf>,
    pub entries: Vec<ProvisionEntry>,
}

impl ProvisionPlan {
    fn new(title: impl Into<String>, description: impl Into<String>, project: Option<&Path>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            project_path: project.map(Path::to_path_buf),
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn counts(&self) -> PlanCounts {
        let mut c = PlanCounts::default();
        for e in &self.entries {
            match e.action {
                ProvisionAction::Mkdir => c.mkdir += 1,
                ProvisionAction::Create => c.create += 1,
                ProvisionAction::Modify => c.modify += 1,
                ProvisionAction::Symlink => c.symlink += 1,
            }
        }
        c
    }

    pub fn summary(&self) -> String {
        let c = self.counts();
        if self.is_empty() {
            return "nothing to do".to_string();
        }
        let mut parts = vec![format!("create {} files/dirs", c.mkdir + c.create)];
        if c.modify > 0 {
            parts.push(format!("modify {} files", c.modify));
        }
        if c.symlink > 0 {
            parts.push(format!("link {} skills", c.symlink));
        }
        parts.join(", ")
    }

    /// Replace the planned content of the entry at `path`.
    pub fn set_content(&mut self, path: &Path, content: String) -> bool {
        match self.entries.iter_mut().find(|e| e.path == path) {
            Some(entry) => {
                entry.content = Some(content);
                true
            }
            None => false,
        }
    }

    /// `path` relative to the plan's project, for display.
    pub fn display_path(&self, path: &Path) -> String {
        self.project_path
            .as_deref()
            .and_then(|root| path.strip_prefix(root).ok())
            .unwrap_or(path)
            .display()
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Project bootstrap
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct BootstrapOptions {
    /// Global skills to link into the project.
    pub skills: Vec<String>,
    /// Also write CLAUDE.md, gemini.json and `.nebula/`.
    pub legacy: bool,
}

pub fn plan_project_bootstrap(
    vault: &Vault,
    ctx: &ProjectContext,
    options: &BootstrapOptions,
) -> Result<ProvisionPlan> {
    let root = ctx.path.as_path();
    let mut plan = ProvisionPlan::new(
        format!("Bootstrap {}", ctx.name),
        format!("OpenCode configuration for {} ({})", ctx.name, ctx.stack_label()),
        Some(root),
    );

    let skills_dir = vault.project_skills_dir(root);
    let agents_dir = vault.project_agents_dir(root);
    let mut planned_dirs: BTreeSet<PathBuf> = BTreeSet::new();
    for (dir, desc) in [
        (root.join(paths::OPENCODE_DIR), "OpenCode project directory"),
        (skills_dir.clone(), "project skills directory"),
        (agents_dir.clone(), "project agents directory"),
    ] {
        if !dir.exists() && planned_dirs.insert(dir.clone()) {
            plan.entries.push(ProvisionEntry::mkdir(dir, desc));
        }
    }

    // Skill links are resolved first so AGENTS.md can list them.
    let mut links = Vec::new();
    let mut seen = BTreeSet::new();
    for name in &options.skills {
        paths::check_component(name)?;
        if !seen.insert(name.as_str()) {
            continue;
        }
        if !vault.skill_exists(name) {
            return Err(ForgeError::SkillNotFound(name.clone()));
        }
        let target = skills_dir.join(name);
        if target.symlink_metadata().is_ok() {
            tracing::debug!(skill = %name, "skill already present in project");
            continue;
        }
        links.push(ProvisionEntry {
            path: target,
            content: None,
            action: ProvisionAction::Symlink,
            description: format!("link global skill '{name}'"),
            source: Some(vault.skill_path(name)),
        });
    }

    let mut project_skills: BTreeSet<String> = installed_skill_names(&skills_dir)?;
    project_skills.extend(seen.iter().map(|s| s.to_string()));
    let project_skills: Vec<String> = project_skills.into_iter().collect();

    if let Some(entry) = plan_agents_md(vault, ctx, &project_skills)? {
        plan.entries.push(entry);
    }
    if let Some(entry) = plan_opencode_json(root)? {
        plan.entries.push(entry);
    }

    let orchestrator = agents_dir.join(paths::ORCHESTRATOR_FILE);
    if !orchestrator.exists() {
        plan.entries.push(ProvisionEntry::file(
            ProvisionAction::Create,
            orchestrator,
            orchestrator_md(vault, ctx, &project_skills),
            "orchestrator agent",
        ));
    }

    plan.entries.extend(links);

    if options.legacy {
        let claude = root.join(paths::CLAUDE_MD);
        if !claude.exists() {
            plan.entries.push(ProvisionEntry::file(
                ProvisionAction::Create,
                claude,
                "# CLAUDE.md\n\nAgent instructions for this project live in [AGENTS.md](AGENTS.md).\n"
                    .to_string(),
                "legacy Claude pointer",
            ));
        }
        let gemini = root.join(paths::GEMINI_JSON);
        if !gemini.exists() {
            let body = serde_json::to_string_pretty(&json!({ "contextFileName": paths::AGENTS_MD }))?;
            plan.entries.push(ProvisionEntry::file(
                ProvisionAction::Create,
                gemini,
                format!("{body}\n"),
                "legacy Gemini pointer",
            ));
        }
        let nebula = root.join(paths::NEBULA_DIR);
        if !nebula.exists() {
            plan.entries.push(ProvisionEntry::mkdir(nebula, "legacy agent directory"));
        }
    }

    Ok(plan)
}

fn installed_skill_names(dir: &Path) -> Result<BTreeSet<String>> {
    let mut out = BTreeSet::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.path().is_dir() {
            out.insert(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(out)
}

/// The managed AGENTS.md section, markers included.
pub fn forge_section(vault: &Vault, ctx: &ProjectContext, skills: &[String]) -> String {
    let cfg = vault.config();
    let mut s = String::new();
    s.push_str(FORGE_SECTION_START);
    s.push_str("\n## Nebula Forge\n\n");
    s.push_str(&format!("- Stack: {}\n", ctx.stack_label()));
    s.push_str(&format!("- Default model: `{}`\n", cfg.default_model));
    s.push_str(&format!(
        "- Orchestrator: `{}/{}`\n",
        cfg.project_agents_subdir,
        paths::ORCHESTRATOR_FILE
    ));
    s.push_str(&format!("- Skills directory: `{}/`\n\n", cfg.project_skills_subdir));
    s.push_str("### Skills\n\n");
    if skills.is_empty() {
        s.push_str("No project skills installed yet.\n");
    } else {
        s.push_str("Load a skill's `SKILL.md` when the task matches its trigger.\n\n");
        for name in skills {
            s.push_str(&format!(
                "- `{name}`: `{}/{name}/{}`\n",
                cfg.project_skills_subdir,
                paths::SKILL_FILE
            ));
        }
    }
    s.push('\n');
    s.push_str(FORGE_SECTION_END);
    s
}

fn plan_agents_md(
    vault: &Vault,
    ctx: &ProjectContext,
    skills: &[String],
) -> Result<Option<ProvisionEntry>> {
    let path = ctx.path.join(paths::AGENTS_MD);
    let section = forge_section(vault, ctx, skills);

    let Some(existing) = io::read_optional(&path)? else {
        let content = format!(
            "# AGENTS.md\n\nAgent instructions for {}.\n\n{section}\n",
            ctx.name
        );
        return Ok(Some(ProvisionEntry::file(
            ProvisionAction::Create,
            path,
            content,
            "project rules for every agent",
        )));
    };

    let updated = if existing.contains(FORGE_SECTION_START) {
        match io::replace_between_markers(&existing, FORGE_SECTION_START, FORGE_SECTION_END, &section) {
            Some(updated) => updated,
            None => {
                tracing::warn!(
                    "AGENTS.md has {FORGE_SECTION_START} but no {FORGE_SECTION_END}; leaving it alone"
                );
                return Ok(None);
            }
        }
    } else {
        format!("{}\n\n{section}\n", existing.trim_end())
    };

    if updated == existing {
        return Ok(None);
    }
    Ok(Some(ProvisionEntry::file(
        ProvisionAction::Modify,
        path,
        updated,
        "refresh Nebula Forge section",
    )))
}

fn plan_opencode_json(root: &Path) -> Result<Option<ProvisionEntry>> {
    let path = paths::project_opencode_json(root);
    let Some(mut config) = plugins::load_opencode_json(&path)? else {
        let config = json!({
            "$schema": paths::OPENCODE_SCHEMA,
            "instructions": [paths::AGENTS_MD],
            "mcp": {},
        });
        return Ok(Some(ProvisionEntry::file(
            ProvisionAction::Create,
            path,
            format!("{}\n", serde_json::to_string_pretty(&config)?),
            "OpenCode project config",
        )));
    };

    let instructions = config
        .entry("instructions")
        .or_insert_with(|| Value::Array(Vec::new()));
    let Value::Array(list) = instructions else {
        return Err(ForgeError::InvalidOpencodeConfig {
            path: path.display().to_string(),
            reason: "'instructions' is not an array".to_string(),
        });
    };
    if list.iter().any(|v| v.as_str() == Some(paths::AGENTS_MD)) {
        return Ok(None);
    }
    list.push(Value::String(paths::AGENTS_MD.to_string()));
    Ok(Some(ProvisionEntry::file(
        ProvisionAction::Modify,
        path,
        format!("{}\n", serde_json::to_string_pretty(&Value::Object(config))?),
        "add AGENTS.md to instructions",
    )))
}

fn orchestrator_md(vault: &Vault, ctx: &ProjectContext, skills: &[String]) -> String {
    let cfg = vault.config();
    let skill_lines = if skills.is_empty() {
        "_No skills injected yet._".to_string()
    } else {
        skills
            .iter()
            .map(|s| format!("- `{s}`"))
            .collect::<Vec<_>>()
            .join("\n")
    };
    format!(
        "---\n\
description: Primary orchestrator for {name}\n\
mode: primary\n\
model: {model}\n\
---\n\
\n\
# Orchestrator: {name}\n\
\n\
You coordinate work on **{name}** ({stack}).\n\
\n\
## Skills\n\
{skill_lines}\n\
\n\
## Rules\n\
- Read `AGENTS.md` before starting any task.\n\
- Load `{skills_dir}/<skill>/SKILL.md` when a request matches that skill.\n\
- Break large requests into steps and confirm each before moving on.\n",
        name = ctx.name,
        model = cfg.default_model,
        stack = ctx.stack_label(),
        skills_dir = cfg.project_skills_subdir,
    )
}

// ---------------------------------------------------------------------------
// Skill plans
// ---------------------------------------------------------------------------

/// Plan a new skill from `meta` under `target_dir` (default: the global
/// skills dir) using the standard SKILL.md template.
pub fn plan_skill_creation(
    vault: &Vault,
    meta: &SkillMetadata,
    target_dir: Option<&Path>,
) -> Result<ProvisionPlan> {
    plan_skill_file(vault, meta, target_dir, skill::render_skill_md(meta))
}

/// Like [`plan_skill_creation`] with caller-supplied SKILL.md content.
pub fn plan_skill_file(
    vault: &Vault,
    meta: &SkillMetadata,
    target_dir: Option<&Path>,
    content: String,
) -> Result<ProvisionPlan> {
    let root = target_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| vault.skills_dir());
    let dir = root.join(&meta.name);
    if dir.exists() {
        return Err(ForgeError::SkillExists(dir.display().to_string()));
    }
    let mut plan = ProvisionPlan::new(
        format!("Create skill {}", meta.name),
        meta.description.clone(),
        Some(&root),
    );
    plan.entries.push(ProvisionEntry::mkdir(dir.clone(), "skill directory"));
    plan.entries.push(ProvisionEntry::file(
        ProvisionAction::Create,
        paths::skill_file(&dir),
        content,
        "skill definition",
    ));
    Ok(plan)
}

/// Plan copying a global skill's SKILL.md into `project`'s skills dir.
pub fn plan_skill_copy(vault: &Vault, name: &str, project: &Path) -> Result<ProvisionPlan> {
    paths::check_component(name)?;
    let source = paths::skill_file(&vault.skill_path(name));
    let content = io::read_optional(&source)?
        .ok_or_else(|| ForgeError::SkillNotFound(name.to_string()))?;
    let dir = vault.project_skills_dir(project).join(name);
    if dir.exists() {
        return Err(ForgeError::SkillExists(dir.display().to_string()));
    }
    let mut plan = ProvisionPlan::new(
        format!("Copy skill {name}"),
        format!("copy global skill '{name}' into the project"),
        Some(project),
    );
    plan.entries.push(ProvisionEntry::mkdir(dir.clone(), "skill directory"));
    let mut entry = ProvisionEntry::file(
        ProvisionAction::Create,
        paths::skill_file(&dir),
        content,
        "copied skill definition",
    );
    entry.source = Some(source);
    plan.entries.push(entry);
    Ok(plan)
}

// ---------------------------------------------------------------------------
// Ghost diff
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct GhostDiffEntry {
    pub path: String,
    pub action: ProvisionAction,
    pub description: String,
    pub exists: bool,
    pub stats: DiffStats,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unified: Option<String>,
}

/// Preview every entry of `plan` against what is on disk. Writes nothing.
pub fn ghost_diff(plan: &ProvisionPlan) -> Result<Vec<GhostDiffEntry>> {
    let mut out = Vec::with_capacity(plan.entries.len());
    for entry in &plan.entries {
        let rel = plan.display_path(&entry.path);
        let exists = entry.path.symlink_metadata().is_ok();
        let (stats, unified) = match entry.action {
            ProvisionAction::Create | ProvisionAction::Modify => {
                let current = if entry.path.is_file() {
                    io::read_optional(&entry.path)?.unwrap_or_default()
                } else {
                    String::new()
                };
                let planned = entry.content.as_deref().unwrap_or("");
                let lines = diff::diff_lines(&current, planned);
                let old_label = if exists { format!("a/{rel}") } else { "/dev/null".to_string() };
                let text = diff::render_unified(&old_label, &format!("b/{rel}"), &lines, 3);
                (DiffStats::of(&lines), Some(text))
            }
            ProvisionAction::Mkdir | ProvisionAction::Symlink => (DiffStats::default(), None),
        };
        out.push(GhostDiffEntry {
            path: rel,
            action: entry.action,
            description: entry.description.clone(),
            exists,
            stats,
            unified,
        });
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Execution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExecutionReport {
    pub applied: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

/// Apply `plan` in order. `on_progress` receives a message and the fraction
/// of entries processed so far.
///
/// `Create` never overwrites: an existing file is skipped and reported.
/// `Modify` overwrites. `Mkdir` is idempotent.
pub fn execute_plan(
    plan: &ProvisionPlan,
    mut on_progress: impl FnMut(&str, f32),
) -> Result<ExecutionReport> {
    let mut report = ExecutionReport::default();
    let total = plan.entries.len().max(1) as f32;

    for (i, entry) in plan.entries.iter().enumerate() {
        let rel = plan.display_path(&entry.path);
        tracing::debug!(action = %entry.action, path = %entry.path.display(), "applying");
        let applied = match entry.action {
            ProvisionAction::Mkdir => {
                io::ensure_dir(&entry.path)?;
                true
            }
            ProvisionAction::Create => {
                if entry.path.exists() {
                    false
                } else {
                    let body = entry.content.as_deref().unwrap_or("");
                    io::atomic_write(&entry.path, body.as_bytes())?;
                    true
                }
            }
            ProvisionAction::Modify => {
                let body = entry.content.as_deref().unwrap_or("");
                io::atomic_write(&entry.path, body.as_bytes())?;
                true
            }
            ProvisionAction::Symlink => {
                if entry.path.symlink_metadata().is_ok() {
                    false
                } else {
                    let source = entry
                        .source
                        .as_deref()
                        .ok_or_else(|| ForgeError::PathNotFound(rel.clone()))?;
                    link_skill(source, &entry.path)?;
                    true
                }
            }
        };

        let verb = if applied { entry.action.as_str() } else { "skip" };
        on_progress(&format!("{verb} {rel}"), (i + 1) as f32 / total);
        if applied {
            report.applied.push(entry.path.clone());
        } else {
            tracing::warn!(path = %entry.path.display(), "already exists, skipped");
            report.skipped.push(entry.path.clone());
        }
    }

    tracing::info!(
        applied = report.applied.len(),
        skipped = report.skipped.len(),
        "executed plan '{}'",
        plan.title
    );
    Ok(report)
}

#[cfg(unix)]
fn link_skill(source: &Path, target: &Path) -> Result<()> {
    if let Some(parent) = target.parent() {
        io::ensure_dir(parent)?;
    }
    std::os::unix::fs::symlink(source, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn link_skill(source: &Path, target: &Path) -> Result<()> {
    io::copy_file(&paths::skill_file(source), &paths::skill_file(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct Fixture {
        home: TempDir,
        project: TempDir,
        vault: Vault,
    }

    fn fixture() -> Fixture {
        let home = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        let vault = Vault::open(home.path()).unwrap();
        Fixture { home, project, vault }
    }

    fn add_global_skill(vault: &Vault, name: &str) {
        let dir = vault.skill_path(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("SKILL.md"),
            format!("---\nname: {name}\ndescription: test\n---\n# {name}\n"),
        )
        .unwrap();
    }

    #[test]
    fn detect_project_reads_markers() {
        let f = fixture();
        let root = f.project.path();
        std::fs::write(root.join("Cargo.toml"), "[package]").unwrap();
        std::fs::write(root.join("requirements.txt"), "").unwrap();
        std::fs::write(root.join("setup.py"), "").unwrap();
        std::fs::create_dir(root.join(".git")).unwrap();
        add_global_skill(&f.vault, "reviewer");

        let ctx = detect_project(&f.vault, root).unwrap();
        assert!(ctx.has_git);
        assert!(!ctx.has_agents_md);
        assert_eq!(ctx.detected_stack, vec!["Python", "Rust"]);
        assert_eq!(ctx.available_skills, vec!["reviewer"]);
    }

    #[test]
    fn detect_missing_path_errors() {
        let f = fixture();
        let missing = f.project.path().join("nope");
        assert!(matches!(
            detect_project(&f.vault, &missing),
            Err(ForgeError::PathNotFound(_))
        ));
    }

    #[test]
    fn empty_project_bootstrap_plan() {
        let f = fixture();
        add_global_skill(&f.vault, "reviewer");
        let ctx = detect_project(&f.vault, f.project.path()).unwrap();
        let plan = plan_project_bootstrap(
            &f.vault,
            &ctx,
            &BootstrapOptions {
                skills: vec!["reviewer".into()],
                legacy: false,
            },
        )
        .unwrap();

        let counts = plan.counts();
        assert_eq!(counts.mkdir, 3);
        assert_eq!(counts.create, 3);
        assert_eq!(counts.modify, 0);
        assert_eq!(counts.symlink, 1);

        let agents = plan
            .entries
            .iter()
            .find(|e| e.path.ends_with("AGENTS.md"))
            .unwrap();
        let body = agents.content.as_deref().unwrap();
        assert!(body.contains(FORGE_SECTION_START));
        assert!(body.contains("`reviewer`"));

        // nothing is written while planning
        assert!(!f.project.path().join("AGENTS.md").exists());
    }

    #[test]
    fn unknown_skill_is_an_error() {
        let f = fixture();
        let ctx = detect_project(&f.vault, f.project.path()).unwrap();
        let err = plan_project_bootstrap(
            &f.vault,
            &ctx,
            &BootstrapOptions {
                skills: vec!["ghost".into()],
                legacy: false,
            },
        )
        .unwrap_err();
        assert!(matches!(err, ForgeError::SkillNotFound(_)));
    }

    #[test]
    fn bootstrap_rejects_skill_names_outside_the_library() {
        let f = fixture();
        let ctx = detect_project(&f.vault, f.project.path()).unwrap();
        for bad in ["../escape", "..", "nested/skill"] {
            let err = plan_project_bootstrap(
                &f.vault,
                &ctx,
                &BootstrapOptions {
                    skills: vec![bad.into()],
                    legacy: false,
                },
            )
            .unwrap_err();
            assert!(matches!(err, ForgeError::InvalidName(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn existing_agents_md_gets_section_appended_then_is_current() {
        let f = fixture();
        let root = f.project.path();
        std::fs::write(root.join("AGENTS.md"), "# My rules\n\nBe nice.\n").unwrap();

        let ctx = detect_project(&f.vault, root).unwrap();
        let plan = plan_project_bootstrap(&f.vault, &ctx, &BootstrapOptions::default()).unwrap();
        let entry = plan
            .entries
            .iter()
            .find(|e| e.path.ends_with("AGENTS.md"))
            .unwrap();
        assert_eq!(entry.action, ProvisionAction::Modify);
        assert!(entry.content.as_deref().unwrap().starts_with("# My rules\n\nBe nice.\n\n<!-- forge:start -->"));

        execute_plan(&plan, |_, _| {}).unwrap();

        let ctx = detect_project(&f.vault, root).unwrap();
        let again = plan_project_bootstrap(&f.vault, &ctx, &BootstrapOptions::default()).unwrap();
        assert!(again.is_empty(), "unexpected entries: {:?}", again.entries);
    }

    #[test]
    fn opencode_json_gains_agents_instruction() {
        let f = fixture();
        let root = f.project.path();
        std::fs::write(
            root.join("opencode.json"),
            r#"{"model": "x", "instructions": ["RULES.md"]}"#,
        )
        .unwrap();
        let ctx = detect_project(&f.vault, root).unwrap();
        let plan = plan_project_bootstrap(&f.vault, &ctx, &BootstrapOptions::default()).unwrap();
        let entry = plan
            .entries
            .iter()
            .find(|e| e.path.ends_with("opencode.json"))
            .unwrap();
        assert_eq!(entry.action, ProvisionAction::Modify);
        let v: Value = serde_json::from_str(entry.content.as_deref().unwrap()).unwrap();
        assert_eq!(v["model"], "x");
        assert_eq!(v["instructions"], json!(["RULES.md", "AGENTS.md"]));
    }

    #[test]
    fn legacy_files_are_planned() {
        let f = fixture();
        let ctx = detect_project(&f.vault, f.project.path()).unwrap();
        let plan = plan_project_bootstrap(
            &f.vault,
            &ctx,
            &BootstrapOptions {
                skills: Vec::new(),
                legacy: true,
            },
        )
        .unwrap();
        for name in ["CLAUDE.md", "gemini.json", ".nebula"] {
            assert!(plan.entries.iter().any(|e| e.path.ends_with(name)), "{name}");
        }
    }

    #[test]
    fn ghost_diff_previews_without_writing() {
        let f = fixture();
        let root = f.project.path();
        std::fs::write(root.join("AGENTS.md"), "# Rules\n").unwrap();
        let ctx = detect_project(&f.vault, root).unwrap();
        let plan = plan_project_bootstrap(&f.vault, &ctx, &BootstrapOptions::default()).unwrap();

        let preview = ghost_diff(&plan).unwrap();
        let agents = preview.iter().find(|d| d.path == "AGENTS.md").unwrap();
        assert!(agents.exists);
        assert_eq!(agents.stats.removed, 0);
        assert!(agents.stats.added > 0);
        assert!(agents.unified.as_deref().unwrap().contains("--- a/AGENTS.md"));

        let config = preview.iter().find(|d| d.path == "opencode.json").unwrap();
        assert!(!config.exists);
        assert!(config.unified.as_deref().unwrap().starts_with("--- /dev/null"));

        assert!(preview
            .iter()
            .filter(|d| d.action == ProvisionAction::Mkdir)
            .all(|d| d.unified.is_none()));
        assert_eq!(std::fs::read_to_string(root.join("AGENTS.md")).unwrap(), "# Rules\n");
    }

    #[test]
    fn execute_bootstrap_writes_everything() {
        let f = fixture();
        add_global_skill(&f.vault, "reviewer");
        let root = f.project.path();
        let ctx = detect_project(&f.vault, root).unwrap();
        let plan = plan_project_bootstrap(
            &f.vault,
            &ctx,
            &BootstrapOptions {
                skills: vec!["reviewer".into()],
                legacy: false,
            },
        )
        .unwrap();

        let mut fractions = Vec::new();
        let report = execute_plan(&plan, |_, frac| fractions.push(frac)).unwrap();
        assert_eq!(report.applied.len(), plan.entries.len());
        assert!(report.skipped.is_empty());
        assert_eq!(fractions.last().copied(), Some(1.0));

        assert!(root.join("AGENTS.md").is_file());
        assert!(root.join(".opencode/agents/orchestrator.md").is_file());
        assert!(root.join(".opencode/skills/reviewer/SKILL.md").is_file());
        let cfg: Value =
            serde_json::from_str(&std::fs::read_to_string(root.join("opencode.json")).unwrap())
                .unwrap();
        assert_eq!(cfg["instructions"], json!(["AGENTS.md"]));
    }

    #[test]
    fn create_never_overwrites() {
        let f = fixture();
        let root = f.project.path();
        let ctx = detect_project(&f.vault, root).unwrap();
        let plan = plan_project_bootstrap(&f.vault, &ctx, &BootstrapOptions::default()).unwrap();

        // a file appears between planning and execution
        std::fs::write(root.join("AGENTS.md"), "mine").unwrap();
        let report = execute_plan(&plan, |_, _| {}).unwrap();
        assert_eq!(report.skipped, vec![root.join("AGENTS.md")]);
        assert_eq!(std::fs::read_to_string(root.join("AGENTS.md")).unwrap(), "mine");
    }

    #[test]
    fn skill_creation_and_copy() {
        let f = fixture();
        let meta = SkillMetadata::new("Api Helper", "api", "Design APIs").unwrap();
        let plan = plan_skill_creation(&f.vault, &meta, None).unwrap();
        assert_eq!(plan.counts().create, 1);
        execute_plan(&plan, |_, _| {}).unwrap();
        assert!(f.vault.skill_exists("api-helper"));
        assert!(matches!(
            plan_skill_creation(&f.vault, &meta, None),
            Err(ForgeError::SkillExists(_))
        ));

        let copy = plan_skill_copy(&f.vault, "api-helper", f.project.path()).unwrap();
        execute_plan(&copy, |_, _| {}).unwrap();
        let copied = f.project.path().join(".opencode/skills/api-helper/SKILL.md");
        assert!(std::fs::read_to_string(copied).unwrap().contains("name: api-helper"));

        assert!(matches!(
            plan_skill_copy(&f.vault, "missing", f.project.path()),
            Err(ForgeError::SkillNotFound(_))
        ));
    }

    #[test]
    fn skill_copy_rejects_traversal() {
        let f = fixture();
        // a SKILL.md one level above the library must stay unreachable
        let outside = f.vault.skills_dir().parent().unwrap().join("outside");
        std::fs::create_dir_all(&outside).unwrap();
        std::fs::write(outside.join("SKILL.md"), "---\nname: outside\n---\n").unwrap();

        for bad in ["../outside", "..", "a/b"] {
            assert!(matches!(
                plan_skill_copy(&f.vault, bad, f.project.path()),
                Err(ForgeError::InvalidName(_))
            ));
        }
        assert!(!f.project.path().join(".opencode/skills/outside").exists());
    }

    #[test]
    fn set_content_overrides_planned_file() {
        let f = fixture();
        let meta = SkillMetadata::new("x", "general", "d").unwrap();
        let mut plan = plan_skill_creation(&f.vault, &meta, Some(f.project.path())).unwrap();
        let file = f.project.path().join("x/SKILL.md");
        assert!(plan.set_content(&file, "custom".into()));
        assert!(!plan.set_content(Path::new("/nope"), "x".into()));
        execute_plan(&plan, |_, _| {}).unwrap();
        assert_eq!(std::fs::read_to_string(file).unwrap(), "custom");
    }
}
