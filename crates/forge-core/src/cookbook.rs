//! Curated example skills that can be installed as-is.

use crate::error::{ForgeError, Result};
use crate::skill::{SkillMetadata, DEFAULT_AUTHOR, DEFAULT_VERSION};
use crate::vault::now_iso;
use crate::{io, paths};
use serde::Serialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize)]
pub struct CookbookEntry {
    pub id: &'static str,
    pub name: &'static str,
    pub title: &'static str,
    pub category: &'static str,
    pub model_preference: &'static str,
    pub description: &'static str,
    pub tags: &'static [&'static str],
    #[serde(skip)]
    pub markdown: &'static str,
}

pub const ENTRIES: &[CookbookEntry] = &[
    CookbookEntry {
        id: "git-workflow",
        name: "git-workflow",
        title: "Git Workflow",
        category: "workflow",
        model_preference: "copilot/claude-sonnet-4-5",
        description: "Use for commit messages, PR descriptions, conflict resolution, rebases, and branch strategy.",
        tags: &["git", "commits", "pr", "workflow", "branching"],
        markdown: include_str!("../assets/cookbook/git-workflow.md"),
    },
    CookbookEntry {
        id: "prompt-engineer",
        name: "prompt-engineer",
        title: "Prompt Engineer",
        category: "ai",
        model_preference: "copilot/claude-opus-4-6",
        description: "Use when users want to improve, debug, or structure prompts for AI models.",
        tags: &["prompting", "ai", "llm", "system-prompts", "few-shot"],
        markdown: include_str!("../assets/cookbook/prompt-engineer.md"),
    },
    CookbookEntry {
        id: "test-guardian",
        name: "test-guardian",
        title: "Test Guardian",
        category: "testing",
        model_preference: "copilot/gpt-5.1-codex-max",
        description: "Use for writing robust tests, identifying coverage gaps, and designing failure-oriented test plans.",
        tags: &["testing", "unit-tests", "integration", "qa", "reliability"],
        markdown: include_str!("../assets/cookbook/test-guardian.md"),
    },
];

impl CookbookEntry {
    pub fn to_metadata(&self) -> SkillMetadata {
        SkillMetadata {
            name: self.name.to_string(),
            category: self.category.to_string(),
            model_preference: self.model_preference.to_string(),
            description: self.description.to_string(),
            tags: self.tags.iter().map(|t| t.to_string()).collect(),
            version: DEFAULT_VERSION.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            created_at: now_iso(),
        }
    }

    fn haystack(&self) -> String {
        let tags = self.tags.join(",");
        let parts: [&str; 6] = [
            self.id,
            self.name,
            self.title,
            self.category,
            self.description,
            tags.as_str(),
        ];
        parts.join(" ").to_lowercase()
    }

    /// Write the entry's SKILL.md into `<target_root>/<name>/`.
    pub fn install(&self, target_root: &Path) -> Result<PathBuf> {
        let dir = target_root.join(self.name);
        if dir.exists() {
            return Err(ForgeError::SkillExists(dir.display().to_string()));
        }
        let file = paths::skill_file(&dir);
        io::atomic_write(&file, self.markdown.as_bytes())?;
        tracing::info!(path = %file.display(), "installed cookbook skill");
        Ok(dir)
    }
}

/// Case-insensitive substring search; a blank query returns every entry.
pub fn search_cookbook(query: &str) -> Vec<&'static CookbookEntry> {
    let q = query.trim().to_lowercase();
    ENTRIES
        .iter()
        .filter(|e| q.is_empty() || e.haystack().contains(&q))
        .collect()
}

pub fn find(id: &str) -> Result<&'static CookbookEntry> {
    ENTRIES
        .iter()
        .find(|e| e.id == id)
        .ok_or_else(|| ForgeError::CookbookNotFound(id.to_string()))
}
