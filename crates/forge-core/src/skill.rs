//! Skill templates: `<skills_dir>/<name>/SKILL.md` with YAML frontmatter.

use crate::error::{ForgeError, Result};
use crate::vault::{list_subdirs, now_iso, DEFAULT_MODEL};
use crate::{io, paths};
use regex::Regex;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const DEFAULT_VERSION: &str = "1.0.0";
pub const DEFAULT_AUTHOR: &str = "nebula-forge";

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SkillMetadata {
    pub name: String,
    pub category: String,
    pub model_preference: String,
    pub description: String,
    pub tags: Vec<String>,
    pub version: String,
    pub author: String,
    pub created_at: String,
}

impl SkillMetadata {
    /// Build metadata with a sanitised name and the usual defaults.
    pub fn new(name: &str, category: &str, description: &str) -> Result<Self> {
        Ok(Self {
            name: paths::sanitize_name(name)?,
            category: category.trim().to_string(),
            model_preference: DEFAULT_MODEL.to_string(),
            description: description.trim().to_string(),
            tags: Vec::new(),
            version: DEFAULT_VERSION.to_string(),
            author: DEFAULT_AUTHOR.to_string(),
            created_at: now_iso(),
        })
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags = tags
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        if !model.trim().is_empty() {
            self.model_preference = model.trim().to_string();
        }
        self
    }

    pub fn tags_line(&self) -> String {
        if self.tags.is_empty() {
            "general".to_string()
        } else {
            self.tags.join(", ")
        }
    }
}

/// Indent every line of a folded YAML scalar.
pub(crate) fn folded(text: &str) -> String {
    text.lines()
        .map(|l| format!("  {l}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `value` as a YAML scalar that reads back as the same string, quoted when
/// plain style would change its meaning (`key: value`, leading `#`, ...).
pub(crate) fn yaml_scalar(value: &str) -> String {
    match serde_yaml::to_string(value) {
        Ok(s) => s.trim_end().to_string(),
        Err(_) => format!("{value:?}"),
    }
}

/// Standard SKILL.md for a freshly created skill.
pub fn render_skill_md(meta: &SkillMetadata) -> String {
    format!(
        "---\n\
name: {name}\n\
category: {category}\n\
version: {version}\n\
author: {author}\n\
model_preference: {model}\n\
thinking_mode: auto\n\
tags: {tags}\n\
description: >\n\
{description}\n\
---\n\
\n\
# Skill: {name}\n\
\n\
## Purpose\n\
{purpose}\n\
\n\
## When to Use This Skill\n\
<!-- Describe the requests or situations that should trigger this skill -->\n\
\n\
## Instructions\n\
<!-- Step-by-step instructions the agent should follow -->\n\
\n\
## Output Format\n\
<!-- Describe the structure of the expected response -->\n\
\n\
## Examples\n\
### Input\n\
```\n\
<!-- Example input -->\n\
```\n\
\n\
### Output\n\
```\n\
<!-- Example output -->\n\
```\n",
        name = meta.name,
        category = yaml_scalar(&meta.category),
        version = yaml_scalar(&meta.version),
        author = yaml_scalar(&meta.author),
        model = yaml_scalar(&meta.model_preference),
        tags = yaml_scalar(&meta.tags_line()),
        description = folded(&meta.description),
        purpose = meta.description,
    )
}

// ---------------------------------------------------------------------------
// Frontmatter parsing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Frontmatter {
    pub name: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub model_preference: Option<String>,
    pub version: Option<String>,
    pub author: Option<String>,
    pub thinking_mode: Option<String>,
    pub tags: Vec<String>,
}

static FRONTMATTER_RE: OnceLock<Regex> = OnceLock::new();

fn frontmatter_re() -> &'static Regex {
    FRONTMATTER_RE
        .get_or_init(|| Regex::new(r"^---[ \t]*\r?\n([\s\S]*?)\r?\n---[ \t]*(?:\r?\n([\s\S]*))?$").unwrap())
}

/// Split `content` into parsed frontmatter and the markdown body.
///
/// Scalars are read leniently (`version: 1.0` is accepted as "1.0"). `tags`
/// may be a YAML list or a comma-separated string.
pub fn parse_frontmatter(content: &str) -> Result<(Frontmatter, String)> {
    let caps = frontmatter_re()
        .captures(content)
        .ok_or_else(|| ForgeError::Frontmatter("missing YAML frontmatter".to_string()))?;
    let yaml = caps.get(1).map(|m| m.as_str()).unwrap_or("");
    let body = caps.get(2).map(|m| m.as_str()).unwrap_or("").to_string();

    let map: Mapping = if yaml.trim().is_empty() {
        Mapping::new()
    } else {
        match serde_yaml::from_str::<Value>(yaml).map_err(|e| ForgeError::Frontmatter(e.to_string()))? {
            Value::Mapping(m) => m,
            Value::Null => Mapping::new(),
            _ => return Err(ForgeError::Frontmatter("not a mapping".to_string())),
        }
    };

    let field = |key: &str| map.get(key).and_then(scalar_string);
    let tags = match map.get("tags") {
        Some(Value::Sequence(items)) => items.iter().filter_map(scalar_string).collect(),
        Some(other) => scalar_string(other)
            .map(|s| split_tags(&s))
            .unwrap_or_default(),
        None => Vec::new(),
    };

    Ok((
        Frontmatter {
            name: field("name"),
            category: field("category"),
            description: field("description"),
            model_preference: field("model_preference"),
            version: field("version"),
            author: field("author"),
            thinking_mode: field("thinking_mode"),
            tags,
        },
        body,
    ))
}

fn scalar_string(v: &Value) -> Option<String> {
    let s = match v {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

pub fn split_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

/// Text under the first `## ` heading that starts with `heading`, up to the
/// next `## ` heading.
pub fn section<'a>(body: &'a str, heading: &str) -> &'a str {
    let mut start = None;
    let mut offset = 0;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if let Some(title) = trimmed.strip_prefix("## ") {
            if let Some(s) = start {
                return body[s..offset].trim();
            }
            if title.trim().starts_with(heading) {
                start = Some(offset + line.len());
            }
        }
        offset += line.len();
    }
    match start {
        Some(s) => body[s..].trim(),
        None => "",
    }
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct SkillSummary {
    pub name: String,
    pub dir: PathBuf,
    pub category: String,
    pub description: String,
    pub model_preference: Option<String>,
    pub version: Option<String>,
    pub tags: Vec<String>,
}

impl SkillSummary {
    pub fn load(dir: &Path) -> Result<Self> {
        let file = paths::skill_file(dir);
        let content = io::read_optional(&file)?
            .ok_or_else(|| ForgeError::SkillNotFound(dir.display().to_string()))?;
        let (fm, _) = parse_frontmatter(&content).map_err(|e| ForgeError::InvalidSkill {
            path: file.display().to_string(),
            reason: e.to_string(),
        })?;
        let dir_name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            name: fm.name.unwrap_or(dir_name),
            dir: dir.to_path_buf(),
            category: fm.category.unwrap_or_else(|| "general".to_string()),
            description: fm.description.unwrap_or_default(),
            model_preference: fm.model_preference,
            version: fm.version,
            tags: fm.tags,
        })
    }
}

/// Skills under `root`, sorted by directory name. Directories without a
/// readable SKILL.md are skipped with a warning.
pub fn list_skills(root: &Path) -> Result<Vec<SkillSummary>> {
    let mut out = Vec::new();
    for dir in list_subdirs(root)? {
        match SkillSummary::load(&dir) {
            Ok(s) => out.push(s),
            Err(e) => tracing::warn!(dir = %dir.display(), "skipping skill: {e}"),
        }
    }
    Ok(out)
}

fn checked_dir(root: &Path, name: &str) -> Result<PathBuf> {
    let dir = root.join(paths::check_component(name)?);
    if !dir.is_dir() {
        return Err(ForgeError::SkillNotFound(name.to_string()));
    }
    Ok(dir)
}

/// Raw SKILL.md contents of `<root>/<name>`.
pub fn read_skill(root: &Path, name: &str) -> Result<String> {
    let dir = checked_dir(root, name)?;
    io::read_optional(&paths::skill_file(&dir))?
        .ok_or_else(|| ForgeError::SkillNotFound(name.to_string()))
}

/// Remove `<root>/<name>` and everything in it.
pub fn delete_skill(root: &Path, name: &str) -> Result<PathBuf> {
    let dir = checked_dir(root, name)?;
    std::fs::remove_dir_all(&dir)?;
    tracing::info!(path = %dir.display(), "deleted skill");
    Ok(dir)
}
