//! Heuristic quality scoring for skill prompts, plus the composer that
//! renders a full SKILL.md from individual fields.

use crate::error::Result;
use crate::skill::{self, folded, yaml_scalar};
use crate::vault::DEFAULT_MODEL;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CriterionKey {
    HasName,
    HasDescription,
    HasInstructions,
    HasExamples,
    HasAntipatterns,
    HasOutputFormat,
    HasTags,
    HasModel,
    Substantial,
}

impl CriterionKey {
    pub fn as_str(self) -> &'static str {
        match self {
            CriterionKey::HasName => "has_name",
            CriterionKey::HasDescription => "has_description",
            CriterionKey::HasInstructions => "has_instructions",
            CriterionKey::HasExamples => "has_examples",
            CriterionKey::HasAntipatterns => "has_antipatterns",
            CriterionKey::HasOutputFormat => "has_output_format",
            CriterionKey::HasTags => "has_tags",
            CriterionKey::HasModel => "has_model",
            CriterionKey::Substantial => "substantial",
        }
    }
}

impl std::fmt::Display for CriterionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

struct Criterion {
    key: CriterionKey,
    suggestion: &'static str,
    points: u32,
}

const CRITERIA: &[Criterion] = &[
    Criterion { key: CriterionKey::HasName, suggestion: "Add a skill name", points: 10 },
    Criterion { key: CriterionKey::HasDescription, suggestion: "Add a clear description", points: 15 },
    Criterion { key: CriterionKey::HasInstructions, suggestion: "Add detailed instructions", points: 20 },
    Criterion { key: CriterionKey::HasExamples, suggestion: "Add input/output examples", points: 15 },
    Criterion { key: CriterionKey::HasAntipatterns, suggestion: "Add anti-patterns or constraints", points: 10 },
    Criterion { key: CriterionKey::HasOutputFormat, suggestion: "Specify output format", points: 10 },
    Criterion { key: CriterionKey::HasTags, suggestion: "Add tags", points: 5 },
    Criterion { key: CriterionKey::HasModel, suggestion: "Set model preference", points: 5 },
    Criterion { key: CriterionKey::Substantial, suggestion: "Expand instructions to >200 words", points: 10 },
];

#[derive(Debug, Clone, Serialize)]
pub struct CriterionResult {
    pub key: CriterionKey,
    pub passed: bool,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityScore {
    pub total: u32,
    pub criteria: Vec<CriterionResult>,
    pub suggestions: Vec<String>,
}

impl QualityScore {
    pub fn passed(&self, key: CriterionKey) -> bool {
        self.criteria.iter().any(|c| c.key == key && c.passed)
    }
}

/// Fields scored by [`score_skill`]. `tags` is the comma-joined tag line.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreInput<'a> {
    pub name: &'a str,
    pub description: &'a str,
    pub tags: &'a str,
    pub model_preference: &'a str,
    pub trigger: &'a str,
    pub instructions: &'a str,
    pub output_format: &'a str,
}

static EXAMPLES_RE: OnceLock<Regex> = OnceLock::new();
static ANTIPATTERNS_RE: OnceLock<Regex> = OnceLock::new();

fn examples_re() -> &'static Regex {
    EXAMPLES_RE.get_or_init(|| Regex::new(r"(?i)example|input|output").unwrap())
}

fn antipatterns_re() -> &'static Regex {
    ANTIPATTERNS_RE
        .get_or_init(|| Regex::new(r"(?i)anti-pattern|do not|never|avoid|constraint").unwrap())
}

pub fn score_skill(input: &ScoreInput<'_>) -> QualityScore {
    let body = [input.trigger, input.instructions, input.output_format].join("\n");
    let filled = |s: &str| !s.trim().is_empty();

    let check = |key: CriterionKey| -> bool {
        match key {
            CriterionKey::HasName => filled(input.name),
            CriterionKey::HasDescription => filled(input.description),
            CriterionKey::HasInstructions => input.instructions.trim().chars().count() > 60,
            CriterionKey::HasExamples => examples_re().is_match(&body),
            CriterionKey::HasAntipatterns => antipatterns_re().is_match(&body),
            CriterionKey::HasOutputFormat => filled(input.output_format),
            CriterionKey::HasTags => filled(input.tags),
            CriterionKey::HasModel => filled(input.model_preference),
            CriterionKey::Substantial => input.instructions.split_whitespace().count() > 200,
        }
    };

    let criteria: Vec<CriterionResult> = CRITERIA
        .iter()
        .map(|c| CriterionResult {
            key: c.key,
            passed: check(c.key),
            points: c.points,
        })
        .collect();
    let total = criteria.iter().filter(|c| c.passed).map(|c| c.points).sum();
    let suggestions = CRITERIA
        .iter()
        .zip(&criteria)
        .filter(|(_, r)| !r.passed)
        .map(|(c, _)| c.suggestion.to_string())
        .collect();

    QualityScore { total, criteria, suggestions }
}

/// Score an existing SKILL.md using its frontmatter and the "When to Use",
/// "Instructions" and "Output Format" sections.
pub fn score_skill_md(content: &str) -> Result<QualityScore> {
    let (fm, body) = skill::parse_frontmatter(content)?;
    let tags = fm.tags.join(", ");
    Ok(score_skill(&ScoreInput {
        name: fm.name.as_deref().unwrap_or(""),
        description: fm.description.as_deref().unwrap_or(""),
        tags: &tags,
        model_preference: fm.model_preference.as_deref().unwrap_or(""),
        trigger: skill::section(&body, "When to Use"),
        instructions: skill::section(&body, "Instructions"),
        output_format: skill::section(&body, "Output Format"),
    }))
}

// ---------------------------------------------------------------------------
// Composer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ComposerInput {
    pub name: String,
    pub category: String,
    pub model: String,
    pub description: String,
    pub tags: Vec<String>,
    pub trigger: String,
    pub instructions: String,
    pub output_format: String,
}

fn or_default<'a>(value: &'a str, default: &'a str) -> &'a str {
    let v = value.trim();
    if v.is_empty() {
        default
    } else {
        v
    }
}

impl ComposerInput {
    fn tags_line(&self) -> String {
        let tags: Vec<&str> = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if tags.is_empty() {
            "general".to_string()
        } else {
            tags.join(", ")
        }
    }
}

pub fn compose_skill_md(input: &ComposerInput) -> String {
    let name = or_default(&input.name, "new-skill");
    let description = or_default(&input.description, "No description");
    let lines = [
        "---".to_string(),
        format!("name: {name}"),
        format!("category: {}", yaml_scalar(or_default(&input.category, "general"))),
        format!("version: {}", skill::DEFAULT_VERSION),
        format!("author: {}", skill::DEFAULT_AUTHOR),
        format!("model_preference: {}", yaml_scalar(or_default(&input.model, DEFAULT_MODEL))),
        "thinking_mode: auto".to_string(),
        format!("tags: {}", yaml_scalar(&input.tags_line())),
        "description: >".to_string(),
        folded(description),
        "---".to_string(),
        String::new(),
        format!("# Skill: {name}"),
        String::new(),
        "## Purpose".to_string(),
        description.to_string(),
        String::new(),
        "## When to Use This Skill".to_string(),
        input.trigger.trim().to_string(),
        String::new(),
        "## Instructions".to_string(),
        input.instructions.trim().to_string(),
        String::new(),
        "## Output Format".to_string(),
        input.output_format.trim().to_string(),
        String::new(),
        "## Examples".to_string(),
        "### Input".to_string(),
        "```".to_string(),
        "<!-- Example input -->".to_string(),
        "```".to_string(),
        String::new(),
        "### Output".to_string(),
        "```".to_string(),
        "<!-- Example output -->".to_string(),
        "```".to_string(),
    ];
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

pub fn score_composer(input: &ComposerInput) -> QualityScore {
    let tags = input.tags_line();
    score_skill(&ScoreInput {
        name: or_default(&input.name, "new-skill"),
        description: or_default(&input.description, "No description"),
        tags: &tags,
        model_preference: or_default(&input.model, DEFAULT_MODEL),
        trigger: &input.trigger,
        instructions: &input.instructions,
        output_format: &input.output_format,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scores_filled_skill() {
        let score = score_skill(&ScoreInput {
            name: "code-reviewer",
            description: "Review code quality and safety",
            tags: "review,security",
            model_preference: "copilot/claude-opus-4-6",
            trigger: "Use when user asks for code review.",
            instructions: "Analyze diff and return prioritized issues with rationale.",
            output_format: "Summary, Findings, Risks",
        });
        assert!(score.total > 0);
        assert!(score.passed(CriterionKey::HasName));
        assert!(score.passed(CriterionKey::HasModel));
        assert!(score.passed(CriterionKey::HasOutputFormat));
        // 58 chars, not over the threshold
        assert!(!score.passed(CriterionKey::HasInstructions));
    }

    #[test]
    fn empty_skill_suggests_everything_missing() {
        let score = score_skill(&ScoreInput {
            instructions: "short",
            ..Default::default()
        });
        assert!(score.total < 30);
        assert_eq!(score.total, 0);
        assert_eq!(score.suggestions.len(), 9);
        assert_eq!(score.suggestions[0], "Add a skill name");
        assert_eq!(score.suggestions[1], "Add a clear description");
    }

    #[test]
    fn full_marks() {
        let long = "step ".repeat(201);
        let instructions = format!("Never skip tests. {long}");
        let score = score_skill(&ScoreInput {
            name: "x",
            description: "d",
            tags: "t",
            model_preference: "m",
            trigger: "for example when asked",
            instructions: &instructions,
            output_format: "markdown",
        });
        assert_eq!(score.total, 100);
        assert!(score.suggestions.is_empty());
    }

    #[test]
    fn composer_renders_and_scores() {
        let input = ComposerInput {
            name: "api-helper".into(),
            description: "Design HTTP APIs".into(),
            tags: vec!["api".into(), " ".into()],
            trigger: "When designing endpoints".into(),
            instructions: "Avoid breaking changes. Version every endpoint and document errors.".into(),
            output_format: "OpenAPI snippet".into(),
            ..Default::default()
        };
        let md = compose_skill_md(&input);
        assert!(md.starts_with("---\nname: api-helper\ncategory: general\n"));
        assert!(md.contains("tags: api\n"));
        assert!(md.contains("## When to Use This Skill\nWhen designing endpoints\n"));

        let score = score_composer(&input);
        assert!(score.passed(CriterionKey::HasAntipatterns));
        assert!(score.passed(CriterionKey::HasInstructions));

        let reparsed = score_skill_md(&md).unwrap();
        assert_eq!(reparsed.total, score.total);
    }

    #[test]
    fn composer_quotes_yaml_sensitive_category() {
        let input = ComposerInput {
            name: "triage".into(),
            category: "ops: on-call".into(),
            tags: vec!["#pager".into()],
            ..Default::default()
        };
        let md = compose_skill_md(&input);
        let (fm, _) = skill::parse_frontmatter(&md).unwrap();
        assert_eq!(fm.category.as_deref(), Some("ops: on-call"));
        assert_eq!(fm.tags, vec!["#pager"]);
        assert!(score_skill_md(&md).unwrap().passed(CriterionKey::HasTags));
    }

    #[test]
    fn criterion_keys_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&CriterionKey::HasOutputFormat).unwrap(),
            "\"has_output_format\""
        );
        assert_eq!(format!("{:<8}|", CriterionKey::HasTags), "has_tags|");
    }
}
