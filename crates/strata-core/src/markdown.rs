// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Markdown parsing shared by every backend and the pruning engine.
//!
//! Knowledge metadata is read in two passes: YAML front matter first, then a
//! regex scan of the trailing footer for whatever the front matter left unset.
//! Section splitting works on `## ` headings and is lossless: joining the
//! sections back together reproduces the input byte for byte.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

use crate::knowledge::{
    CrossDomainRule, KnowledgeKind, KnowledgeReference, LoadingStrategy, ProjectTypeRule,
};
use crate::staleness::parse_date;

/// Number of trailing lines scanned for footer metadata.
const FOOTER_WINDOW: usize = 12;

static FOOTER_VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*\*Version\*\*:\s*(\S.*?)\s*$").expect("footer version regex is valid")
});

static FOOTER_UPDATED_BOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*\*Last Updated\*\*:\s*(\d{4}-\d{2}-\d{2})")
        .expect("footer date regex is valid")
});

static FOOTER_UPDATED_ITALIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\*Last Updated:\s*(\d{4}-\d{2}-\d{2})\*").expect("footer date regex is valid")
});

/// Front matter fields as written in knowledge files.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct FrontMatter {
    title: Option<String>,
    #[serde(alias = "type")]
    kind: Option<String>,
    domain: Option<String>,
    estimated_tokens: Option<u32>,
    loading_strategy: Option<String>,
    version: Option<serde_yaml::Value>,
    last_updated: Option<String>,
    tags: Vec<String>,
    sections: Vec<String>,
    applies_to: Vec<String>,
    project_types: Vec<ProjectTypeRule>,
    cross_domain: Vec<CrossDomainRule>,
}

/// Metadata recovered from the trailing footer block.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Footer {
    pub version: Option<String>,
    pub last_updated: Option<NaiveDate>,
}

/// A parsed knowledge file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedDocument {
    pub reference: KnowledgeReference,
    /// Domain named in the front matter, if any. Integrity checks compare it
    /// against the directory the file lives in.
    pub declared_domain: Option<String>,
    pub cross_domain: Vec<CrossDomainRule>,
}

/// Split a document into its raw front matter and its body.
///
/// Front matter must open on the first line with `---` and close with a
/// line containing only `---`. Anything else is treated as body.
pub fn split_front_matter(text: &str) -> (Option<&str>, &str) {
    let rest = match text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    {
        Some(rest) => rest,
        None => return (None, text),
    };
    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end() == "---" {
            let yaml = &rest[..offset];
            let body = &rest[offset + line.len()..];
            return (Some(yaml), body);
        }
        offset += line.len();
    }
    (None, text)
}

/// The body of a knowledge file, without front matter.
pub fn body(text: &str) -> &str {
    split_front_matter(text).1
}

/// Scan the tail of `body` for footer metadata.
pub fn parse_footer(body: &str) -> Footer {
    let lines: Vec<&str> = body.lines().collect();
    let start = lines.len().saturating_sub(FOOTER_WINDOW);
    let mut footer = Footer::default();
    for line in &lines[start..] {
        let line = line.trim();
        if let Some(caps) = FOOTER_VERSION.captures(line) {
            footer.version = Some(caps[1].to_string());
        } else if let Some(caps) = FOOTER_UPDATED_BOLD
            .captures(line)
            .or_else(|| FOOTER_UPDATED_ITALIC.captures(line))
        {
            footer.last_updated = parse_date(&caps[1]).or(footer.last_updated);
        }
    }
    footer
}

/// Parse a knowledge file living at `{domain}/{file}.md`.
///
/// Malformed YAML is logged and ignored; the footer and body still supply
/// whatever metadata they can.
pub fn parse_document(domain: &str, file: &str, text: &str) -> ParsedDocument {
    let (yaml, body) = split_front_matter(text);
    let front = match yaml {
        Some(yaml) if !yaml.trim().is_empty() => {
            match serde_yaml::from_str::<FrontMatter>(yaml) {
                Ok(front) => front,
                Err(e) => {
                    warn!(domain, file, error = %e, "ignoring malformed front matter");
                    FrontMatter::default()
                }
            }
        }
        _ => FrontMatter::default(),
    };
    let footer = parse_footer(body);

    let kind = front
        .kind
        .as_deref()
        .and_then(|k| k.parse::<KnowledgeKind>().ok())
        .unwrap_or(if file == "index" {
            KnowledgeKind::Index
        } else {
            KnowledgeKind::Reference
        });
    let loading_strategy = front
        .loading_strategy
        .as_deref()
        .and_then(|s| s.parse::<LoadingStrategy>().ok())
        .unwrap_or_default();
    let version = front.version.and_then(yaml_scalar).or(footer.version);
    let last_updated = front
        .last_updated
        .as_deref()
        .and_then(parse_date)
        .or(footer.last_updated);
    let sections = if front.sections.is_empty() {
        section_headings(body)
    } else {
        front.sections
    };

    let reference = KnowledgeReference {
        id: KnowledgeReference::make_id(domain, file),
        domain: domain.to_string(),
        file: file.to_string(),
        title: front
            .title
            .or_else(|| first_title(body))
            .unwrap_or_else(|| file.to_string()),
        kind,
        estimated_tokens: front
            .estimated_tokens
            .unwrap_or_else(|| estimate_tokens(body)),
        loading_strategy,
        version,
        last_updated,
        tags: front.tags.into_iter().collect(),
        sections,
        applies_to: front
            .applies_to
            .into_iter()
            .map(|t| t.to_lowercase())
            .collect::<BTreeSet<_>>(),
        project_types: front.project_types,
    };

    ParsedDocument {
        reference,
        declared_domain: front.domain,
        cross_domain: front.cross_domain,
    }
}

fn yaml_scalar(value: serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Rough token estimate: one token per four characters, rounded up.
pub fn estimate_tokens(text: &str) -> u32 {
    let chars = text.chars().count();
    u32::try_from(chars.div_ceil(4)).unwrap_or(u32::MAX)
}

fn first_title(body: &str) -> Option<String> {
    body.lines()
        .find_map(|l| l.strip_prefix("# "))
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// A `## ` section of a markdown body. The preamble before the first heading
/// has no heading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub heading: Option<String>,
    /// Full text including the heading line and trailing newline.
    pub text: String,
}

impl Section {
    pub fn is_preamble(&self) -> bool {
        self.heading.is_none()
    }
}

/// Heading title if `line` opens a level-two section.
pub fn heading_of(line: &str) -> Option<&str> {
    line.strip_prefix("## ")
        .map(|h| h.trim())
        .filter(|h| !h.is_empty())
}

/// Split a body into sections. Headings inside fenced code blocks are ignored.
pub fn split_sections(body: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current = Section {
        heading: None,
        text: String::new(),
    };
    let mut in_fence = false;
    for line in body.split_inclusive('\n') {
        let trimmed = line.trim_end();
        if trimmed.trim_start().starts_with("```") {
            in_fence = !in_fence;
        }
        let heading = if in_fence { None } else { heading_of(trimmed) };
        if let Some(heading) = heading {
            if current.heading.is_some() || !current.text.is_empty() {
                sections.push(current);
            }
            current = Section {
                heading: Some(heading.to_string()),
                text: String::new(),
            };
        }
        current.text.push_str(line);
    }
    if current.heading.is_some() || !current.text.is_empty() {
        sections.push(current);
    }
    sections
}

/// Concatenate sections back into a body.
pub fn join_sections<'a>(sections: impl IntoIterator<Item = &'a Section>) -> String {
    sections.into_iter().map(|s| s.text.as_str()).collect()
}

/// Headings of every `## ` section, in document order.
pub fn section_headings(body: &str) -> Vec<String> {
    split_sections(body)
        .into_iter()
        .filter_map(|s| s.heading)
        .collect()
}

/// Text of the named sections, in document order. Matching is case-insensitive.
pub fn extract_sections(body: &str, names: &[String]) -> String {
    let wanted: Vec<String> = names.iter().map(|n| n.trim().to_lowercase()).collect();
    let picked: Vec<Section> = split_sections(body)
        .into_iter()
        .filter(|s| {
            s.heading
                .as_deref()
                .is_some_and(|h| wanted.contains(&h.to_lowercase()))
        })
        .collect();
    join_sections(&picked)
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "---\ntitle: Django Patterns\ntype: reference\nestimatedTokens: 900\nloadingStrategy: onDemand\nversion: 1.2\nlastUpdated: 2026-01-10\ntags: [django, orm]\nappliesTo: [Django]\n---\n# Django\n\nIntro.\n\n## Models\nUse managers.\n\n## Views\nKeep them thin.\n\n---\n**Version**: 0.9\n**Last Updated**: 2025-01-01\n";

    #[test]
    fn front_matter_wins_over_footer() {
        let parsed = parse_document("python", "django", DOC);
        let r = parsed.reference;
        assert_eq!(r.id, "python/django");
        assert_eq!(r.title, "Django Patterns");
        assert_eq!(r.estimated_tokens, 900);
        assert_eq!(r.version.as_deref(), Some("1.2"));
        assert_eq!(r.last_updated, NaiveDate::from_ymd_opt(2026, 1, 10));
        assert_eq!(r.sections, vec!["Models".to_string(), "Views".to_string()]);
        assert!(r.applies_to.contains("django"));
        assert!(r.tags.contains("orm"));
    }

    #[test]
    fn footer_fills_missing_fields() {
        let text = "# Flask\n\n## Routing\nBlueprints.\n\n*Last Updated: 2025-11-02*\n**Version**: 2.0\n";
        let r = parse_document("python", "flask", text).reference;
        assert_eq!(r.title, "Flask");
        assert_eq!(r.version.as_deref(), Some("2.0"));
        assert_eq!(r.last_updated, NaiveDate::from_ymd_opt(2025, 11, 2));
        assert_eq!(r.kind, KnowledgeKind::Reference);
        assert_eq!(r.estimated_tokens, estimate_tokens(text));
    }

    #[test]
    fn malformed_yaml_falls_back() {
        let text = "---\ntitle: [unclosed\n---\n# Fallback\n";
        let r = parse_document("misc", "notes", text).reference;
        assert_eq!(r.title, "Fallback");
    }

    #[test]
    fn index_file_defaults_to_index_kind() {
        let r = parse_document("python", "index", "# Python\n").reference;
        assert_eq!(r.kind, KnowledgeKind::Index);
    }

    #[test]
    fn body_strips_front_matter() {
        assert!(body(DOC).starts_with("# Django\n"));
        assert_eq!(body("no front matter"), "no front matter");
        assert_eq!(body("---\nunterminated"), "---\nunterminated");
    }

    #[test]
    fn sections_roundtrip_losslessly() {
        let text = body(DOC);
        let sections = split_sections(text);
        assert_eq!(sections.len(), 3);
        assert!(sections[0].is_preamble());
        assert_eq!(join_sections(&sections), text);
    }

    #[test]
    fn headings_in_code_fences_are_ignored() {
        let text = "## Real\n```md\n## Not a heading\n```\n## Second\n";
        assert_eq!(section_headings(text), vec!["Real", "Second"]);
    }

    #[test]
    fn extract_sections_is_case_insensitive() {
        let text = body(DOC);
        let out = extract_sections(text, &["views".to_string()]);
        assert_eq!(out, "## Views\nKeep them thin.\n\n---\n**Version**: 0.9\n**Last Updated**: 2025-01-01\n");
        assert_eq!(extract_sections(text, &["missing".to_string()]), "");
    }

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens(""), 0);
        assert_eq!(estimate_tokens("abc"), 1);
        assert_eq!(estimate_tokens("abcde"), 2);
    }
}
