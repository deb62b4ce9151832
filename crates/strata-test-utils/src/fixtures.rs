// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge trees and memory content used across integration tests.

use std::fs;
use std::io;
use std::path::Path;

use chrono::NaiveDate;

use crate::days_ago;

/// `# {title}` followed by `n` dated sections, oldest first.
pub fn numbered_sections(title: &str, prefix: &str, n: usize) -> String {
    let mut out = format!("# {title}\n\n");
    for i in 1..=n {
        out.push_str(&section(prefix, i));
    }
    out
}

/// One `## {prefix} {i}` section, as appended by callers.
pub fn section(prefix: &str, i: usize) -> String {
    format!("## {prefix} {i}\nNotes for {prefix} {i}.\n\n")
}

/// An issue section with a status line.
pub fn issue(title: &str, status: &str, date: Option<NaiveDate>) -> String {
    match date {
        Some(date) => format!("## {title}\n**Status**: {status} ({date})\nDetails of {title}.\n\n"),
        None => format!("## {title}\n**Status**: {status}\nDetails of {title}.\n\n"),
    }
}

/// The issue list from the lifecycle examples: one stale resolution, one
/// recent resolution, one long-running investigation.
pub fn known_issues() -> String {
    let mut out = String::from("# Known issues\n\n");
    out.push_str(&issue("Flaky login test", "Resolved", Some(days_ago(36))));
    out.push_str(&issue("Cache warmup race", "Resolved", Some(days_ago(10))));
    out.push_str(&issue("Slow CI runners", "In Progress", Some(days_ago(730))));
    out
}

/// Body returned by the mock remote for `azure/functions`.
pub const REMOTE_FUNCTIONS_BODY: &str = "# Azure Functions (live)\n\n## Triggers\nFetched from the live docs.\n";

/// Write a small knowledge tree under `root`:
///
/// - `loading_protocol.md`
/// - `python/`: index with cross-domain rules, a detection file, an
///   always-load style guide, a conditional Django guide described only by
///   its footer, and a testing guide with no metadata at all
/// - `security/`: index and an `auth` reference with two sections
/// - `azure/`: index and a local `functions` page used by routing tests
pub fn write_knowledge_tree(root: &Path) -> io::Result<()> {
    let fresh = days_ago(10);
    let aging = days_ago(45);
    let files: Vec<(&str, String)> = vec![
        (
            "loading_protocol.md",
            "# Loading protocol\n\n1. Read the catalog.\n2. Load always files.\n3. Detect, then load conditionally.\n".to_string(),
        ),
        (
            "python/index.md",
            format!(
                "---\ntitle: Python\ntype: index\ndomain: python\nlastUpdated: {fresh}\ncrossDomain:\n  - trigger: authentication\n    target: security/auth\n  - trigger: testing\n    target: python/testing\n  - trigger: secrets\n    target: security/vault\n---\n# Python\n\nEntry point for Python knowledge.\n"
            ),
        ),
        (
            "python/detection.md",
            "---\ntitle: Python project detection\ntype: detection\ndomain: python\nprojectTypes:\n  - name: django\n    indicators: [manage.py, django]\n  - name: fastapi\n    indicators: [fastapi, uvicorn]\n---\n# Detection\n\nIndicators per project type.\n".to_string(),
        ),
        (
            "python/style.md",
            format!(
                "---\ntitle: Python style\ndomain: python\nloadingStrategy: always\nlastUpdated: {fresh}\ntags: [style, lint]\n---\n# Python style\n\n## Formatting\nUse black.\n\n## Naming\nsnake_case for functions.\n"
            ),
        ),
        (
            "python/django.md",
            format!(
                "---\ndomain: python\nappliesTo: [Django]\n---\n# Django guide\n\n## Models\nKeep models thin.\n\n## Views\nPrefer class-based views.\n\n---\n**Version**: 2.1\n**Last Updated**: {aging}\n"
            ),
        ),
        (
            "python/testing.md",
            "# Testing with pytest\n\nUse fixtures for setup.\n".to_string(),
        ),
        (
            "security/index.md",
            format!("---\ntitle: Security\ntype: index\ndomain: security\nlastUpdated: {fresh}\n---\n# Security\n"),
        ),
        (
            "security/auth.md",
            format!(
                "---\ntitle: Authentication\ndomain: security\nlastUpdated: {aging}\n---\n# Authentication\n\n## Passwords\nHash with argon2.\n\n## Tokens\nRotate signing keys.\n"
            ),
        ),
        (
            "azure/index.md",
            "---\ntitle: Azure\ntype: index\ndomain: azure\n---\n# Azure\n".to_string(),
        ),
        (
            "azure/functions.md",
            format!(
                "---\ntitle: Azure Functions\ndomain: azure\nlastUpdated: {fresh}\n---\n# Azure Functions (curated)\n\n## Triggers\nHTTP and timer triggers.\n"
            ),
        ),
    ];
    for (rel, text) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
    }
    Ok(())
}

/// A temporary directory holding [`write_knowledge_tree`] under `context/`
/// and an empty `memory/` directory.
pub fn knowledge_workspace() -> io::Result<tempfile::TempDir> {
    let dir = tempfile::tempdir()?;
    write_knowledge_tree(&dir.path().join("context"))?;
    fs::create_dir_all(dir.path().join("memory"))?;
    Ok(dir)
}
