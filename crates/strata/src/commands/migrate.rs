// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strata migrate`: copy memory into another backend, load the knowledge
//! tree into it, and prove both sides now answer identically.

use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::Path;

use strata_core::{
    BackendAdapter, BackendKind, ContextProvider, EntryStore, MemoryFilter, StrataError,
};
use strata_memory::MigrationReport;
use tracing::{info, warn};

use crate::backend::Backend;

/// Outcome of one backend migration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationSummary {
    pub from: BackendKind,
    pub to: BackendKind,
    pub memory: MigrationReport,
    /// Knowledge documents imported into the target.
    pub knowledge_files: usize,
    /// Every difference found after the copy. Empty means the target is a
    /// faithful replacement.
    pub mismatches: Vec<String>,
}

impl MigrationSummary {
    pub fn is_faithful(&self) -> bool {
        self.mismatches.is_empty()
    }
}

/// Copy `source` into `target` and verify the result.
///
/// The flat-file tree under `context_dir` is the source of truth for
/// knowledge; relational and vector targets import it. Memory and prune
/// history come from `source`.
pub async fn migrate_backends(
    source: &Backend,
    target: &Backend,
    context_dir: &Path,
) -> Result<MigrationSummary, StrataError> {
    let (from, to) = (source.kind(), target.kind());
    if from == to {
        return Err(StrataError::Config(format!(
            "source and target are both {from}"
        )));
    }
    let knowledge_files = match target {
        Backend::Sqlite(b) => b.import_tree(context_dir).await?,
        Backend::Vector(b) => b.import_tree(context_dir).await?,
        Backend::Files(_) => 0,
        Backend::Hybrid(_) => {
            return Err(StrataError::Config(
                "hybrid is a routing layer, not a migration target".into(),
            ));
        }
    };
    let memory = strata_memory::migrate(source, target).await?;
    let mut mismatches = compare_memory(source, target).await?;
    mismatches.extend(compare_knowledge(source, target).await?);
    for mismatch in &mismatches {
        warn!(from = %from, to = %to, mismatch = %mismatch, "migration mismatch");
    }
    info!(
        from = %from,
        to = %to,
        entries = memory.entries,
        knowledge_files,
        mismatches = mismatches.len(),
        "migration verified"
    );
    Ok(MigrationSummary {
        from,
        to,
        memory,
        knowledge_files,
        mismatches,
    })
}

/// Entries must agree on content, both dates and staleness.
async fn compare_memory(source: &Backend, target: &Backend) -> Result<Vec<String>, StrataError> {
    let all = MemoryFilter::default();
    let target_entries: BTreeMap<String, _> = target
        .list(&all)
        .await?
        .into_iter()
        .map(|e| (e.id.clone(), e))
        .collect();
    let mut mismatches = Vec::new();
    for entry in source.list(&all).await? {
        let Some(copy) = target_entries.get(&entry.id) else {
            mismatches.push(format!("{}: missing from target", entry.id));
            continue;
        };
        if copy.content != entry.content {
            mismatches.push(format!("{}: content differs", entry.id));
        }
        if copy.created_at != entry.created_at || copy.updated_at != entry.updated_at {
            mismatches.push(format!("{}: dates differ", entry.id));
        }
        if copy.staleness != entry.staleness {
            mismatches.push(format!(
                "{}: {} in source, {} in target",
                entry.id, entry.staleness, copy.staleness
            ));
        }
    }
    Ok(mismatches)
}

/// Every file the source knows must have the same reference and body in the
/// target.
async fn compare_knowledge(
    source: &Backend,
    target: &Backend,
) -> Result<Vec<String>, StrataError> {
    let mut mismatches = Vec::new();
    let catalog = source.get_catalog(None).await?;
    if catalog != target.get_catalog(None).await? {
        mismatches.push("catalog differs".to_string());
    }
    for summary in &catalog.domains {
        let index = source.get_domain_index(&summary.domain).await?;
        for reference in &index.files {
            let copy = match target.get_reference(&reference.domain, &reference.file).await {
                Ok(copy) => copy,
                Err(StrataError::NotFound { .. }) => {
                    mismatches.push(format!("{}: missing from target", reference.id));
                    continue;
                }
                Err(e) => return Err(e),
            };
            if &copy != reference {
                mismatches.push(format!("{}: metadata differs", reference.id));
            }
            if source.materialize(reference).await? != target.materialize(&copy).await? {
                mismatches.push(format!("{}: body differs", reference.id));
            }
        }
    }
    Ok(mismatches)
}

pub fn render_migration(summary: &MigrationSummary) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "strata migrate: {} -> {}", summary.from, summary.to);
    let _ = writeln!(
        out,
        "  memory: {} entries ({} overwritten), {} prune records",
        summary.memory.entries, summary.memory.overwritten, summary.memory.records
    );
    let _ = writeln!(out, "  knowledge: {} files imported", summary.knowledge_files);
    if summary.is_faithful() {
        let _ = writeln!(out, "  verified: target matches source");
    } else {
        for mismatch in &summary.mismatches {
            let _ = writeln!(out, "  mismatch: {mismatch}");
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_lists_mismatches() {
        let summary = MigrationSummary {
            from: BackendKind::Files,
            to: BackendKind::Sqlite,
            memory: MigrationReport {
                entries: 3,
                overwritten: 0,
                records: 2,
            },
            knowledge_files: 9,
            mismatches: vec!["projects/acme/notes: content differs".into()],
        };
        let text = render_migration(&summary);
        assert!(text.starts_with("strata migrate: files -> sqlite\n"));
        assert!(text.contains("3 entries (0 overwritten), 2 prune records"));
        assert!(text.contains("mismatch: projects/acme/notes: content differs"));
        assert!(!summary.is_faithful());
    }
}
