// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The memory half of the backend contract, over any [`EntryStore`].

use std::sync::Arc;

use chrono::NaiveDate;
use strata_core::types::count_lines;
use strata_core::{
    ChangeSet, Clock, EntryStore, Layer, MemoryEntry, MemoryFilter, MemoryKey, PruneRecord,
    StrataError,
};
use strata_prune::{
    BudgetWarning, EntryChange, PruneEngine, PrunePolicy, PruneReport, archive_file_type,
};
use tracing::{debug, info, warn};

use crate::locks::KeyedLocks;

/// What an `append` did besides concatenating.
#[derive(Debug, Clone)]
pub struct AppendOutcome {
    pub entry: MemoryEntry,
    /// Prune records written alongside the append.
    pub records: Vec<PruneRecord>,
    /// Archive sibling that received sections, if any.
    pub archive_id: Option<String>,
    pub budget_warning: Option<BudgetWarning>,
}

/// A computed prune run. Committing a dry-run plan is a policy violation.
#[derive(Debug, Clone)]
pub struct PrunePlan {
    pub report: PruneReport,
    pub changes: Vec<ChangeSet>,
    /// What each change was computed from, in `changes` order.
    bases: Vec<PlanBase>,
}

/// The entry and archive state one planned change was computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PlanBase {
    entry_id: String,
    archive_id: String,
    content: String,
    updated_at: Option<NaiveDate>,
    archive: Option<String>,
}

impl PlanBase {
    fn matches(&self, entry: &MemoryEntry, archive: Option<&MemoryEntry>) -> bool {
        self.content == entry.content
            && self.updated_at == entry.updated_at
            && self.archive.as_deref() == archive.map(|a| a.content.as_str())
    }
}

fn archive_id_of(key: &MemoryKey) -> String {
    key.with_file_type(archive_file_type(&key.file_type)).id()
}

/// Memory operations with lifecycle rules, over one store.
///
/// Writes are serialised per entry id. `append` is read, prune, then write;
/// the archive sibling it may touch is locked alongside the entry.
pub struct MemoryService<S: EntryStore + ?Sized> {
    store: Arc<S>,
    engine: PruneEngine,
    clock: Arc<dyn Clock>,
    locks: KeyedLocks,
}

impl<S: EntryStore + ?Sized> MemoryService<S> {
    pub fn new(store: Arc<S>, engine: PruneEngine, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            engine,
            clock,
            locks: KeyedLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn engine(&self) -> &PruneEngine {
        &self.engine
    }

    fn refresh(&self, entry: MemoryEntry) -> MemoryEntry {
        entry.refresh(self.clock.today())
    }

    fn refresh_all(&self, entries: Vec<MemoryEntry>) -> Vec<MemoryEntry> {
        let today = self.clock.today();
        entries.into_iter().map(|e| e.refresh(today)).collect()
    }

    /// Create the entry for `key`. Fails with `AlreadyExists` if the slot is taken.
    pub async fn create(
        &self,
        key: MemoryKey,
        content: impl Into<String>,
    ) -> Result<MemoryEntry, StrataError> {
        key.validate()?;
        let id = key.id();
        let _guard = self.locks.lock(&id).await;
        let entry = MemoryEntry::new(key, content, self.clock.today());
        self.store.insert(entry.clone()).await?;
        debug!(id = %id, lines = entry.line_count, "memory entry created");
        Ok(entry)
    }

    /// Read the entry for a logical slot.
    pub async fn read(&self, key: &MemoryKey) -> Result<Option<MemoryEntry>, StrataError> {
        key.validate()?;
        self.get(&key.id()).await
    }

    /// Read an entry by id.
    pub async fn get(&self, id: &str) -> Result<Option<MemoryEntry>, StrataError> {
        Ok(self.store.fetch(id).await?.map(|e| self.refresh(e)))
    }

    async fn require(&self, id: &str) -> Result<MemoryEntry, StrataError> {
        self.store
            .fetch(id)
            .await?
            .ok_or_else(|| StrataError::entry_not_found(id))
    }

    /// Replace an entry's content and refresh its timestamp.
    pub async fn update(&self, id: &str, content: impl Into<String>) -> Result<MemoryEntry, StrataError> {
        let _guard = self.locks.lock(id).await;
        let existing = self.require(id).await?;
        let entry = existing.replaced(content.into(), self.clock.today());
        self.store.replace(entry.clone()).await?;
        debug!(id, lines = entry.line_count, "memory entry updated");
        Ok(entry)
    }

    /// Prune the existing content, then append `text` and refresh the timestamp.
    ///
    /// Sections the rules archive are moved into the `{file_type}_archive`
    /// sibling, which is created if absent. Entry, archive and records are
    /// committed as one changeset.
    pub async fn append(&self, id: &str, text: &str) -> Result<AppendOutcome, StrataError> {
        let key = MemoryKey::from_id(id)?;
        let archive_key = key.with_file_type(archive_file_type(&key.file_type));
        let archive_id = archive_key.id();
        let _guards = self.locks.lock_many(&[id, archive_id.as_str()]).await;

        let existing = self.require(id).await?;
        let today = self.clock.today();
        let outcome = self.engine.evaluate(
            id,
            &key.file_type,
            &existing.content,
            today,
            self.store.history_is_recoverable(),
        );

        let mut content = outcome.content;
        if !content.is_empty() && !content.ends_with('\n') {
            content.push('\n');
        }
        content.push_str(text);
        let entry = existing.replaced(content, today);

        let mut upserts = vec![entry.clone()];
        let archive_touched = if outcome.archived.is_empty() {
            None
        } else {
            let archive = self.store.fetch(&archive_id).await?;
            upserts.push(extend_archive(archive, archive_key, &outcome.archived, today));
            Some(archive_id)
        };

        let records = outcome.records;
        self.store
            .apply(ChangeSet {
                upserts,
                records: records.clone(),
                dry_run: false,
            })
            .await?;

        let budget_warning = self
            .engine
            .check_budget(id, &key.file_type, &entry.content);
        debug!(
            id,
            lines = entry.line_count,
            pruned = records.len(),
            "memory entry appended"
        );
        Ok(AppendOutcome {
            entry,
            records,
            archive_id: archive_touched,
            budget_warning,
        })
    }

    /// Delete an entry. Its prune history survives.
    pub async fn delete(&self, id: &str) -> Result<bool, StrataError> {
        let _guard = self.locks.lock(id).await;
        let deleted = self.store.remove(id).await?;
        debug!(id, deleted, "memory entry delete");
        Ok(deleted)
    }

    /// Entries matching a filter, each freshly classified.
    pub async fn list(&self, filter: &MemoryFilter) -> Result<Vec<MemoryEntry>, StrataError> {
        Ok(self.refresh_all(self.store.list(filter).await?))
    }

    /// Every entry of a project across all layers.
    pub async fn get_by_project(&self, project: &str) -> Result<Vec<MemoryEntry>, StrataError> {
        self.list(&MemoryFilter::project(project)).await
    }

    /// Memory owned by a skill, optionally restricted to one project.
    pub async fn get_skill_memory(
        &self,
        skill: &str,
        project: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        self.owned(Layer::SkillSpecific, skill, project).await
    }

    /// Memory owned by an agent, optionally restricted to one project.
    pub async fn get_agent_memory(
        &self,
        agent: &str,
        project: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        self.owned(Layer::Agent, agent, project).await
    }

    /// Memory owned by a command, optionally restricted to one project.
    pub async fn get_command_memory(
        &self,
        command: &str,
        project: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        self.owned(Layer::Command, command, project).await
    }

    async fn owned(
        &self,
        layer: Layer,
        owner: &str,
        project: Option<&str>,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        let mut filter = MemoryFilter::owned_by(layer, owner);
        filter.project = project.map(str::to_string);
        self.list(&filter).await
    }

    /// Entries whose content contains `pattern`, ignoring case.
    pub async fn search(
        &self,
        pattern: &str,
        filter: &MemoryFilter,
    ) -> Result<Vec<MemoryEntry>, StrataError> {
        Ok(self.refresh_all(self.store.search_entries(pattern, filter).await?))
    }

    /// Compute a prune run without writing anything.
    pub async fn plan_prune(&self, policy: &PrunePolicy) -> Result<PrunePlan, StrataError> {
        let entries = self.store.list(&policy.scope.filter()).await?;
        let mut report = PruneReport {
            dry_run: policy.dry_run,
            examined: entries.len(),
            ..PruneReport::default()
        };
        let mut changes = Vec::new();
        let mut bases = Vec::new();
        for entry in entries {
            if let Some((change, changeset)) = self.plan_entry(&entry, policy.dry_run).await? {
                let archive_id = archive_id_of(&entry.key);
                let archive = self.store.fetch(&archive_id).await?.map(|a| a.content);
                bases.push(PlanBase {
                    entry_id: entry.id.clone(),
                    archive_id,
                    content: entry.content.clone(),
                    updated_at: entry.updated_at,
                    archive,
                });
                report.records.extend(changeset.records.iter().cloned());
                report.changes.push(change);
                changes.push(changeset);
            }
            report.warnings.extend(self.engine.check_budget(
                &entry.id,
                &entry.key.file_type,
                &entry.content,
            ));
        }
        Ok(PrunePlan {
            report,
            changes,
            bases,
        })
    }

    async fn plan_entry(
        &self,
        entry: &MemoryEntry,
        dry_run: bool,
    ) -> Result<Option<(EntryChange, ChangeSet)>, StrataError> {
        let today = self.clock.today();
        let outcome = self.engine.evaluate(
            &entry.id,
            &entry.key.file_type,
            &entry.content,
            today,
            self.store.history_is_recoverable(),
        );
        if outcome.is_noop() {
            return Ok(None);
        }
        let mut pruned = entry.clone();
        pruned.content = outcome.content;
        let pruned = pruned.refresh(today);

        let mut upserts = Vec::new();
        let mut archived_to = None;
        if !outcome.archived.is_empty() {
            let archive_key = entry
                .key
                .with_file_type(archive_file_type(&entry.key.file_type));
            let archive = self.store.fetch(&archive_key.id()).await?;
            archived_to = Some(archive_key.id());
            upserts.push(extend_archive(archive, archive_key, &outcome.archived, today));
        }
        let change = EntryChange {
            entry_id: entry.id.clone(),
            lines_before: entry.line_count,
            lines_after: pruned.line_count,
            archived_to,
        };
        upserts.insert(0, pruned);
        Ok(Some((
            change,
            ChangeSet {
                upserts,
                records: outcome.records,
                dry_run,
            },
        )))
    }

    /// Run the rules over every entry in scope.
    ///
    /// Under `dry_run` this is [`plan_prune`](Self::plan_prune). Otherwise each
    /// entry is re-read, pruned and committed under its lock. Pruning does
    /// not refresh `updated_at`: it is not new information.
    pub async fn prune(&self, policy: &PrunePolicy) -> Result<PruneReport, StrataError> {
        if policy.dry_run {
            let plan = self.plan_prune(policy).await?;
            info!(
                scope = %policy.scope,
                examined = plan.report.examined,
                changes = plan.report.changes.len(),
                "dry-run prune computed"
            );
            return Ok(plan.report);
        }

        let ids: Vec<String> = self
            .store
            .list(&policy.scope.filter())
            .await?
            .into_iter()
            .map(|e| e.id)
            .collect();
        let mut report = PruneReport {
            examined: ids.len(),
            ..PruneReport::default()
        };
        for id in ids {
            let archive_id = archive_id_of(&MemoryKey::from_id(&id)?);
            let _guards = self.locks.lock_many(&[id.as_str(), archive_id.as_str()]).await;
            let Some(entry) = self.store.fetch(&id).await? else {
                continue;
            };
            report.warnings.extend(self.engine.check_budget(
                &entry.id,
                &entry.key.file_type,
                &entry.content,
            ));
            if let Some((change, changeset)) = self.plan_entry(&entry, false).await? {
                report.records.extend(changeset.records.iter().cloned());
                self.store.apply(changeset).await?;
                report.changes.push(change);
            }
        }
        info!(
            scope = %policy.scope,
            examined = report.examined,
            changes = report.changes.len(),
            records = report.records.len(),
            "prune committed"
        );
        Ok(report)
    }

    /// Commit a previously computed plan. Dry-run plans are rejected before
    /// anything is written.
    ///
    /// Each entry is re-read under its lock. If the entry or its archive
    /// changed since planning, that entry is planned again from its current
    /// state; deleted entries are skipped. The returned report describes
    /// what was written.
    pub async fn commit(&self, plan: PrunePlan) -> Result<PruneReport, StrataError> {
        if plan.report.dry_run || plan.changes.iter().any(|c| c.dry_run) {
            return Err(StrataError::PolicyViolation(
                "a dry-run prune plan cannot be committed".into(),
            ));
        }
        let PrunePlan {
            mut report,
            changes,
            bases,
        } = plan;
        let planned = std::mem::take(&mut report.changes);
        report.records.clear();

        for ((changeset, change), base) in changes.into_iter().zip(planned).zip(bases) {
            let _guards = self
                .locks
                .lock_many(&[base.entry_id.as_str(), base.archive_id.as_str()])
                .await;
            let Some(current) = self.store.fetch(&base.entry_id).await? else {
                warn!(id = %base.entry_id, "entry deleted after the prune was planned");
                continue;
            };
            let archive = self.store.fetch(&base.archive_id).await?;
            let (change, changeset) = if base.matches(&current, archive.as_ref()) {
                (change, changeset)
            } else {
                debug!(
                    id = %base.entry_id,
                    "entry changed after the prune was planned, re-planning"
                );
                match self.plan_entry(&current, false).await? {
                    Some(replanned) => replanned,
                    None => continue,
                }
            };
            report.records.extend(changeset.records.iter().cloned());
            self.store.apply(changeset).await?;
            report.changes.push(change);
        }
        info!(
            changes = report.changes.len(),
            records = report.records.len(),
            "prune plan committed"
        );
        Ok(report)
    }

    /// Audit trail, oldest first.
    pub async fn prune_history(
        &self,
        entry_id: Option<&str>,
    ) -> Result<Vec<PruneRecord>, StrataError> {
        self.store.prune_history(entry_id).await
    }
}

/// Append archived section texts to the archive sibling, creating it if needed.
fn extend_archive(
    existing: Option<MemoryEntry>,
    key: MemoryKey,
    sections: &[String],
    today: NaiveDate,
) -> MemoryEntry {
    let moved: String = sections.concat();
    match existing {
        Some(archive) => {
            let mut content = archive.content.clone();
            if !content.is_empty() && !content.ends_with('\n') {
                content.push('\n');
            }
            content.push_str(&moved);
            archive.replaced(content, today)
        }
        None => {
            debug!(id = %key.id(), lines = count_lines(&moved), "creating archive entry");
            MemoryEntry::new(key, moved, today)
        }
    }
}
