// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Memory entry model, prune audit records and backend identity types.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::error::StrataError;
use crate::staleness::{classify, Staleness};

/// Memory partition kind.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Layer {
    SharedProject,
    SkillSpecific,
    Command,
    Agent,
}

impl Layer {
    /// Directory name used by the flat-file layout and as the id prefix.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Layer::SharedProject => "projects",
            Layer::SkillSpecific => "skills",
            Layer::Command => "commands",
            Layer::Agent => "agents",
        }
    }

    /// Inverse of [`Layer::dir_name`].
    pub fn from_dir_name(name: &str) -> Option<Self> {
        match name {
            "projects" => Some(Layer::SharedProject),
            "skills" => Some(Layer::SkillSpecific),
            "commands" => Some(Layer::Command),
            "agents" => Some(Layer::Agent),
            _ => None,
        }
    }

    /// Whether entries in this layer are owned by a skill, command or agent.
    pub fn has_owner(&self) -> bool {
        !matches!(self, Layer::SharedProject)
    }
}

/// Logical slot of a memory entry. The entry id is derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MemoryKey {
    pub layer: Layer,
    pub project: String,
    /// Skill, command or agent name. `None` for shared-project memory.
    pub owner: Option<String>,
    pub file_type: String,
}

impl MemoryKey {
    /// Shared project memory (`projects/{project}/{file_type}`).
    pub fn shared(project: impl Into<String>, file_type: impl Into<String>) -> Self {
        Self {
            layer: Layer::SharedProject,
            project: project.into(),
            owner: None,
            file_type: file_type.into(),
        }
    }

    /// Memory owned by a skill, command or agent.
    pub fn owned(
        layer: Layer,
        owner: impl Into<String>,
        project: impl Into<String>,
        file_type: impl Into<String>,
    ) -> Self {
        Self {
            layer,
            project: project.into(),
            owner: Some(owner.into()),
            file_type: file_type.into(),
        }
    }

    /// Validate segment contents and owner presence.
    pub fn validate(&self) -> Result<(), StrataError> {
        validate_segment("project", &self.project)?;
        validate_segment("file_type", &self.file_type)?;
        match (&self.owner, self.layer.has_owner()) {
            (Some(owner), true) => validate_segment("owner", owner),
            (None, false) => Ok(()),
            (Some(_), false) => Err(StrataError::InvalidKey(
                "shared-project memory must not name an owner".into(),
            )),
            (None, true) => Err(StrataError::InvalidKey(format!(
                "{} memory requires an owner",
                self.layer
            ))),
        }
    }

    /// Deterministic entry id: `{layer}/{owner}/{project}/{file_type}`.
    pub fn id(&self) -> String {
        match &self.owner {
            Some(owner) => format!(
                "{}/{}/{}/{}",
                self.layer.dir_name(),
                owner,
                self.project,
                self.file_type
            ),
            None => format!("{}/{}/{}", self.layer.dir_name(), self.project, self.file_type),
        }
    }

    /// Parse an id produced by [`MemoryKey::id`].
    pub fn from_id(id: &str) -> Result<Self, StrataError> {
        let parts: Vec<&str> = id.split('/').collect();
        let layer = parts
            .first()
            .and_then(|p| Layer::from_dir_name(p))
            .ok_or_else(|| StrataError::InvalidKey(format!("unknown layer in id `{id}`")))?;
        let key = match (layer.has_owner(), parts.as_slice()) {
            (false, [_, project, file_type]) => MemoryKey::shared(*project, *file_type),
            (true, [_, owner, project, file_type]) => {
                MemoryKey::owned(layer, *owner, *project, *file_type)
            }
            _ => {
                return Err(StrataError::InvalidKey(format!(
                    "malformed memory id `{id}`"
                )));
            }
        };
        key.validate()?;
        Ok(key)
    }

    /// Sibling slot with a different file type (e.g. the `_archive` companion).
    pub fn with_file_type(&self, file_type: impl Into<String>) -> Self {
        Self {
            file_type: file_type.into(),
            ..self.clone()
        }
    }
}

impl fmt::Display for MemoryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id())
    }
}

fn validate_segment(name: &str, value: &str) -> Result<(), StrataError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StrataError::InvalidKey(format!("{name} must not be empty")));
    }
    if trimmed != value
        || value == "."
        || value == ".."
        || value.contains(['/', '\\', '\0'])
    {
        return Err(StrataError::InvalidKey(format!(
            "{name} `{value}` is not a valid path segment"
        )));
    }
    Ok(())
}

/// The unit of persisted agent memory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryEntry {
    pub id: String,
    pub key: MemoryKey,
    pub content: String,
    pub created_at: NaiveDate,
    /// `None` when the backend could not parse a timestamp.
    pub updated_at: Option<NaiveDate>,
    pub line_count: usize,
    /// Derived on every read; never trusted from storage.
    pub staleness: Staleness,
}

impl MemoryEntry {
    /// Build a new entry dated `today`.
    pub fn new(key: MemoryKey, content: impl Into<String>, today: NaiveDate) -> Self {
        Self::with_dates(key, content, today, Some(today), today)
    }

    /// Build an entry with explicit dates, classifying it against `today`.
    pub fn with_dates(
        key: MemoryKey,
        content: impl Into<String>,
        created_at: NaiveDate,
        updated_at: Option<NaiveDate>,
        today: NaiveDate,
    ) -> Self {
        let content = content.into();
        Self {
            id: key.id(),
            line_count: count_lines(&content),
            staleness: classify(updated_at, today),
            key,
            content,
            created_at,
            updated_at,
        }
    }

    /// Recompute the derived fields. Every reader calls this.
    pub fn refresh(mut self, today: NaiveDate) -> Self {
        self.line_count = count_lines(&self.content);
        self.staleness = classify(self.updated_at, today);
        self
    }

    /// Replace the content wholesale and stamp `today` as the update date.
    pub fn replaced(mut self, content: String, today: NaiveDate) -> Self {
        self.content = content;
        self.updated_at = Some(today);
        self.refresh(today)
    }
}

/// Line count as reported on entries.
pub fn count_lines(content: &str) -> usize {
    content.lines().count()
}

/// Action recorded in the prune audit trail.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum PruneAction {
    Archived,
    Removed,
    Flagged,
}

/// Append-only audit entry. Outlives the entry it describes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PruneRecord {
    pub entry_id: String,
    pub action: PruneAction,
    pub reason: String,
    pub pruned_at: NaiveDate,
    /// Required for `Archived`; present for `Removed` unless history is recoverable.
    pub content_snapshot: Option<String>,
}

impl PruneRecord {
    /// Check the snapshot requirement for archival.
    pub fn validate(&self) -> Result<(), StrataError> {
        if self.action == PruneAction::Archived && self.content_snapshot.is_none() {
            return Err(StrataError::PolicyViolation(format!(
                "archival of {} must carry a content snapshot",
                self.entry_id
            )));
        }
        Ok(())
    }
}

/// Filter for aggregate memory reads and searches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryFilter {
    pub layer: Option<Layer>,
    pub project: Option<String>,
    pub owner: Option<String>,
    pub file_type: Option<String>,
}

impl MemoryFilter {
    pub fn project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    pub fn owned_by(layer: Layer, owner: impl Into<String>) -> Self {
        Self {
            layer: Some(layer),
            owner: Some(owner.into()),
            ..Self::default()
        }
    }

    /// Whether a key falls inside this filter.
    pub fn matches(&self, key: &MemoryKey) -> bool {
        self.layer.is_none_or(|l| l == key.layer)
            && self.project.as_deref().is_none_or(|p| p == key.project)
            && self
                .owner
                .as_deref()
                .is_none_or(|o| key.owner.as_deref() == Some(o))
            && self
                .file_type
                .as_deref()
                .is_none_or(|f| f == key.file_type)
    }
}

/// A batch of writes produced by the pruning engine or an append.
///
/// Backends apply a changeset atomically where they can. A changeset built
/// under a dry-run policy must never be applied.
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub upserts: Vec<MemoryEntry>,
    pub records: Vec<PruneRecord>,
    pub dry_run: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.records.is_empty()
    }

    /// Reject dry-run changesets and malformed records before any mutation.
    pub fn ensure_committable(&self) -> Result<(), StrataError> {
        if self.dry_run {
            return Err(StrataError::PolicyViolation(
                "dry-run changeset cannot be committed".into(),
            ));
        }
        self.records.iter().try_for_each(PruneRecord::validate)
    }
}

/// Closed set of backend kinds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Files,
    Sqlite,
    Vector,
    Hybrid,
}

/// Health status reported by backend health checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Degraded(String),
    Unhealthy(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn shared_key_id_omits_owner() {
        let key = MemoryKey::shared("acme", "project_overview");
        assert_eq!(key.id(), "projects/acme/project_overview");
        assert_eq!(MemoryKey::from_id(&key.id()).unwrap(), key);
    }

    #[test]
    fn owned_key_id_roundtrips() {
        let key = MemoryKey::owned(Layer::SkillSpecific, "python-code-review", "acme", "review_history");
        assert_eq!(key.id(), "skills/python-code-review/acme/review_history");
        assert_eq!(MemoryKey::from_id(&key.id()).unwrap(), key);
    }

    #[test]
    fn key_validation_rejects_bad_segments() {
        assert!(MemoryKey::shared("", "x").validate().is_err());
        assert!(MemoryKey::shared("a/b", "x").validate().is_err());
        assert!(MemoryKey::shared("..", "x").validate().is_err());
        assert!(MemoryKey::shared(" acme", "x").validate().is_err());
        let mut key = MemoryKey::owned(Layer::Agent, "scout", "acme", "notes");
        key.owner = None;
        assert!(key.validate().is_err());
        key.layer = Layer::SharedProject;
        key.owner = Some("scout".into());
        assert!(key.validate().is_err());
    }

    #[test]
    fn from_id_rejects_unknown_layer() {
        assert!(MemoryKey::from_id("teams/acme/notes").is_err());
        assert!(MemoryKey::from_id("skills/acme/notes").is_err());
    }

    #[test]
    fn entry_refresh_recomputes_staleness() {
        let key = MemoryKey::shared("acme", "notes");
        let mut entry = MemoryEntry::new(key, "a\nb\n", day(2026, 1, 1));
        assert_eq!(entry.line_count, 2);
        assert_eq!(entry.staleness, Staleness::Fresh);
        entry.staleness = Staleness::Fresh;
        let entry = entry.refresh(day(2026, 6, 1));
        assert_eq!(entry.staleness, Staleness::Stale);
    }

    #[test]
    fn archived_record_requires_snapshot() {
        let record = PruneRecord {
            entry_id: "projects/acme/review_history".into(),
            action: PruneAction::Archived,
            reason: "over limit".into(),
            pruned_at: day(2026, 1, 1),
            content_snapshot: None,
        };
        assert!(matches!(record.validate(), Err(StrataError::PolicyViolation(_))));
    }

    #[test]
    fn dry_run_changeset_is_not_committable() {
        let changes = ChangeSet {
            dry_run: true,
            ..ChangeSet::default()
        };
        assert!(matches!(
            changes.ensure_committable(),
            Err(StrataError::PolicyViolation(_))
        ));
    }

    #[test]
    fn filter_matches_owner_and_project() {
        let key = MemoryKey::owned(Layer::Agent, "scout", "acme", "notes");
        assert!(MemoryFilter::project("acme").matches(&key));
        assert!(!MemoryFilter::project("other").matches(&key));
        assert!(MemoryFilter::owned_by(Layer::Agent, "scout").matches(&key));
        assert!(!MemoryFilter::owned_by(Layer::SkillSpecific, "scout").matches(&key));
    }
}
