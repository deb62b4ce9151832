// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Strata knowledge cache.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key is
//! reported at startup instead of silently falling back to a default.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_core::BackendKind;

/// Top-level Strata configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrataConfig {
    /// Which backend serves the session.
    #[serde(default)]
    pub backend: BackendConfig,

    /// Flat-file backend layout.
    #[serde(default)]
    pub files: FilesConfig,

    /// Relational backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Vector backend settings.
    #[serde(default)]
    pub vector: VectorConfig,

    /// Retention rules and line budgets.
    #[serde(default)]
    pub pruning: PruningConfig,

    /// Remote documentation source and per-file routing.
    #[serde(default)]
    pub remote: RemoteConfig,

    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Backend selection.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    #[serde(default = "default_backend_kind")]
    pub kind: BackendKind,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_backend_kind(),
        }
    }
}

fn default_backend_kind() -> BackendKind {
    BackendKind::Files
}

/// Flat-file layout. Also the local half of the hybrid backend and the
/// knowledge source for the relational and vector backends.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FilesConfig {
    /// Root of the knowledge tree (`{domain}/{file}.md`).
    #[serde(default = "default_context_dir")]
    pub context_dir: String,

    /// Root of the memory tree (`{layer}/{owner}/{project}/{file_type}.md`).
    #[serde(default = "default_memory_dir")]
    pub memory_dir: String,

    /// The memory tree is under version control, so removed content stays
    /// recoverable from history.
    #[serde(default)]
    pub git_tracked: bool,
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            context_dir: default_context_dir(),
            memory_dir: default_memory_dir(),
            git_tracked: false,
        }
    }
}

fn default_context_dir() -> String {
    "context".to_string()
}

fn default_memory_dir() -> String {
    "memory".to_string()
}

/// Relational backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL mode so readers never block the writer.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: true,
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("strata").join("strata.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("strata.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_true() -> bool {
    true
}

/// Vector backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VectorConfig {
    /// Embedding width.
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,

    /// Minimum cosine similarity for a search hit (0.0-1.0).
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_dimensions() -> usize {
    256
}

fn default_similarity_threshold() -> f32 {
    0.1
}

/// Retention rules applied by the pruning engine.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PruningConfig {
    /// Review sections kept in the main entry; older ones are archived.
    #[serde(default = "default_review_history_keep")]
    pub review_history_keep: usize,

    /// Session sections kept verbatim; older ones are collapsed.
    #[serde(default = "default_session_keep")]
    pub session_keep: usize,

    /// Days after resolution before an issue is removed.
    #[serde(default = "default_resolved_retention_days")]
    pub resolved_retention_days: i64,

    /// Days without a status update before an issue is flagged.
    #[serde(default = "default_verification_after_days")]
    pub verification_after_days: i64,

    /// Line budget for file types without an explicit entry.
    #[serde(default = "default_line_budget")]
    pub default_line_budget: usize,

    /// Per file type line budgets.
    #[serde(default = "default_line_budgets")]
    pub line_budgets: BTreeMap<String, usize>,
}

impl Default for PruningConfig {
    fn default() -> Self {
        Self {
            review_history_keep: default_review_history_keep(),
            session_keep: default_session_keep(),
            resolved_retention_days: default_resolved_retention_days(),
            verification_after_days: default_verification_after_days(),
            default_line_budget: default_line_budget(),
            line_budgets: default_line_budgets(),
        }
    }
}

fn default_review_history_keep() -> usize {
    10
}

fn default_session_keep() -> usize {
    15
}

fn default_resolved_retention_days() -> i64 {
    30
}

fn default_verification_after_days() -> i64 {
    90
}

fn default_line_budget() -> usize {
    500
}

fn default_line_budgets() -> BTreeMap<String, usize> {
    BTreeMap::from([
        ("project_overview".to_string(), 200),
        ("review_history".to_string(), 300),
    ])
}

/// Remote documentation source configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RemoteConfig {
    /// Upper bound on a single remote read, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Static routing table. Files without a route are local-only.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            routes: Vec::new(),
        }
    }
}

fn default_timeout_ms() -> u64 {
    3000
}

/// One row of the hybrid routing table.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouteConfig {
    pub domain: String,
    pub file: String,
    /// `remote-preferred`, `local-only` or `merge`.
    pub mode: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive; `RUST_LOG` overrides it.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
