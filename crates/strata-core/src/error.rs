// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Strata knowledge cache.
//!
//! Missing or malformed timestamps are deliberately absent from this enum:
//! they never surface as errors and instead classify as [`Staleness::Stale`].
//!
//! [`Staleness::Stale`]: crate::staleness::Staleness::Stale

use thiserror::Error;

/// The primary error type used across all Strata traits and backends.
#[derive(Debug, Error)]
pub enum StrataError {
    /// Read, update, append or delete target is absent.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// `create` was called for an id that already exists.
    #[error("entry already exists: {id}")]
    AlreadyExists { id: String },

    /// A remote or relational backend could not be reached.
    #[error("backend unavailable ({backend}): {message}")]
    BackendUnavailable {
        backend: String,
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An operation was rejected before any mutation (e.g. committing a dry-run plan).
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// A memory key or knowledge path failed validation.
    #[error("invalid key: {0}")]
    InvalidKey(String),

    /// Unexpected storage-layer failure (I/O, SQL, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StrataError {
    /// Shorthand for a missing memory entry.
    pub fn entry_not_found(id: impl Into<String>) -> Self {
        StrataError::NotFound {
            kind: "memory entry",
            id: id.into(),
        }
    }

    /// Shorthand for a missing knowledge file or domain.
    pub fn knowledge_not_found(id: impl Into<String>) -> Self {
        StrataError::NotFound {
            kind: "knowledge file",
            id: id.into(),
        }
    }

    /// Wraps an I/O error as a storage failure.
    pub fn io(e: std::io::Error) -> Self {
        StrataError::Storage {
            source: Box::new(e),
        }
    }

    /// Returns true for errors a caller can recover from by choosing a fallback.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StrataError::NotFound { .. }
                | StrataError::AlreadyExists { .. }
                | StrataError::BackendUnavailable { .. }
                | StrataError::Timeout { .. }
        )
    }
}
