// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Strata knowledge cache.
//!
//! This crate provides the error type, the knowledge and memory data model,
//! the staleness classifier, the markdown parser, and the backend contract
//! traits that every storage backend implements.

pub mod error;
pub mod knowledge;
pub mod markdown;
pub mod staleness;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::StrataError;
pub use knowledge::{
    Catalog, CrossDomainRule, DetectedType, DetectionResult, DomainIndex, DomainSummary,
    KnowledgeKind, KnowledgeReference, LoadedContext, LoadingStrategy, ProjectTypeRule,
    ScoredReference,
};
pub use staleness::{Clock, FixedClock, Staleness, SystemClock, classify};
pub use types::{
    BackendKind, ChangeSet, HealthStatus, Layer, MemoryEntry, MemoryFilter, MemoryKey,
    PruneAction, PruneRecord,
};

pub use traits::{BackendAdapter, ContextProvider, EntryStore};
