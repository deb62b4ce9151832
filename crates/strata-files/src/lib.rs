// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Flat-file backend.
//!
//! Knowledge lives under `{context_dir}/{domain}/{file}.md` with a
//! `loading_protocol.md` at the root. Memory lives under
//! `{memory_dir}/{layer}/{owner}/{project}/{file_type}.md`, each file opening
//! with a `<!-- Last Updated: YYYY-MM-DD -->` line. The prune audit trail is
//! a JSON-lines file next to the memory tree.

pub mod backend;
pub mod history;
pub mod integrity;
mod knowledge;
pub mod memory;
pub mod tree;

pub use backend::FileBackend;
pub use integrity::{IntegrityIssue, validate_domain};
pub use tree::{KnowledgeTree, StoredDocument, scan_tree};
