// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Vector backend for the Strata knowledge cache.
//!
//! Entries and knowledge files are held in process with an embedding per
//! item. Knowledge search ranks by cosine similarity above a configured
//! threshold; memory pattern search keeps the substring semantics shared by
//! every backend, with [`VectorBackend::semantic_search`] as the similarity
//! counterpart.

pub mod backend;
pub mod embedding;

pub use backend::VectorBackend;
pub use embedding::{Embedder, HashingEmbedder, cosine_similarity};
