// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Backend contract traits.
//!
//! Every backend implements [`BackendAdapter`] plus one or both halves of the
//! contract: [`ContextProvider`] for knowledge and [`EntryStore`] for memory.
//! All traits use `#[async_trait]` so they stay object safe.

pub mod adapter;
pub mod context;
pub mod entry_store;

pub use adapter::BackendAdapter;
pub use context::ContextProvider;
pub use entry_store::EntryStore;
