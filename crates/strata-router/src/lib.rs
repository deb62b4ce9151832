// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fallback routing for hybrid knowledge domains.
//!
//! A file is statically classified as remote-preferred, local-only or merge.
//! Remote failures (errors, missing documents, timeouts) never reach the
//! caller; the local backend answers instead.

pub mod hybrid;
pub mod remote;
pub mod routes;

pub use hybrid::HybridProvider;
pub use remote::RemoteSource;
pub use routes::{RouteMode, RouteTable};
