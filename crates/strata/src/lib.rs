// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Strata composition root.
//!
//! Picks one [`Backend`] from configuration, wraps it in a [`Session`] (a
//! fresh tiered cache plus the memory service) and hosts the operational
//! subcommands of the `strata` binary.

pub mod backend;
pub mod commands;
pub mod logging;
pub mod session;

pub use backend::Backend;
pub use session::Session;
