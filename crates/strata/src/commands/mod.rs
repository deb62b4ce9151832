// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Operational subcommands. Each returns a report the binary prints as plain
//! text.

pub mod check;
pub mod migrate;
pub mod prune;
