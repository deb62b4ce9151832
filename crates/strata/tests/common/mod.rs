// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Shared setup for the composition tests.

use std::path::Path;

use strata_config::StrataConfig;
use strata_core::BackendKind;

/// Config whose directories and database live under `root`, which is
/// expected to come from `knowledge_workspace()`.
pub fn config_in(root: &Path, kind: BackendKind) -> StrataConfig {
    let mut config = StrataConfig::default();
    config.backend.kind = kind;
    config.files.context_dir = root.join("context").to_string_lossy().into_owned();
    config.files.memory_dir = root.join("memory").to_string_lossy().into_owned();
    config.storage.database_path = root.join("strata.db").to_string_lossy().into_owned();
    config
}
