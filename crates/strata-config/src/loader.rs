// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Merge order, later wins: compiled defaults, `/etc/strata/strata.toml`,
//! `$XDG_CONFIG_HOME/strata/strata.toml`, `./strata.toml`, then `STRATA_*`
//! environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StrataConfig;

/// Config sections addressable from the environment.
const ENV_SECTIONS: &[&str] = &[
    "backend", "files", "storage", "vector", "pruning", "remote", "logging",
];

pub(crate) const SYSTEM_CONFIG: &str = "/etc/strata/strata.toml";
pub(crate) const LOCAL_CONFIG: &str = "strata.toml";

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("strata").join("strata.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<StrataConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only. No files, no environment.
pub fn load_config_from_str(toml_content: &str) -> Result<StrataConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrataConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StrataConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrataConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The full hierarchy before extraction.
pub fn build_figment() -> Figment {
    let mut figment = Figment::new()
        .merge(Serialized::defaults(StrataConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG));
    if let Some(user) = user_config_path() {
        figment = figment.merge(Toml::file(user));
    }
    figment.merge(Toml::file(LOCAL_CONFIG)).merge(env_provider())
}

/// `STRATA_FILES_MEMORY_DIR` maps to `files.memory_dir`.
///
/// Only the first underscore after a known section name becomes a dot, so
/// keys that contain underscores themselves survive intact.
fn env_provider() -> Env {
    Env::prefixed("STRATA_").map(|key| {
        let key = key.as_str();
        ENV_SECTIONS
            .iter()
            .find_map(|section| {
                key.strip_prefix(section)
                    .and_then(|rest| rest.strip_prefix('_'))
                    .map(|rest| format!("{section}.{rest}"))
            })
            .unwrap_or_else(|| key.to_string())
            .into()
    })
}
