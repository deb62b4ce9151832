// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration system for the Strata knowledge cache.
//!
//! TOML files layered with Figment, strict `deny_unknown_fields` parsing,
//! `STRATA_*` environment overrides, and miette diagnostics with typo
//! suggestions.
//!
//! ```no_run
//! let config = strata_config::load_and_validate().expect("config errors");
//! println!("backend: {}", config.backend.kind);
//! ```

pub mod diagnostic;
pub mod loader;
pub mod model;
pub mod validation;

use std::path::Path;

pub use diagnostic::{ConfigError, render_errors};
pub use loader::{load_config, load_config_from_path, load_config_from_str};
pub use model::{
    FilesConfig, LoggingConfig, PruningConfig, RemoteConfig, RouteConfig, StorageConfig,
    StrataConfig, VectorConfig,
};

/// Load the standard hierarchy and validate it.
pub fn load_and_validate() -> Result<StrataConfig, Vec<ConfigError>> {
    match loader::load_config() {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => Err(diagnostic::figment_to_config_errors(err, &collect_toml_sources())),
    }
}

/// Load one explicit file (plus env overrides) and validate it.
pub fn load_and_validate_path(path: &Path) -> Result<StrataConfig, Vec<ConfigError>> {
    match loader::load_config_from_path(path) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = std::fs::read_to_string(path)
                .map(|content| vec![(path.display().to_string(), content)])
                .unwrap_or_default();
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Load an inline TOML string and validate it.
pub fn load_and_validate_str(toml_content: &str) -> Result<StrataConfig, Vec<ConfigError>> {
    match loader::load_config_from_str(toml_content) {
        Ok(config) => {
            validation::validate_config(&config)?;
            Ok(config)
        }
        Err(err) => {
            let sources = vec![("<inline>".to_string(), toml_content.to_string())];
            Err(diagnostic::figment_to_config_errors(err, &sources))
        }
    }
}

/// Contents of every config file in the hierarchy, for source spans.
fn collect_toml_sources() -> Vec<(String, String)> {
    let mut paths = vec![std::path::PathBuf::from(loader::SYSTEM_CONFIG)];
    paths.extend(loader::user_config_path());
    if let Ok(cwd) = std::env::current_dir() {
        paths.push(cwd.join(loader::LOCAL_CONFIG));
    }
    paths
        .into_iter()
        .filter_map(|p| {
            std::fs::read_to_string(&p)
                .ok()
                .map(|content| (p.display().to_string(), content))
        })
        .collect()
}
