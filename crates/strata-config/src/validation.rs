// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation. Collects every error instead of failing fast.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::StrataConfig;

/// Route modes accepted in `[[remote.routes]]`.
pub const ROUTE_MODES: &[&str] = &["remote-preferred", "local-only", "merge"];

/// Validate semantic constraints serde cannot express.
pub fn validate_config(config: &StrataConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    for (name, value) in [
        ("files.context_dir", &config.files.context_dir),
        ("files.memory_dir", &config.files.memory_dir),
        ("storage.database_path", &config.storage.database_path),
    ] {
        if value.trim().is_empty() {
            errors.push(ConfigError::validation(format!("{name} must not be empty")));
        }
    }

    if config.vector.dimensions == 0 {
        errors.push(ConfigError::validation("vector.dimensions must be greater than 0"));
    }
    let threshold = config.vector.similarity_threshold;
    if !(0.0..=1.0).contains(&threshold) {
        errors.push(ConfigError::validation(format!(
            "vector.similarity_threshold must be within 0.0..=1.0, got {threshold}"
        )));
    }

    let pruning = &config.pruning;
    for (name, value) in [
        ("pruning.review_history_keep", pruning.review_history_keep),
        ("pruning.session_keep", pruning.session_keep),
        ("pruning.default_line_budget", pruning.default_line_budget),
    ] {
        if value < 1 {
            errors.push(ConfigError::validation(format!("{name} must be at least 1")));
        }
    }
    for (name, value) in [
        ("pruning.resolved_retention_days", pruning.resolved_retention_days),
        ("pruning.verification_after_days", pruning.verification_after_days),
    ] {
        if value < 0 {
            errors.push(ConfigError::validation(format!(
                "{name} must be non-negative, got {value}"
            )));
        }
    }
    for (file_type, budget) in &pruning.line_budgets {
        if *budget < 1 {
            errors.push(ConfigError::validation(format!(
                "pruning.line_budgets.{file_type} must be at least 1"
            )));
        }
    }

    if config.remote.timeout_ms == 0 {
        errors.push(ConfigError::validation("remote.timeout_ms must be greater than 0"));
    }

    let mut seen = HashSet::new();
    for (i, route) in config.remote.routes.iter().enumerate() {
        if route.domain.trim().is_empty() || route.file.trim().is_empty() {
            errors.push(ConfigError::validation(format!(
                "remote.routes[{i}] must name a domain and a file"
            )));
        }
        if !ROUTE_MODES.contains(&route.mode.as_str()) {
            errors.push(ConfigError::validation(format!(
                "remote.routes[{i}].mode `{}` is not one of {}",
                route.mode,
                ROUTE_MODES.join(", ")
            )));
        }
        if !seen.insert((route.domain.as_str(), route.file.as_str())) {
            errors.push(ConfigError::validation(format!(
                "duplicate route for `{}/{}`",
                route.domain, route.file
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RouteConfig;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        assert!(validate_config(&StrataConfig::default()).is_ok());
    }

    #[test]
    fn collects_every_error() {
        let mut config = StrataConfig::default();
        config.files.memory_dir = " ".into();
        config.vector.dimensions = 0;
        config.vector.similarity_threshold = 1.5;
        config.remote.timeout_ms = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(has_error(&errors, "files.memory_dir"));
        assert!(has_error(&errors, "similarity_threshold"));
    }

    #[test]
    fn rejects_bad_and_duplicate_routes() {
        let mut config = StrataConfig::default();
        let route = |mode: &str| RouteConfig {
            domain: "azure".into(),
            file: "functions".into(),
            mode: mode.into(),
        };
        config.remote.routes = vec![route("merge"), route("remote-first")];
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "remote-first"));
        assert!(has_error(&errors, "duplicate route"));
    }

    #[test]
    fn zero_keep_count_fails() {
        let mut config = StrataConfig::default();
        config.pruning.review_history_keep = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "review_history_keep"));
    }
}
