// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tracing subscriber setup for the binary.

use strata_config::LoggingConfig;
use strata_core::StrataError;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset: the configured level for every
/// `strata*` target, `warn` for dependencies.
pub fn default_directive(level: &str) -> String {
    format!("strata={level},warn")
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
pub fn init_tracing(config: &LoggingConfig) -> Result<(), StrataError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(&config.level)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .with_writer(std::io::stderr);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    result.map_err(|e| StrataError::Internal(format!("tracing init failed: {e}")))
}
