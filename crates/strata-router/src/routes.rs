// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static `(domain, file)` to route mode table.

use std::collections::HashMap;

use strata_config::RemoteConfig;
use strata_core::StrataError;
use strum::{Display, EnumString};

/// How reads of one file are satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum RouteMode {
    /// Try the remote source, fall back to local on any failure.
    RemotePreferred,
    /// Never contact the remote source.
    #[default]
    LocalOnly,
    /// Always read local, then append the remote body when available.
    Merge,
}

/// Route lookup. Files without a row are local-only.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: HashMap<(String, String), RouteMode>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from the `[remote]` config section. Unknown modes are rejected.
    pub fn from_config(config: &RemoteConfig) -> Result<Self, StrataError> {
        let mut table = Self::new();
        for route in &config.routes {
            let mode: RouteMode = route.mode.parse().map_err(|_| {
                StrataError::Config(format!(
                    "unknown route mode `{}` for {}/{}",
                    route.mode, route.domain, route.file
                ))
            })?;
            table.insert(&route.domain, &route.file, mode);
        }
        Ok(table)
    }

    pub fn with_route(mut self, domain: &str, file: &str, mode: RouteMode) -> Self {
        self.insert(domain, file, mode);
        self
    }

    pub fn insert(&mut self, domain: &str, file: &str, mode: RouteMode) {
        self.routes
            .insert((domain.to_string(), file.to_string()), mode);
    }

    pub fn mode_for(&self, domain: &str, file: &str) -> RouteMode {
        self.routes
            .get(&(domain.to_string(), file.to_string()))
            .copied()
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_config::RouteConfig;

    #[test]
    fn unrouted_files_are_local_only() {
        let table = RouteTable::new().with_route("azure", "functions", RouteMode::Merge);
        assert_eq!(table.mode_for("azure", "functions"), RouteMode::Merge);
        assert_eq!(table.mode_for("azure", "storage"), RouteMode::LocalOnly);
    }

    #[test]
    fn builds_from_config() {
        let config = RemoteConfig {
            timeout_ms: 100,
            routes: vec![RouteConfig {
                domain: "azure".into(),
                file: "functions".into(),
                mode: "remote-preferred".into(),
            }],
        };
        let table = RouteTable::from_config(&config).unwrap();
        assert_eq!(table.mode_for("azure", "functions"), RouteMode::RemotePreferred);
    }

    #[test]
    fn rejects_unknown_mode() {
        let config = RemoteConfig {
            timeout_ms: 100,
            routes: vec![RouteConfig {
                domain: "azure".into(),
                file: "functions".into(),
                mode: "sometimes".into(),
            }],
        };
        assert!(matches!(
            RouteTable::from_config(&config),
            Err(StrataError::Config(_))
        ));
    }

    #[test]
    fn mode_names_match_config_vocabulary() {
        for name in strata_config::validation::ROUTE_MODES {
            assert!(name.parse::<RouteMode>().is_ok(), "{name}");
        }
        assert_eq!(RouteMode::RemotePreferred.to_string(), "remote-preferred");
    }
}
