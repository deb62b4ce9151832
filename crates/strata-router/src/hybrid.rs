// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The hybrid backend: a local provider plus a remote documentation source.
//!
//! Metadata, catalogs and search always come from the local provider. Body
//! reads walk [`CHAIN`], an ordered list of `(predicate, handler)` links
//! evaluated against the attempt so far.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use strata_core::{
    BackendAdapter, BackendKind, Catalog, ContextProvider, DomainIndex, HealthStatus,
    KnowledgeReference, ScoredReference, StrataError,
};

use crate::remote::RemoteSource;
use crate::routes::{RouteMode, RouteTable};

/// State of one body read as it moves through the chain.
#[derive(Debug)]
struct Attempt {
    mode: RouteMode,
    body: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handler {
    /// Use the remote body as the answer.
    Remote,
    /// Use the local body as the answer.
    Local,
    /// Append the remote body to the answer.
    AppendRemote,
}

struct Link {
    name: &'static str,
    when: fn(&Attempt) -> bool,
    handler: Handler,
}

fn wants_remote_first(attempt: &Attempt) -> bool {
    attempt.mode == RouteMode::RemotePreferred && attempt.body.is_none()
}

fn unanswered(attempt: &Attempt) -> bool {
    attempt.body.is_none()
}

fn wants_merge(attempt: &Attempt) -> bool {
    attempt.mode == RouteMode::Merge && attempt.body.is_some()
}

const CHAIN: &[Link] = &[
    Link {
        name: "remote-preferred",
        when: wants_remote_first,
        handler: Handler::Remote,
    },
    Link {
        name: "local",
        when: unanswered,
        handler: Handler::Local,
    },
    Link {
        name: "merge",
        when: wants_merge,
        handler: Handler::AppendRemote,
    },
];

/// Concatenate local and remote bodies, separated by one blank line.
fn merge_bodies(local: &str, remote: &str) -> String {
    let mut out = String::with_capacity(local.len() + remote.len() + 2);
    out.push_str(local);
    if !out.is_empty() {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
    }
    out.push_str(remote);
    out
}

/// Serves a domain from a local provider and a remote source.
pub struct HybridProvider<L> {
    local: L,
    remote: Arc<dyn RemoteSource>,
    routes: RouteTable,
    timeout: Duration,
}

impl<L: ContextProvider> HybridProvider<L> {
    pub fn new(
        local: L,
        remote: Arc<dyn RemoteSource>,
        routes: RouteTable,
        timeout: Duration,
    ) -> Self {
        Self {
            local,
            remote,
            routes,
            timeout,
        }
    }

    pub fn local(&self) -> &L {
        &self.local
    }

    pub fn routes(&self) -> &RouteTable {
        &self.routes
    }

    /// One bounded remote read. Timeouts come back as `StrataError::Timeout`.
    async fn fetch_remote(&self, reference: &KnowledgeReference) -> Result<String, StrataError> {
        match tokio::time::timeout(
            self.timeout,
            self.remote.fetch(&reference.domain, &reference.file),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(StrataError::Timeout {
                duration: self.timeout,
            }),
        }
    }

    async fn remote_or_warn(&self, reference: &KnowledgeReference) -> Option<String> {
        match self.fetch_remote(reference).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(
                    id = %reference.id,
                    remote = self.remote.name(),
                    error = %e,
                    "remote read failed, using local content"
                );
                None
            }
        }
    }
}

#[async_trait]
impl<L: ContextProvider> BackendAdapter for HybridProvider<L> {
    fn name(&self) -> &str {
        "hybrid"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Hybrid
    }

    /// Reflects the local provider only; remote outages degrade, never fail.
    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        self.local.health_check().await
    }
}

#[async_trait]
impl<L: ContextProvider> ContextProvider for HybridProvider<L> {
    async fn get_catalog(&self, domain: Option<&str>) -> Result<Catalog, StrataError> {
        self.local.get_catalog(domain).await
    }

    async fn get_domain_index(&self, domain: &str) -> Result<DomainIndex, StrataError> {
        self.local.get_domain_index(domain).await
    }

    async fn get_loading_protocol(&self) -> Result<String, StrataError> {
        self.local.get_loading_protocol().await
    }

    async fn get_reference(
        &self,
        domain: &str,
        file: &str,
    ) -> Result<KnowledgeReference, StrataError> {
        self.local.get_reference(domain, file).await
    }

    async fn materialize(&self, reference: &KnowledgeReference) -> Result<String, StrataError> {
        let mut attempt = Attempt {
            mode: self.routes.mode_for(&reference.domain, &reference.file),
            body: None,
        };
        for link in CHAIN {
            if !(link.when)(&attempt) {
                continue;
            }
            debug!(id = %reference.id, mode = %attempt.mode, link = link.name, "routing body read");
            match link.handler {
                Handler::Remote => attempt.body = self.remote_or_warn(reference).await,
                Handler::Local => attempt.body = Some(self.local.materialize(reference).await?),
                Handler::AppendRemote => {
                    if let Some(remote) = self.remote_or_warn(reference).await {
                        let local = attempt.body.take().unwrap_or_default();
                        attempt.body = Some(merge_bodies(&local, &remote));
                    }
                }
            }
        }
        attempt.body.ok_or_else(|| {
            StrataError::Internal(format!("no route produced a body for {}", reference.id))
        })
    }

    async fn search(
        &self,
        query: &str,
        domain: Option<&str>,
    ) -> Result<Vec<ScoredReference>, StrataError> {
        self.local.search(query, domain).await
    }
}
