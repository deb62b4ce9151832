// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted remote documentation source.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use strata_core::{KnowledgeReference, StrataError};
use strata_router::RemoteSource;

/// How the mock answers the next fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteBehavior {
    /// Return the registered document, or `NotFound`.
    Serve,
    /// Fail every fetch with `BackendUnavailable`.
    Fail,
    /// Sleep before serving. Longer than the router timeout simulates a hang.
    Stall(Duration),
}

/// A `RemoteSource` with fixed documents and switchable failure modes.
pub struct MockRemote {
    docs: HashMap<String, String>,
    behavior: Mutex<RemoteBehavior>,
    calls: AtomicUsize,
}

impl MockRemote {
    pub fn new() -> Self {
        Self {
            docs: HashMap::new(),
            behavior: Mutex::new(RemoteBehavior::Serve),
            calls: AtomicUsize::new(0),
        }
    }

    /// Register the remote body of `domain/file`.
    pub fn with_doc(mut self, domain: &str, file: &str, body: impl Into<String>) -> Self {
        self.docs
            .insert(KnowledgeReference::make_id(domain, file), body.into());
        self
    }

    pub fn with_behavior(self, behavior: RemoteBehavior) -> Self {
        Self {
            behavior: Mutex::new(behavior),
            ..self
        }
    }

    pub async fn set_behavior(&self, behavior: RemoteBehavior) {
        *self.behavior.lock().await = behavior;
    }

    /// Fetches attempted so far, including failed ones.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockRemote {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteSource for MockRemote {
    fn name(&self) -> &str {
        "mock-remote"
    }

    async fn fetch(&self, domain: &str, file: &str) -> Result<String, StrataError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let behavior = self.behavior.lock().await.clone();
        match behavior {
            RemoteBehavior::Fail => {
                return Err(StrataError::BackendUnavailable {
                    backend: "mock-remote".into(),
                    message: "simulated outage".into(),
                    source: None,
                });
            }
            RemoteBehavior::Stall(delay) => tokio::time::sleep(delay).await,
            RemoteBehavior::Serve => {}
        }
        let id = KnowledgeReference::make_id(domain, file);
        self.docs
            .get(&id)
            .cloned()
            .ok_or_else(|| StrataError::knowledge_not_found(id))
    }
}
