// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use strata_config::FilesConfig;
use strata_core::{BackendAdapter, BackendKind, Clock, HealthStatus, StrataError};
use tokio::sync::Mutex;

/// Knowledge and memory as markdown files on disk.
///
/// Nothing is held in memory between calls; every read goes to the
/// filesystem. Writes are serialised through one lock so a changeset's files
/// and its audit lines are not interleaved with another writer's.
pub struct FileBackend {
    pub(crate) context_dir: PathBuf,
    pub(crate) memory_dir: PathBuf,
    pub(crate) git_tracked: bool,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) write_lock: Mutex<()>,
}

impl FileBackend {
    pub fn new(config: &FilesConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_dirs(&config.context_dir, &config.memory_dir, clock)
            .with_git_tracked(config.git_tracked)
    }

    pub fn with_dirs(
        context_dir: impl AsRef<Path>,
        memory_dir: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            context_dir: context_dir.as_ref().to_path_buf(),
            memory_dir: memory_dir.as_ref().to_path_buf(),
            git_tracked: false,
            clock,
            write_lock: Mutex::new(()),
        }
    }

    /// Declare the memory tree version-controlled.
    pub fn with_git_tracked(mut self, git_tracked: bool) -> Self {
        self.git_tracked = git_tracked;
        self
    }

    pub fn context_dir(&self) -> &Path {
        &self.context_dir
    }

    pub fn memory_dir(&self) -> &Path {
        &self.memory_dir
    }
}

#[async_trait]
impl BackendAdapter for FileBackend {
    fn name(&self) -> &str {
        "files"
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Files
    }

    async fn health_check(&self) -> Result<HealthStatus, StrataError> {
        match tokio::fs::metadata(&self.context_dir).await {
            Ok(meta) if meta.is_dir() => Ok(HealthStatus::Healthy),
            Ok(_) => Ok(HealthStatus::Unhealthy(format!(
                "{} is not a directory",
                self.context_dir.display()
            ))),
            Err(e) => Ok(HealthStatus::Degraded(format!(
                "context directory {}: {e}",
                self.context_dir.display()
            ))),
        }
    }
}
