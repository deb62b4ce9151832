// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base trait shared by every backend.

use async_trait::async_trait;

use crate::error::StrataError;
use crate::types::{BackendKind, HealthStatus};

/// Identity and health of a storage backend.
#[async_trait]
pub trait BackendAdapter: Send + Sync + 'static {
    /// Human-readable name of this backend instance.
    fn name(&self) -> &str;

    /// Which variant of the closed backend set this is.
    fn kind(&self) -> BackendKind;

    /// Performs a health check and returns the backend's current status.
    async fn health_check(&self) -> Result<HealthStatus, StrataError>;
}
