// SPDX-FileCopyrightText: 2026 Strata Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use async_trait::async_trait;
use strata_core::StrataError;

/// A live documentation service.
///
/// Only the call boundary lives here; transports are supplied by the
/// embedding application.
#[async_trait]
pub trait RemoteSource: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// Body text of `domain/file`.
    async fn fetch(&self, domain: &str, file: &str) -> Result<String, StrataError>;
}
