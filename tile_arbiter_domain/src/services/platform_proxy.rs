// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Proxy Port
//!
//! The synchronization driver applies scheduling decisions through this
//! port; the concrete backend (Linux control groups, a simulator, a test
//! double) lives in the infrastructure layer.
//!
//! Contract notes:
//!
//! - `setup` is called once when an application enters the system,
//!   `release` once when it leaves.
//! - `reclaim` withdraws every resource currently assigned to the
//!   application and must be idempotent: reclaiming an application that
//!   holds nothing is a no-op.
//! - `map` applies the committed usages of a view; it may block on I/O and
//!   fails with `MappingFailed` when the platform rejects the assignment.

use async_trait::async_trait;

use crate::entities::application::AppRef;
use crate::entities::usage::UsagesMap;
use crate::error::ArbiterError;
use crate::value_objects::view_token::ViewToken;

/// Applies resource assignments on the target platform.
#[async_trait]
pub trait PlatformProxy: Send + Sync {
    /// Prepare platform-specific data for a newly registered application
    async fn setup(&self, app: &AppRef) -> Result<(), ArbiterError>;

    /// Release platform-specific data for a departing application
    async fn release(&self, app: &AppRef) -> Result<(), ArbiterError>;

    /// Withdraw every resource assigned to the application (idempotent)
    async fn reclaim(&self, app: &AppRef) -> Result<(), ArbiterError>;

    /// Apply the committed usages for the application under the given view.
    ///
    /// `exclusive` requests an exclusive partition where the platform
    /// supports it.
    async fn map(
        &self,
        app: &AppRef,
        usages: &UsagesMap,
        view: ViewToken,
        exclusive: bool,
    ) -> Result<(), ArbiterError>;
}
