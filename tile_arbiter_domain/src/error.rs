// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Arbiter Error Types
//!
//! This module defines the single error type used across every layer of the
//! arbiter. All fallible operations - registry lookups, accounting, resource
//! binding, recipe loading, synchronization - report failures through
//! [`ArbiterError`], so error handling stays uniform from the domain core up
//! to the daemon binary.
//!
//! ## Error Categories
//!
//! - **Registry**: `NoMemory`, `NotFound`, `AlreadyExists`
//! - **Accounting**: `UnknownView`, `UsageExceeded`, `AppMismatch`,
//!   `AppUsages`, `MissUsages`, `MissAwm`
//! - **Binding**: `MappingFailed`, `IncompleteBind`
//! - **Recipe**: `FormatError`, `WeakLoad`
//! - **Synchronization**: `Timeout`, `Violation`
//! - **Ambient**: `InvalidParameter`, `ConfigurationError`, `MetricsError`,
//!   `IoError`, `Internal`
//!
//! ## Propagation Policy
//!
//! The accounter always reports and never corrupts: a failed reservation
//! leaves no partial state behind. The scheduler recovers locally from
//! `UsageExceeded`, `IncompleteBind` and `MappingFailed` by skipping the
//! candidate, and aborts the round on `NoMemory` or `Internal`. The
//! synchronization driver demotes a single application on `Violation` and
//! aborts the round on `Internal`, leaving the previous system view active.

use thiserror::Error;

/// Unified error type for all arbiter operations.
///
/// Variants carry a human-readable detail string; the variant itself is the
/// machine-readable classification callers dispatch on.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArbiterError {
    // ------------------------------------------------------------------
    // Registry-level errors
    // ------------------------------------------------------------------
    /// A new descriptor, view or container could not be allocated
    #[error("Allocation failed: {0}")]
    NoMemory(String),

    /// The named entity is not registered
    #[error("Not found: {0}")]
    NotFound(String),

    /// Registration attempted over an existing entry
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    // ------------------------------------------------------------------
    // Accounter-level errors
    // ------------------------------------------------------------------
    /// The token does not reference a live resource state view
    #[error("Unknown resource state view: {0}")]
    UnknownView(u32),

    /// A reservation could not be satisfied by the available resources
    #[error("Resource usage exceeds availability: {0}")]
    UsageExceeded(String),

    /// An operation referenced an application other than the recorded owner
    #[error("Application mismatch: {0}")]
    AppMismatch(String),

    /// The application already holds usages committed under this view
    #[error("Application already accounted in view: {0}")]
    AppUsages(String),

    /// No usages were supplied or recorded for the application
    #[error("Missing resource usages: {0}")]
    MissUsages(String),

    /// The application has no working mode where one is required
    #[error("Missing working mode: {0}")]
    MissAwm(String),

    // ------------------------------------------------------------------
    // Binding-level errors
    // ------------------------------------------------------------------
    /// The platform backend could not map the assigned resources
    #[error("Resource mapping failed: {0}")]
    MappingFailed(String),

    /// One or more resource requests could not be bound to descriptors
    #[error("Incomplete resource binding: {0}")]
    IncompleteBind(String),

    // ------------------------------------------------------------------
    // Recipe-level errors
    // ------------------------------------------------------------------
    /// The recipe file exists but could not be parsed or validated
    #[error("Recipe format error: {0}")]
    FormatError(String),

    /// The recipe is valid but some requests cannot be resolved on this
    /// platform
    #[error("Recipe loaded with unresolved requests: {0}")]
    WeakLoad(String),

    // ------------------------------------------------------------------
    // Synchronization-level errors
    // ------------------------------------------------------------------
    /// A synchronization step did not complete in time
    #[error("Synchronization timeout: {0}")]
    Timeout(String),

    /// An application exceeded its reconfiguration latency ceiling
    #[error("Synchronization latency violation: {0}")]
    Violation(String),

    // ------------------------------------------------------------------
    // Ambient errors
    // ------------------------------------------------------------------
    /// A value object or argument failed validation
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The configuration is missing, malformed or inconsistent
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// A metrics instrument could not be created or registered
    #[error("Metrics error: {0}")]
    MetricsError(String),

    /// An I/O operation failed (recipe files, pid files, sockets)
    #[error("I/O error: {0}")]
    IoError(String),

    /// An internal invariant was violated at runtime
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ArbiterError {
    /// Create a `NoMemory` error with context
    pub fn no_memory<S: Into<String>>(message: S) -> Self {
        ArbiterError::NoMemory(message.into())
    }

    /// Create a `NotFound` error with context
    pub fn not_found<S: Into<String>>(message: S) -> Self {
        ArbiterError::NotFound(message.into())
    }

    /// Create an `AlreadyExists` error with context
    pub fn already_exists<S: Into<String>>(message: S) -> Self {
        ArbiterError::AlreadyExists(message.into())
    }

    /// Create a `UsageExceeded` error with context
    pub fn usage_exceeded<S: Into<String>>(message: S) -> Self {
        ArbiterError::UsageExceeded(message.into())
    }

    /// Create an `IncompleteBind` error with context
    pub fn incomplete_bind<S: Into<String>>(message: S) -> Self {
        ArbiterError::IncompleteBind(message.into())
    }

    /// Create an `InvalidParameter` error with context
    pub fn invalid_parameter<S: Into<String>>(message: S) -> Self {
        ArbiterError::InvalidParameter(message.into())
    }

    /// Create a `ConfigurationError` with context
    pub fn configuration_error<S: Into<String>>(message: S) -> Self {
        ArbiterError::ConfigurationError(message.into())
    }

    /// Create a `MetricsError` with context
    pub fn metrics_error<S: Into<String>>(message: S) -> Self {
        ArbiterError::MetricsError(message.into())
    }

    /// Create an `Internal` error with context
    pub fn internal<S: Into<String>>(message: S) -> Self {
        ArbiterError::Internal(message.into())
    }

    /// Whether the scheduler may recover from this error by skipping the
    /// current candidate and moving on with the round.
    pub fn is_candidate_recoverable(&self) -> bool {
        matches!(
            self,
            ArbiterError::UsageExceeded(_)
                | ArbiterError::IncompleteBind(_)
                | ArbiterError::MappingFailed(_)
                | ArbiterError::AppUsages(_)
        )
    }
}

impl From<std::io::Error> for ArbiterError {
    fn from(err: std::io::Error) -> Self {
        ArbiterError::IoError(err.to_string())
    }
}
