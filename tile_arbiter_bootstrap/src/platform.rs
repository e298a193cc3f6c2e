// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Platform Abstraction
//!
//! Daemonization and privilege management behind a platform-neutral
//! surface. The Unix implementation performs the classic double fork,
//! detaches from the controlling terminal, takes the instance lock, writes
//! the pid file and optionally drops privileges; other platforms report
//! `Unsupported`.

use std::path::PathBuf;
use thiserror::Error;

#[cfg(unix)]
pub mod unix;

/// Everything `daemonize` needs to know.
#[derive(Debug, Clone)]
pub struct DaemonContext {
    /// Daemon name, for diagnostics
    pub name: String,
    /// Drop privileges to this user after setup
    pub user: Option<String>,
    /// Lock file guarding against concurrent instances
    pub lockfile: PathBuf,
    /// File the daemon pid is written into
    pub pidfile: PathBuf,
    /// Working directory after detaching
    pub rundir: PathBuf,
}

/// Daemon setup failures.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// `fork(2)` failed
    #[error("fork failed: {0}")]
    ForkFailed(String),

    /// `setsid(2)` failed
    #[error("session creation failed: {0}")]
    SessionFailed(String),

    /// Another instance holds the lock file
    #[error("lock unavailable: {0}")]
    LockBusy(String),

    /// Pid or lock file could not be created
    #[error("file creation failed: {0}")]
    FileCreation(String),

    /// The privilege-drop user does not exist
    #[error("unknown user: {0}")]
    UnknownUser(String),

    /// Dropping privileges failed
    #[error("privilege drop failed: {0}")]
    PrivilegeDrop(String),

    /// Daemonization is not supported on this platform
    #[error("unsupported platform: {0}")]
    Unsupported(String),
}

/// Detach the current process and run it as a daemon.
///
/// On success the caller continues inside the daemonized process; the
/// intermediate parents have already exited.
#[cfg(unix)]
pub fn daemonize(context: &DaemonContext) -> Result<(), PlatformError> {
    unix::daemonize(context)
}

/// Detach the current process and run it as a daemon.
#[cfg(not(unix))]
pub fn daemonize(_context: &DaemonContext) -> Result<(), PlatformError> {
    Err(PlatformError::Unsupported(
        "daemonization requires a POSIX platform".to_string(),
    ))
}
