// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Exit Code Management
//!
//! Standardized Unix exit codes following BSD `sysexits.h` conventions:
//!
//! - **0**: success
//! - **1**: general error
//! - **64-78**: specific error conditions
//! - **128+N**: fatal signal N
//!
//! Daemon setup failures (fork, lock, privilege drop) map onto the
//! `sysexits.h` range so init systems can tell configuration problems from
//! runtime crashes.

use std::fmt;

use crate::platform::PlatformError;

/// Exit codes following Unix conventions (BSD sysexits.h)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(i32)]
pub enum ExitCode {
    /// Successful termination (0)
    #[default]
    Success = 0,

    /// General error (1)
    Error = 1,

    /// Command line usage error (64)
    UsageError = 64,

    /// Input data was incorrect (65)
    DataError = 65,

    /// Cannot open input (66)
    NoInput = 66,

    /// Addressee unknown (67): the requested user does not exist
    NoUser = 67,

    /// Service unavailable (69): another instance holds the lock
    Unavailable = 69,

    /// Internal software error (70)
    Software = 70,

    /// System error, e.g. fork failed (71)
    OsError = 71,

    /// Cannot create output file (73): pid or lock file
    CantCreate = 73,

    /// Permission denied (77): privilege drop failed
    NoPermission = 77,

    /// Configuration error (78)
    ConfigError = 78,
}

impl ExitCode {
    /// Numeric value for `std::process::exit`
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<&PlatformError> for ExitCode {
    fn from(err: &PlatformError) -> Self {
        match err {
            PlatformError::ForkFailed(_) => ExitCode::OsError,
            PlatformError::SessionFailed(_) => ExitCode::OsError,
            PlatformError::LockBusy(_) => ExitCode::Unavailable,
            PlatformError::FileCreation(_) => ExitCode::CantCreate,
            PlatformError::UnknownUser(_) => ExitCode::NoUser,
            PlatformError::PrivilegeDrop(_) => ExitCode::NoPermission,
            PlatformError::Unsupported(_) => ExitCode::Software,
        }
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i32())
    }
}
