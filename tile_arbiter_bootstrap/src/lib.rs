// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tile Arbiter Bootstrap
//!
//! Entry-point glue for the arbiter daemon, kept apart from the application
//! logic so the `main` function stays a thin composition root:
//!
//! - [`cli`] - command-line parsing
//! - [`platform`] - daemonization, pid/lock files, privilege drop
//! - [`signals`] - SIGTERM/SIGINT handling
//! - [`shutdown`] - cancellation tokens and graceful-shutdown coordination
//! - [`logger`] - the minimal bootstrap-phase logging facade
//! - [`exit_code`] - POSIX exit-code conventions

pub mod cli;
pub mod exit_code;
pub mod logger;
pub mod platform;
pub mod shutdown;
pub mod signals;

pub use cli::Cli;
pub use exit_code::ExitCode;
pub use logger::{BootstrapLogger, ConsoleLogger};
pub use platform::{daemonize, DaemonContext, PlatformError};
pub use shutdown::{CancellationToken, ShutdownCoordinator};
