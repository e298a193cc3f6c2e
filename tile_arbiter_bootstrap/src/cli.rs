// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Command-Line Interface
//!
//! Argument parsing for the arbiter daemon. Runtime behavior (platform
//! layout, policy weights, logging) lives in the configuration file; the
//! command line only selects that file and the daemonization parameters.

use clap::Parser;
use std::path::PathBuf;

/// The tile arbiter run-time resource manager.
#[derive(Debug, Clone, Parser)]
#[command(name = "tile_arbiter", version, about, long_about = None)]
pub struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Detach from the terminal and run as a daemon
    #[arg(short, long)]
    pub daemon: bool,

    /// Daemon name, used for pid/lock file defaults
    #[arg(long, default_value = "tile-arbiter")]
    pub name: String,

    /// Drop privileges to this user after setup (daemon mode)
    #[arg(long)]
    pub user: Option<String>,

    /// Lock file guarding against concurrent daemon instances
    #[arg(long, value_name = "FILE")]
    pub lockfile: Option<PathBuf>,

    /// File the daemon writes its pid into
    #[arg(long, value_name = "FILE")]
    pub pidfile: Option<PathBuf>,

    /// Working directory of the daemon
    #[arg(long, value_name = "DIR", default_value = "/var/run")]
    pub rundir: PathBuf,
}

impl Cli {
    /// Effective lock file path (defaults beside the run directory)
    pub fn lockfile_path(&self) -> PathBuf {
        self.lockfile
            .clone()
            .unwrap_or_else(|| self.rundir.join(format!("{}.lock", self.name)))
    }

    /// Effective pid file path (defaults beside the run directory)
    pub fn pidfile_path(&self) -> PathBuf {
        self.pidfile
            .clone()
            .unwrap_or_else(|| self.rundir.join(format!("{}.pid", self.name)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["tile_arbiter"]);
        assert!(!cli.daemon);
        assert_eq!(cli.name, "tile-arbiter");
        assert_eq!(cli.lockfile_path(), PathBuf::from("/var/run/tile-arbiter.lock"));
        assert_eq!(cli.pidfile_path(), PathBuf::from("/var/run/tile-arbiter.pid"));
    }

    #[test]
    fn test_explicit_paths_win() {
        let cli = Cli::parse_from([
            "tile_arbiter",
            "--daemon",
            "--pidfile",
            "/tmp/a.pid",
            "--lockfile",
            "/tmp/a.lock",
        ]);
        assert!(cli.daemon);
        assert_eq!(cli.pidfile_path(), PathBuf::from("/tmp/a.pid"));
        assert_eq!(cli.lockfile_path(), PathBuf::from("/tmp/a.lock"));
    }
}
