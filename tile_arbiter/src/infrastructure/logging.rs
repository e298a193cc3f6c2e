// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Infrastructure Logging
//!
//! Structured logging for the daemon, built on `tracing`. The subscriber is
//! installed once at startup; components log through the `tracing` macros
//! with structured fields (application, token, resource path) so scheduling
//! rounds stay reconstructable from the log stream.
//!
//! Two output formats:
//!
//! - human-readable console lines for interactive runs
//! - JSON for production log aggregation

use tracing_subscriber::{fmt, EnvFilter};

use tile_arbiter_domain::ArbiterError;

use crate::infrastructure::config::LoggingConfig;

/// Install the global tracing subscriber.
///
/// Idempotence: a second installation attempt (tests, embedding) is
/// reported as a configuration error by the subscriber and mapped
/// accordingly.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ArbiterError> {
    let filter = EnvFilter::try_new(&config.level)
        .map_err(|err| ArbiterError::configuration_error(format!("log filter: {}", err)))?;

    let builder = fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false);

    let result = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|err| ArbiterError::configuration_error(format!("log subscriber: {}", err)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_rejected() {
        let config = LoggingConfig {
            level: "not==a==filter".to_string(),
            json: false,
        };
        assert!(init_logging(&config).is_err());
    }
}
