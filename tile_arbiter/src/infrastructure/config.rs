// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Arbiter Configuration
//!
//! Configuration for the whole daemon, loaded from an optional TOML file
//! with `ARBITER_`-prefixed environment overrides layered on top, then
//! validated before any component is built.
//!
//! ## Example Configuration File
//!
//! ```toml
//! [platform]
//! resources = [
//!     { path = "tile0.cluster0.pe0", total = 100 },
//!     { path = "tile0.cluster0.mem0", total = 4096 },
//! ]
//!
//! [scheduler]
//! weight_awmvalue = 20
//! weight_reconfig = 5
//! weight_congestion = 5
//! weight_fairness = 18
//! msl_pe = 90
//! msl_mem = 70
//! migfact = 4
//! expbase = 2
//! parallel = false
//!
//! [runtime]
//! recipe_dir = "/etc/tile-arbiter/recipes"
//! period_ms = 0          # 0 = on-demand rescheduling only
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use serde::Deserialize;
use std::path::Path;

use tile_arbiter_domain::ArbiterError;

use crate::infrastructure::scheduling::contrib::ContribParams;
use crate::infrastructure::scheduling::policy::YamsConfig;

/// One platform resource declaration.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceDecl {
    /// Fully indexed resource path
    pub path: String,
    /// Total capacity
    pub total: u64,
}

/// Platform description section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlatformConfig {
    /// Registered resources; hardware discovery is a collaborator concern,
    /// so the platform layout arrives declaratively
    #[serde(default)]
    pub resources: Vec<ResourceDecl>,
}

/// Scheduling policy section; percentages are integers in `0..=100`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub weight_awmvalue: u16,
    pub weight_reconfig: u16,
    pub weight_congestion: u16,
    pub weight_fairness: u16,
    pub msl_pe: u8,
    pub msl_mem: u8,
    pub migfact: u16,
    pub expbase: u16,
    pub congestion_penalty_pe: u8,
    pub congestion_penalty_mem: u8,
    pub fairness_penalty_pe: u8,
    pub fairness_penalty_mem: u8,
    pub parallel: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            weight_awmvalue: 20,
            weight_reconfig: 5,
            weight_congestion: 5,
            weight_fairness: 18,
            msl_pe: 90,
            msl_mem: 70,
            migfact: 4,
            expbase: 2,
            congestion_penalty_pe: 75,
            congestion_penalty_mem: 50,
            fairness_penalty_pe: 5,
            fairness_penalty_mem: 5,
            parallel: false,
        }
    }
}

/// Runtime section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Directory holding `<name>.recipe` files
    pub recipe_dir: String,
    /// Periodic rescheduling interval; `0` keeps the arbiter on-demand
    pub period_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            recipe_dir: "/etc/tile-arbiter/recipes".to_string(),
            period_ms: 0,
        }
    }
}

/// Logging section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Tracing filter directive (e.g. `info`, `tile_arbiter=debug`)
    pub level: String,
    /// Emit JSON-formatted logs
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// The full arbiter configuration tree.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ArbiterConfig {
    pub platform: PlatformConfig,
    pub scheduler: SchedulerConfig,
    pub runtime: RuntimeConfig,
    pub logging: LoggingConfig,
}

impl ArbiterConfig {
    /// Load the configuration: defaults, then the optional file, then
    /// `ARBITER_<SECTION>__<KEY>` environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ArbiterError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix("ARBITER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|err| ArbiterError::configuration_error(err.to_string()))?;

        let config: ArbiterConfig = settings
            .try_deserialize()
            .map_err(|err| ArbiterError::configuration_error(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field consistency.
    pub fn validate(&self) -> Result<(), ArbiterError> {
        let scheduler = &self.scheduler;
        for (name, percent) in [
            ("msl_pe", scheduler.msl_pe),
            ("msl_mem", scheduler.msl_mem),
            ("congestion_penalty_pe", scheduler.congestion_penalty_pe),
            ("congestion_penalty_mem", scheduler.congestion_penalty_mem),
            ("fairness_penalty_pe", scheduler.fairness_penalty_pe),
            ("fairness_penalty_mem", scheduler.fairness_penalty_mem),
        ] {
            if percent > 100 {
                return Err(ArbiterError::configuration_error(format!(
                    "scheduler.{} = {} out of range [0, 100]",
                    name, percent
                )));
            }
        }
        if scheduler.expbase < 2 {
            return Err(ArbiterError::configuration_error(format!(
                "scheduler.expbase = {} must be at least 2",
                scheduler.expbase
            )));
        }
        let weight_sum = scheduler.weight_awmvalue
            + scheduler.weight_reconfig
            + scheduler.weight_congestion
            + scheduler.weight_fairness;
        if weight_sum == 0 {
            return Err(ArbiterError::configuration_error(
                "every scheduler contribution weight is zero",
            ));
        }
        Ok(())
    }

    /// Project the scheduler section into the policy configuration.
    pub fn yams(&self) -> YamsConfig {
        let scheduler = &self.scheduler;
        YamsConfig {
            weight_awmvalue: scheduler.weight_awmvalue,
            weight_reconfig: scheduler.weight_reconfig,
            weight_congestion: scheduler.weight_congestion,
            weight_fairness: scheduler.weight_fairness,
            parallel: scheduler.parallel,
            params: ContribParams {
                msl_pe: f32::from(scheduler.msl_pe) / 100.0,
                msl_mem: f32::from(scheduler.msl_mem) / 100.0,
                migfact: f32::from(scheduler.migfact),
                expbase: f32::from(scheduler.expbase),
                congestion_penalty_pe: f32::from(scheduler.congestion_penalty_pe) / 100.0,
                congestion_penalty_mem: f32::from(scheduler.congestion_penalty_mem) / 100.0,
                fairness_penalty_pe: f32::from(scheduler.fairness_penalty_pe) / 100.0,
                fairness_penalty_mem: f32::from(scheduler.fairness_penalty_mem) / 100.0,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ArbiterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.migfact, 4);
        assert_eq!(config.scheduler.msl_pe, 90);
        assert_eq!(config.scheduler.msl_mem, 70);
    }

    #[test]
    fn test_out_of_range_percent_rejected() {
        let mut config = ArbiterConfig::default();
        config.scheduler.msl_pe = 130;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_weights_rejected() {
        let mut config = ArbiterConfig::default();
        config.scheduler.weight_awmvalue = 0;
        config.scheduler.weight_reconfig = 0;
        config.scheduler.weight_congestion = 0;
        config.scheduler.weight_fairness = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_yams_projection_scales_percentages() {
        let config = ArbiterConfig::default();
        let yams = config.yams();
        assert!((yams.params.msl_pe - 0.9).abs() < 1e-6);
        assert!((yams.params.congestion_penalty_mem - 0.5).abs() < 1e-6);
        assert_eq!(yams.params.migfact, 4.0);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arbiter.toml");
        std::fs::write(
            &path,
            r#"
            [platform]
            resources = [
                { path = "tile0.cluster0.pe0", total = 100 },
            ]

            [scheduler]
            migfact = 8

            [runtime]
            period_ms = 250
            "#,
        )
        .unwrap();

        let config = ArbiterConfig::load(Some(&path)).unwrap();
        assert_eq!(config.platform.resources.len(), 1);
        assert_eq!(config.scheduler.migfact, 8);
        assert_eq!(config.runtime.period_ms, 250);
        // Untouched sections keep their defaults
        assert_eq!(config.scheduler.msl_mem, 70);
    }
}
