// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Arbiter Metrics
//!
//! Prometheus instruments for the scheduling and synchronization pipeline:
//! round counters, round duration, per-round scheduling outcomes and the
//! worst observed synchronization latency. Every instrument lives in the
//! `tile_arbiter` namespace on a dedicated registry, exposed through
//! [`ArbiterMetrics::gather`] for whatever endpoint the embedder wires up.

use prometheus::{Gauge, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry};
use std::sync::Arc;
use tracing::debug;

use tile_arbiter_domain::ArbiterError;

const NAMESPACE: &str = "tile_arbiter";

/// Prometheus instruments of the arbiter.
#[derive(Clone)]
pub struct ArbiterMetrics {
    registry: Arc<Registry>,

    /// Completed scheduling rounds
    pub rounds_total: IntCounter,
    /// Aborted scheduling rounds
    pub rounds_failed_total: IntCounter,
    /// Wall-clock duration of one round
    pub round_duration_seconds: Histogram,
    /// Scheduling outcomes per round, labeled by kind
    /// (`scheduled`, `blocked`, `unchanged`)
    pub outcomes_total: IntCounterVec,
    /// Applications currently registered
    pub applications: IntGauge,
    /// Synchronization passes completed
    pub sync_passes_total: IntCounter,
    /// Worst reconfiguration latency observed in the last round
    pub sync_worst_latency_ms: Gauge,
}

impl ArbiterMetrics {
    /// Create and register every instrument.
    pub fn new() -> Result<Self, ArbiterError> {
        let registry = Registry::new();

        let rounds_total = IntCounter::with_opts(
            Opts::new("rounds_total", "Completed scheduling rounds").namespace(NAMESPACE),
        )
        .map_err(|e| ArbiterError::metrics_error(format!("Failed to create rounds_total: {}", e)))?;

        let rounds_failed_total = IntCounter::with_opts(
            Opts::new("rounds_failed_total", "Aborted scheduling rounds").namespace(NAMESPACE),
        )
        .map_err(|e| {
            ArbiterError::metrics_error(format!("Failed to create rounds_failed_total: {}", e))
        })?;

        let round_duration_seconds = Histogram::with_opts(
            HistogramOpts::new("round_duration_seconds", "Scheduling round duration")
                .namespace(NAMESPACE)
                .buckets(vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
        )
        .map_err(|e| {
            ArbiterError::metrics_error(format!("Failed to create round_duration_seconds: {}", e))
        })?;

        let outcomes_total = IntCounterVec::new(
            Opts::new("outcomes_total", "Scheduling outcomes by kind").namespace(NAMESPACE),
            &["kind"],
        )
        .map_err(|e| {
            ArbiterError::metrics_error(format!("Failed to create outcomes_total: {}", e))
        })?;

        let applications = IntGauge::with_opts(
            Opts::new("applications", "Registered applications").namespace(NAMESPACE),
        )
        .map_err(|e| ArbiterError::metrics_error(format!("Failed to create applications: {}", e)))?;

        let sync_passes_total = IntCounter::with_opts(
            Opts::new("sync_passes_total", "Completed synchronization passes").namespace(NAMESPACE),
        )
        .map_err(|e| {
            ArbiterError::metrics_error(format!("Failed to create sync_passes_total: {}", e))
        })?;

        let sync_worst_latency_ms = Gauge::with_opts(
            Opts::new(
                "sync_worst_latency_ms",
                "Worst reconfiguration latency in the last round",
            )
            .namespace(NAMESPACE),
        )
        .map_err(|e| {
            ArbiterError::metrics_error(format!("Failed to create sync_worst_latency_ms: {}", e))
        })?;

        for collector in [
            Box::new(rounds_total.clone()) as Box<dyn prometheus::core::Collector>,
            Box::new(rounds_failed_total.clone()),
            Box::new(round_duration_seconds.clone()),
            Box::new(outcomes_total.clone()),
            Box::new(applications.clone()),
            Box::new(sync_passes_total.clone()),
            Box::new(sync_worst_latency_ms.clone()),
        ] {
            registry
                .register(collector)
                .map_err(|e| ArbiterError::metrics_error(format!("Failed to register: {}", e)))?;
        }

        debug!("arbiter metrics initialized");
        Ok(ArbiterMetrics {
            registry: Arc::new(registry),
            rounds_total,
            rounds_failed_total,
            round_duration_seconds,
            outcomes_total,
            applications,
            sync_passes_total,
            sync_worst_latency_ms,
        })
    }

    /// Gather the current metric families for exposition.
    pub fn gather(&self) -> Vec<prometheus::proto::MetricFamily> {
        self.registry.gather()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruments_register_and_gather() {
        let metrics = ArbiterMetrics::new().unwrap();
        metrics.rounds_total.inc();
        metrics.outcomes_total.with_label_values(&["scheduled"]).inc();
        metrics.sync_worst_latency_ms.set(12.0);

        let families = metrics.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "tile_arbiter_rounds_total"));
    }
}
