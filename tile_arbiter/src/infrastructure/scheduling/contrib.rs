// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scheduling Contribution Framework
//!
//! The scheduling policy bases its decisions on a modular metrics: several
//! independent *contributions*, each an index in `[0, 1]` capturing one
//! aspect of the impact of scheduling an application in a given working mode
//! with its resources bound into a given cluster - the static value of the
//! working mode, reconfiguration and migration cost, resource congestion,
//! fairness across same-priority applications.
//!
//! The framework carries what the contributions share:
//!
//! - an [`EvalContext`] with the accounter view under evaluation
//! - per-resource-type *Maximum Saturation Levels* (soft caps)
//! - the [`ResourceThresholds`] helper splitting a descriptor set into
//!   total / used / free / saturation headroom
//! - the Constant-Linear-Exponential ([`cle_index`]) filter shared by the
//!   congestion and fairness indices
//! - weight normalization and the aggregation loop ([`ContribSet`])
//!
//! Contributions are registered statically by configuration-declared name
//! through [`build_contribution`].

pub mod congestion;
pub mod fairness;
pub mod reconfig;
pub mod value;

use std::sync::Arc;
use tracing::trace;

use tile_arbiter_domain::{ArbiterError, Priority, Resource, ViewToken};

use crate::infrastructure::registry::application_registry::ApplicationRegistry;
use crate::infrastructure::accounting::accounter::ResourceAccounter;
use crate::infrastructure::scheduling::entity::SchedEntity;

use congestion::Congestion;
use fairness::Fairness;
use reconfig::Reconfig;
use value::AwmValue;

/// Shared state every contribution evaluates against.
pub struct EvalContext<'a> {
    /// The accounter holding the view under evaluation
    pub accounter: &'a ResourceAccounter,
    /// The application registry (per-priority population counts)
    pub apps: &'a ApplicationRegistry,
    /// The scheduling view token
    pub token: ViewToken,
}

/// Why a contribution could not produce an index.
#[derive(Debug)]
pub enum ContribError {
    /// The bound cluster has no processing elements left; the policy marks
    /// the cluster full and stops evaluating candidates in it
    NoProcessingElements,
    /// Some requested resource is unavailable; the candidate scores zero
    ResourceUnavailable,
    /// Evaluation failed outright
    Failed(ArbiterError),
}

/// One scheduling metrics contribution.
pub trait SchedContrib: Send + Sync {
    /// Configuration-declared name of the contribution
    fn name(&self) -> &'static str;

    /// Per-round hook, called once per priority class before scoring it.
    fn init(&self, _ctx: &EvalContext<'_>, _priority: Priority) -> Result<(), ArbiterError> {
        Ok(())
    }

    /// Compute the index in `[0, 1]` for one candidate.
    fn compute(&self, ctx: &EvalContext<'_>, entity: &SchedEntity) -> Result<f32, ContribError>;
}

// ----------------------------------------------------------------------
// Shared parameters
// ----------------------------------------------------------------------

/// Tunables shared by the built-in contributions, with the reference
/// defaults.
#[derive(Debug, Clone)]
pub struct ContribParams {
    /// Maximum Saturation Level for processing elements, `[0, 1]`
    pub msl_pe: f32,
    /// Maximum Saturation Level for memory, `[0, 1]`
    pub msl_mem: f32,
    /// Migration cost factor of the reconfiguration contribution
    pub migfact: f32,
    /// Base of the exponential CLE segment
    pub expbase: f32,
    /// Congestion penalty per resource type, `[0, 1]`
    pub congestion_penalty_pe: f32,
    /// Congestion penalty for memory, `[0, 1]`
    pub congestion_penalty_mem: f32,
    /// Fairness penalty per resource type, `[0, 1]`
    pub fairness_penalty_pe: f32,
    /// Fairness penalty for memory, `[0, 1]`
    pub fairness_penalty_mem: f32,
}

impl Default for ContribParams {
    fn default() -> Self {
        ContribParams {
            msl_pe: 0.90,
            msl_mem: 0.70,
            migfact: 4.0,
            expbase: 2.0,
            congestion_penalty_pe: 0.75,
            congestion_penalty_mem: 0.50,
            fairness_penalty_pe: 0.05,
            fairness_penalty_mem: 0.05,
        }
    }
}

impl ContribParams {
    /// Maximum Saturation Level for a resource type name
    pub fn msl_for(&self, type_name: &str) -> f32 {
        if type_name == "pe" {
            self.msl_pe
        } else {
            self.msl_mem
        }
    }
}

// ----------------------------------------------------------------------
// Threshold helper
// ----------------------------------------------------------------------

/// Usage levels of a descriptor set, split around the saturation cap.
#[derive(Debug, Clone, Copy)]
pub struct ResourceThresholds {
    /// Total capacity
    pub total: u64,
    /// Current usage level under the view
    pub used: u64,
    /// Remaining availability
    pub free: u64,
    /// Soft cap: `total · MSL`
    pub saturate: u64,
    /// Amount that still fits below the soft cap
    pub sat_lack: u64,
}

/// Compute the thresholds of a bound descriptor set under the evaluation
/// view, charging availability back for the evaluated application.
pub fn thresholds(
    ctx: &EvalContext<'_>,
    resources: &[Arc<Resource>],
    entity: &SchedEntity,
    msl: f32,
) -> Result<ResourceThresholds, ContribError> {
    let total = ctx.accounter.total_of(resources);
    let free = ctx
        .accounter
        .available_of(resources, ctx.token, Some(entity.app.id()))
        .map_err(ContribError::Failed)?;
    let used = total - free;
    let saturate = (total as f64 * f64::from(msl)) as u64;
    let sat_lack = saturate.saturating_sub(used);
    Ok(ResourceThresholds {
        total,
        used,
        free,
        saturate,
        sat_lack,
    })
}

// ----------------------------------------------------------------------
// CLE filter
// ----------------------------------------------------------------------

/// Parameters of the linear CLE segment: `1 - scale · (x - xoffset)`
#[derive(Debug, Clone, Copy)]
pub struct LinParams {
    pub scale: f32,
    pub xoffset: f32,
}

/// Parameters of the exponential CLE segment:
/// `yscale · (base^((x - xoffset) / xscale) - 1)`
#[derive(Debug, Clone, Copy)]
pub struct ExpParams {
    pub base: f32,
    pub xoffset: f32,
    pub xscale: f32,
    pub yscale: f32,
}

/// Full parameter set of a Constant-Linear-Exponential filter.
#[derive(Debug, Clone, Copy)]
pub struct CleParams {
    pub k: f32,
    pub lin: LinParams,
    pub exp: ExpParams,
}

fn func_linear(x: f32, p: &LinParams) -> f32 {
    1.0 - p.scale * (x - p.xoffset)
}

fn func_exponential(x: f32, p: &ExpParams) -> f32 {
    if p.xscale == 0.0 {
        return 0.0;
    }
    p.yscale * (p.base.powf((x - p.xoffset) / p.xscale) - 1.0)
}

/// Evaluate the CLE filter at `x`:
///
/// - `x ≤ c_thresh`: the constant `k`
/// - `c_thresh < x ≤ l_thresh`: the linear segment
/// - above: the exponential segment, asymptotic to zero as the resource
///   nears exhaustion
pub fn cle_index(c_thresh: u64, l_thresh: u64, x: f32, params: &CleParams) -> f32 {
    if x <= c_thresh as f32 {
        return params.k;
    }
    if x <= l_thresh as f32 {
        return func_linear(x, &params.lin);
    }
    func_exponential(x, &params.exp)
}

// ----------------------------------------------------------------------
// Aggregation
// ----------------------------------------------------------------------

struct ContribEntry {
    contrib: Arc<dyn SchedContrib>,
    weight: f32,
}

/// The weighted set of contributions a policy evaluates.
pub struct ContribSet {
    entries: Vec<ContribEntry>,
}

impl ContribSet {
    /// Build a set from `(contribution, weight)` pairs; weights are
    /// normalized over their sum at construction.
    pub fn new(weighted: Vec<(Arc<dyn SchedContrib>, u16)>) -> Result<Self, ArbiterError> {
        let sum: u32 = weighted.iter().map(|(_, w)| u32::from(*w)).sum();
        if sum == 0 {
            return Err(ArbiterError::configuration_error(
                "every contribution weight is zero",
            ));
        }
        Ok(ContribSet {
            entries: weighted
                .into_iter()
                .map(|(contrib, weight)| ContribEntry {
                    contrib,
                    weight: f32::from(weight) / sum as f32,
                })
                .collect(),
        })
    }

    /// Run every contribution's per-priority hook.
    pub fn init_all(&self, ctx: &EvalContext<'_>, priority: Priority) -> Result<(), ArbiterError> {
        for entry in &self.entries {
            entry.contrib.init(ctx, priority)?;
        }
        Ok(())
    }

    /// Aggregate the weighted indices for one candidate.
    ///
    /// An unavailable resource collapses that contribution to zero; a
    /// cluster without processing elements aborts the candidate via
    /// [`ContribError::NoProcessingElements`].
    pub fn aggregate(
        &self,
        ctx: &EvalContext<'_>,
        entity: &SchedEntity,
    ) -> Result<f32, ContribError> {
        let mut metrics = 0.0f32;
        for entry in &self.entries {
            if entry.weight == 0.0 {
                continue;
            }
            let index = match entry.contrib.compute(ctx, entity) {
                Ok(index) => index.clamp(0.0, 1.0),
                Err(ContribError::ResourceUnavailable) => 0.0,
                Err(err) => return Err(err),
            };
            trace!(
                entity = %entity,
                contrib = entry.contrib.name(),
                index,
                weighted = entry.weight * index,
                "contribution computed"
            );
            metrics += entry.weight * index;
        }
        Ok(metrics)
    }
}

/// Static registry of the built-in contributions, indexed by their
/// configuration-declared names.
pub fn build_contribution(name: &str, params: &ContribParams) -> Option<Arc<dyn SchedContrib>> {
    match name {
        "awmvalue" => Some(Arc::new(AwmValue::new())),
        "reconfig" => Some(Arc::new(Reconfig::new(params))),
        "congestion" => Some(Arc::new(Congestion::new(params))),
        "fairness" => Some(Arc::new(Fairness::new(params))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cle_constant_region() {
        let params = CleParams {
            k: 1.0,
            lin: LinParams {
                scale: 0.01,
                xoffset: 50.0,
            },
            exp: ExpParams {
                base: 2.0,
                xoffset: 150.0,
                xscale: -50.0,
                yscale: 0.25,
            },
        };
        assert_eq!(cle_index(50, 100, 10.0, &params), 1.0);
        assert_eq!(cle_index(50, 100, 50.0, &params), 1.0);
    }

    #[test]
    fn test_cle_linear_region_decreases() {
        let params = CleParams {
            k: 1.0,
            lin: LinParams {
                scale: 0.01,
                xoffset: 50.0,
            },
            exp: ExpParams {
                base: 2.0,
                xoffset: 150.0,
                xscale: -50.0,
                yscale: 0.25,
            },
        };
        let at_60 = cle_index(50, 100, 60.0, &params);
        let at_90 = cle_index(50, 100, 90.0, &params);
        assert!(at_60 > at_90);
        assert!((cle_index(50, 100, 100.0, &params) - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_cle_exponential_region_decays_to_zero() {
        // Anchored so the index reaches zero at x = 150
        let params = CleParams {
            k: 1.0,
            lin: LinParams {
                scale: 0.01,
                xoffset: 50.0,
            },
            exp: ExpParams {
                base: 2.0,
                xoffset: 150.0,
                xscale: -50.0,
                yscale: 0.5,
            },
        };
        let at_110 = cle_index(50, 100, 110.0, &params);
        let at_140 = cle_index(50, 100, 140.0, &params);
        assert!(at_110 > at_140);
        assert!(cle_index(50, 100, 150.0, &params).abs() < 1e-5);
    }

    #[test]
    fn test_contrib_set_rejects_zero_weights() {
        assert!(ContribSet::new(vec![]).is_err());
    }

    #[test]
    fn test_build_contribution_by_name() {
        let params = ContribParams::default();
        for name in ["awmvalue", "reconfig", "congestion", "fairness"] {
            assert!(build_contribution(name, &params).is_some(), "{}", name);
        }
        assert!(build_contribution("thermal", &params).is_none());
    }
}
