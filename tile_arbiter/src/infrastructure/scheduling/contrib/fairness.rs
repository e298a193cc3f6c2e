// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Fairness Contribution
//!
//! Discourages any single application of a priority class from grabbing more
//! than its fair share. The per-priority [`init`](SchedContrib::init) hook
//! divides the platform-wide availability of every resource type by the
//! number of applications in the class; per candidate, each usage is
//! filtered around the fair partition of its bound cluster - full index up
//! to the partition, linear penalty toward it, exponential decay down to
//! zero at the point where the request would drain the cluster. The worst
//! usage dominates.

use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, trace};

use tile_arbiter_domain::{ArbiterError, Priority};

use crate::infrastructure::scheduling::contrib::{
    cle_index, CleParams, ContribError, ContribParams, EvalContext, ExpParams, LinParams,
    SchedContrib,
};
use crate::infrastructure::scheduling::entity::SchedEntity;

/// Fair-partition index across one priority class.
#[derive(Debug)]
pub struct Fairness {
    params: ContribParams,
    fair_parts: RwLock<HashMap<String, u64>>,
}

impl Fairness {
    /// Create the contribution with the configured penalties
    pub fn new(params: &ContribParams) -> Self {
        Fairness {
            params: params.clone(),
            fair_parts: RwLock::new(HashMap::new()),
        }
    }

    fn penalty_for(&self, type_name: &str) -> f32 {
        if type_name == "pe" {
            self.params.fairness_penalty_pe
        } else {
            self.params.fairness_penalty_mem
        }
    }
}

impl SchedContrib for Fairness {
    fn name(&self) -> &'static str {
        "fairness"
    }

    fn init(&self, ctx: &EvalContext<'_>, priority: Priority) -> Result<(), ArbiterError> {
        let population = ctx.apps.count_by_prio(priority).max(1) as u64;

        // Platform-wide availability per resource type under the view
        let mut by_type: HashMap<String, Vec<_>> = HashMap::new();
        for resource in ctx.accounter.registry().all() {
            by_type
                .entry(resource.type_name().to_string())
                .or_default()
                .push(resource);
        }

        let mut fair_parts = self.fair_parts.write();
        fair_parts.clear();
        for (type_name, resources) in by_type {
            let available = ctx.accounter.available_of(&resources, ctx.token, None)?;
            let fair = (available / population).max(1);
            debug!(
                %priority,
                type_name = %type_name,
                available,
                population,
                fair_partition = fair,
                "fairness partition computed"
            );
            fair_parts.insert(type_name, fair);
        }
        Ok(())
    }

    fn compute(&self, ctx: &EvalContext<'_>, entity: &SchedEntity) -> Result<f32, ContribError> {
        let mut index = 1.0f32;
        let fair_parts = self.fair_parts.read();

        for (path, usage) in &entity.usages {
            // Availability inside the bound cluster
            let cluster_available = ctx
                .accounter
                .available_of(usage.binding_list(), ctx.token, Some(entity.app.id()))
                .map_err(ContribError::Failed)?;
            if cluster_available == 0 {
                return Ok(0.0);
            }
            if usage.amount() > cluster_available {
                return Ok(0.0);
            }

            let fair_part = fair_parts
                .get(path.type_name())
                .copied()
                .unwrap_or(cluster_available);

            // Bound the fair partition to what this cluster actually offers
            let cluster_fraction =
                (cluster_available as f64 / fair_part as f64).ceil().max(1.0) as u64;
            let cluster_fair_part =
                cluster_available.min((cluster_available / cluster_fraction).max(1));

            let penalty = self.penalty_for(path.type_name());
            let cle = CleParams {
                k: 1.0,
                lin: LinParams {
                    scale: penalty / cluster_fair_part as f32,
                    xoffset: 0.0,
                },
                exp: ExpParams {
                    base: self.params.expbase,
                    xoffset: cluster_available as f32,
                    xscale: cluster_fair_part as f32 - cluster_available as f32,
                    yscale: (1.0 - penalty) / (self.params.expbase - 1.0),
                },
            };

            let usage_index =
                cle_index(0, cluster_fair_part, usage.amount() as f32, &cle).max(0.0);
            trace!(
                entity = %entity,
                resource = %path,
                cluster_available,
                cluster_fair_part,
                usage_index,
                "fairness partition evaluated"
            );

            if usage_index < index {
                index = usage_index;
            }
        }

        Ok(index)
    }
}
