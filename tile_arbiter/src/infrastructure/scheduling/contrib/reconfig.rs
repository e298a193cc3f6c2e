// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Reconfiguration Contribution
//!
//! Captures the cost of moving an application to the candidate assignment.
//! Staying in the current working mode without migrating is free
//! (index `1`); otherwise the index decreases with the share of resources
//! that must be re-assigned, and migrations are penalized by the migration
//! factor:
//!
//! `index = 1 - ((1 + m·migfact) / (1 + migfact)) · (Σ request/total) / types`
//!
//! where `m = 1` when the candidate cluster differs from the current one.
//! A request that cannot be satisfied at all collapses the candidate; an
//! exhausted processing-element pool signals the cluster as full.

use tracing::trace;
use tile_arbiter_domain::ResourceCatalog;

use crate::infrastructure::scheduling::contrib::{
    ContribError, ContribParams, EvalContext, SchedContrib,
};
use crate::infrastructure::scheduling::entity::SchedEntity;

/// Reconfiguration and migration cost index.
#[derive(Debug)]
pub struct Reconfig {
    migfact: f32,
}

impl Reconfig {
    /// Create the contribution with the configured migration factor
    pub fn new(params: &ContribParams) -> Self {
        Reconfig {
            migfact: params.migfact,
        }
    }
}

impl SchedContrib for Reconfig {
    fn name(&self) -> &'static str {
        "reconfig"
    }

    fn compute(&self, ctx: &EvalContext<'_>, entity: &SchedEntity) -> Result<f32, ContribError> {
        let current_awm = entity.app.current_awm();
        let migration = matches!(
            entity.app.current_cluster(),
            Some(cluster) if cluster != entity.cluster_id
        );

        // Same working mode, same cluster: nothing to reconfigure
        if !migration && current_awm == Some(entity.awm_id) {
            return Ok(1.0);
        }

        let mut reconf_cost = 0.0f32;
        for (path, usage) in &entity.usages {
            let available = ctx
                .accounter
                .available_of(usage.binding_list(), ctx.token, Some(entity.app.id()))
                .map_err(ContribError::Failed)?;
            if available < usage.amount() {
                trace!(
                    entity = %entity,
                    resource = %path,
                    requested = usage.amount(),
                    available,
                    "request not satisfiable"
                );
                if available == 0 && path.type_name() == "pe" {
                    return Err(ContribError::NoProcessingElements);
                }
                return Err(ContribError::ResourceUnavailable);
            }

            let total = ctx.accounter.total_of(usage.binding_list());
            reconf_cost += usage.amount() as f32 / total as f32;
        }

        let migration_bias = if migration { self.migfact } else { 0.0 };
        let type_count = ctx.accounter.registry().count_types().max(1) as f32;
        Ok(1.0
            - (1.0 + migration_bias) / (1.0 + self.migfact) * (reconf_cost / type_count))
    }
}
