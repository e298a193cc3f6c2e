// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Congestion Contribution
//!
//! Penalizes candidates the closer they push a resource toward exhaustion.
//! For every usage the CLE filter is evaluated at the usage level the
//! cluster would reach if the request were granted: constant `1` while the
//! level stays under the Maximum Saturation Level, linearly decreasing to
//! `1 - penalty` as it approaches the full capacity, exponentially decaying
//! toward zero beyond it. The worst usage dominates the index.

use tracing::trace;

use crate::infrastructure::scheduling::contrib::{
    cle_index, thresholds, CleParams, ContribError, ContribParams, EvalContext, ExpParams,
    LinParams, SchedContrib,
};
use crate::infrastructure::scheduling::entity::SchedEntity;

/// Resource congestion index.
#[derive(Debug)]
pub struct Congestion {
    params: ContribParams,
}

impl Congestion {
    /// Create the contribution with the configured penalties
    pub fn new(params: &ContribParams) -> Self {
        Congestion {
            params: params.clone(),
        }
    }

    fn penalty_for(&self, type_name: &str) -> f32 {
        if type_name == "pe" {
            self.params.congestion_penalty_pe
        } else {
            self.params.congestion_penalty_mem
        }
    }
}

impl SchedContrib for Congestion {
    fn name(&self) -> &'static str {
        "congestion"
    }

    fn compute(&self, ctx: &EvalContext<'_>, entity: &SchedEntity) -> Result<f32, ContribError> {
        let mut index = 1.0f32;

        for (path, usage) in &entity.usages {
            let msl = self.params.msl_for(path.type_name());
            let levels = thresholds(ctx, usage.binding_list(), entity, msl)?;
            let penalty = self.penalty_for(path.type_name());

            // Usage level of the cluster if this request were granted
            let prospective = levels.used as f32 + usage.amount() as f32;
            let span = (levels.total.saturating_sub(levels.saturate)).max(1) as f32;
            let cle = CleParams {
                k: 1.0,
                lin: LinParams {
                    scale: penalty / span,
                    xoffset: levels.saturate as f32,
                },
                exp: ExpParams {
                    base: self.params.expbase,
                    xoffset: levels.total as f32 + span,
                    xscale: -span,
                    yscale: (1.0 - penalty) / (self.params.expbase - 1.0),
                },
            };

            let usage_index =
                cle_index(levels.saturate, levels.total, prospective, &cle).max(0.0);
            trace!(
                entity = %entity,
                resource = %path,
                prospective,
                usage_index,
                "congestion region evaluated"
            );

            // The most penalizing request dominates
            if usage_index < index {
                index = usage_index;
            }
        }

        Ok(index)
    }
}
