// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Scheduling Entity
//!
//! The ephemeral triple produced while scoring one candidate assignment:
//! an application, one of its working modes, and the cluster the working
//! mode's requests were bound into, together with the aggregated metrics.
//!
//! Entities are ordered by `(metrics descending, asserted goal gap first,
//! working-mode value descending)`; the selection loop walks them best
//! first.

use std::cmp::Ordering;
use std::fmt;

use tile_arbiter_domain::{AppRef, UsagesMap};

/// One scored `(application, working mode, cluster)` candidate.
pub struct SchedEntity {
    /// Application to schedule
    pub app: AppRef,
    /// Candidate working mode id
    pub awm_id: u8,
    /// Static value of the candidate working mode
    pub awm_value: f32,
    /// Cluster the requests were bound into
    pub cluster_id: u16,
    /// Materialized usages for this binding
    pub usages: UsagesMap,
    /// Aggregated weighted metrics
    pub metrics: f32,
}

impl SchedEntity {
    /// Comparator implementing the selection order.
    pub fn compare(&self, other: &SchedEntity) -> Ordering {
        match other.metrics.total_cmp(&self.metrics) {
            Ordering::Equal => {}
            ordering => return ordering,
        }

        // Applications asserting a goal gap are served first on ties
        let self_nap = self.app.goal_gap().is_asserted();
        let other_nap = other.app.goal_gap().is_asserted();
        match (self_nap, other_nap) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        other.awm_value.total_cmp(&self.awm_value)
    }
}

impl fmt::Display for SchedEntity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {{AWM:{}, CL:{}}}",
            self.app.id(),
            self.awm_id,
            self.cluster_id
        )
    }
}
