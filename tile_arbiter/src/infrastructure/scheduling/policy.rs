// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # YaMS Scheduling Policy
//!
//! Yet another Modular Scheduler: one scheduling round enumerates, per
//! priority class from highest to lowest, every
//! `(application, working mode, cluster)` candidate, scores it through the
//! weighted contribution set, sorts the scored entities and greedily
//! reserves resources in that order. Each application is scheduled at most
//! once per round; clusters whose processing elements run out are marked
//! full and skipped for the rest of the class.
//!
//! ## Round Algorithm
//!
//! 1. Enumerate the cluster identifiers from the registry
//! 2. Per priority class: run the contributions' `init` hooks, then for
//!    every schedulable application bind and score all of its candidates
//! 3. Sort entities by `(metrics desc, goal-gap first, AWM value desc)`
//! 4. Walk the sorted list, attempting a reservation for each entity and
//!    recording the next working mode on success
//!
//! Scoring one application's candidate matrix is side-effect free against
//! the view and may be dispatched across the rayon worker pool; the shared
//! scored list and the full-cluster set are the only guarded writes.

use parking_lot::Mutex;
use rayon::prelude::*;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

use tile_arbiter_domain::{AppId, AppRef, ArbiterError, Priority, ViewToken};

use crate::infrastructure::accounting::accounter::ResourceAccounter;
use crate::infrastructure::registry::application_registry::ApplicationRegistry;
use crate::infrastructure::scheduling::contrib::{
    build_contribution, ContribError, ContribParams, ContribSet, EvalContext, SchedContrib,
};
use crate::infrastructure::scheduling::entity::SchedEntity;

/// Configuration of the policy: contribution weights and tunables.
#[derive(Debug, Clone)]
pub struct YamsConfig {
    /// Weight of the AWM value contribution
    pub weight_awmvalue: u16,
    /// Weight of the reconfiguration contribution
    pub weight_reconfig: u16,
    /// Weight of the congestion contribution
    pub weight_congestion: u16,
    /// Weight of the fairness contribution
    pub weight_fairness: u16,
    /// Dispatch candidate scoring across the rayon pool
    pub parallel: bool,
    /// Shared contribution parameters
    pub params: ContribParams,
}

impl Default for YamsConfig {
    fn default() -> Self {
        YamsConfig {
            weight_awmvalue: 20,
            weight_reconfig: 5,
            weight_congestion: 5,
            weight_fairness: 18,
            parallel: false,
            params: ContribParams::default(),
        }
    }
}

/// The YaMS scheduling policy.
pub struct YamsPolicy {
    contribs: ContribSet,
    parallel: bool,
}

impl YamsPolicy {
    /// Build the policy, instantiating the configured contributions from
    /// the static registry.
    pub fn new(config: &YamsConfig) -> Result<Self, ArbiterError> {
        let named: [(&str, u16); 4] = [
            ("awmvalue", config.weight_awmvalue),
            ("reconfig", config.weight_reconfig),
            ("congestion", config.weight_congestion),
            ("fairness", config.weight_fairness),
        ];

        let mut weighted: Vec<(Arc<dyn SchedContrib>, u16)> = Vec::new();
        for (name, weight) in named {
            let contrib = build_contribution(name, &config.params).ok_or_else(|| {
                ArbiterError::configuration_error(format!("unknown contribution '{}'", name))
            })?;
            weighted.push((contrib, weight));
        }

        Ok(YamsPolicy {
            contribs: ContribSet::new(weighted)?,
            parallel: config.parallel,
        })
    }

    /// Run one scheduling round against the given view.
    ///
    /// On success every scheduled application carries its next working mode
    /// and the reservations are committed in the view; the caller owns the
    /// view and decides whether to adopt it.
    pub fn schedule(
        &self,
        accounter: &ResourceAccounter,
        apps: &ApplicationRegistry,
        token: ViewToken,
    ) -> Result<(), ArbiterError> {
        let registry = accounter.registry().clone();
        let clusters = registry.segment_ids("cluster");
        if clusters.is_empty() {
            return Err(ArbiterError::not_found(
                "no clusters available on the platform",
            ));
        }
        debug!(clusters = clusters.len(), token = %token, "scheduling round starting");

        let ctx = EvalContext {
            accounter,
            apps,
            token,
        };
        let full_clusters: Mutex<HashSet<u16>> = Mutex::new(HashSet::new());
        let mut scheduled: HashSet<AppId> = HashSet::new();

        // Every schedulable application competes from scratch: its charges
        // inherited from the committed view are dropped, and only the
        // reservations this round grants survive into adoption
        for app in apps.all() {
            if !Self::skip(&app) {
                accounter.evict(&app, token)?;
            }
        }

        for priority in Priority::classes_down_to(apps.lowest_prio()) {
            if apps.count_by_prio(priority) == 0 {
                continue;
            }
            self.contribs.init_all(&ctx, priority)?;

            let mut entities: Vec<SchedEntity> = Vec::new();
            for app in apps.iter_by_prio(priority) {
                if Self::skip(&app) {
                    debug!(app = %app, "skipped by schedule conditions");
                    continue;
                }
                self.insert_candidates(&ctx, &app, &clusters, &full_clusters, &mut entities)?;
            }

            entities.sort_by(|a, b| a.compare(b));
            debug!(%priority, entities = entities.len(), "scheduling entities ordered");

            for entity in entities {
                if scheduled.contains(entity.app.id()) {
                    continue;
                }
                if full_clusters.lock().contains(&entity.cluster_id) {
                    continue;
                }
                if Self::skip(&entity.app) {
                    continue;
                }

                match accounter.reserve(&entity.app, entity.usages.clone(), token) {
                    Ok(()) => {
                        entity.app.commit_schedule(entity.awm_id, entity.cluster_id)?;
                        info!(
                            entity = %entity,
                            metrics = entity.metrics,
                            "scheduled"
                        );
                        scheduled.insert(entity.app.id().clone());
                    }
                    Err(err) if err.is_candidate_recoverable() => {
                        debug!(entity = %entity, error = %err, "candidate rejected");
                    }
                    Err(err) => return Err(err),
                }
            }
        }

        accounter.report(token);
        Ok(())
    }

    fn skip(app: &AppRef) -> bool {
        app.state().is_inactive() || app.sync_pending()
    }

    /// Bind and score every `(working mode, cluster)` candidate of one
    /// application, appending the successfully scored entities.
    fn insert_candidates(
        &self,
        ctx: &EvalContext<'_>,
        app: &AppRef,
        clusters: &[u16],
        full_clusters: &Mutex<HashSet<u16>>,
        entities: &mut Vec<SchedEntity>,
    ) -> Result<(), ArbiterError> {
        let mut candidates: Vec<(u8, f32, u16)> = Vec::new();
        for (awm_id, awm_value) in app.candidate_awms() {
            for cluster_id in clusters {
                candidates.push((awm_id, awm_value, *cluster_id));
            }
        }

        let evaluate = |(awm_id, awm_value, cluster_id): (u8, f32, u16)| {
            self.evaluate_candidate(ctx, app, awm_id, awm_value, cluster_id, full_clusters)
        };

        let results: Vec<Result<Option<SchedEntity>, ArbiterError>> = if self.parallel {
            candidates.into_par_iter().map(evaluate).collect()
        } else {
            candidates.into_iter().map(evaluate).collect()
        };

        for result in results {
            if let Some(entity) = result? {
                entities.push(entity);
            }
        }
        Ok(())
    }

    fn evaluate_candidate(
        &self,
        ctx: &EvalContext<'_>,
        app: &AppRef,
        awm_id: u8,
        awm_value: f32,
        cluster_id: u16,
        full_clusters: &Mutex<HashSet<u16>>,
    ) -> Result<Option<SchedEntity>, ArbiterError> {
        if full_clusters.lock().contains(&cluster_id) {
            return Ok(None);
        }

        let usages = match app.bind_awm(awm_id, ctx.accounter.registry().as_ref(), cluster_id) {
            Ok(usages) => usages,
            Err(ArbiterError::IncompleteBind(detail)) => {
                debug!(app = %app, awm_id, cluster_id, detail = %detail, "binding incomplete");
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        let mut entity = SchedEntity {
            app: app.clone(),
            awm_id,
            awm_value,
            cluster_id,
            usages,
            metrics: 0.0,
        };

        match self.contribs.aggregate(ctx, &entity) {
            Ok(metrics) => {
                entity.metrics = metrics;
                Ok(Some(entity))
            }
            Err(ContribError::NoProcessingElements) => {
                warn!(cluster_id, "cluster out of processing elements, marking full");
                full_clusters.lock().insert(cluster_id);
                Ok(None)
            }
            Err(ContribError::ResourceUnavailable) => Ok(None),
            Err(ContribError::Failed(err)) => Err(err),
        }
    }
}
