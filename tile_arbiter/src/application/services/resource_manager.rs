// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Manager Service
//!
//! The orchestration hub of the arbiter: owns the accounter, the
//! registries, the scheduling and synchronization policies and the platform
//! proxy, and drives one full scheduling round end to end:
//!
//! 1. Open a fresh resource state view
//! 2. Run the scheduling policy against it
//! 3. Block the applications the round left without resources
//! 4. Apply the synchronization subsets through the platform proxy,
//!    validating per-application reconfiguration latencies
//! 5. Adopt the view as the new system state
//!
//! A policy failure or an internal synchronization failure abandons the
//! round: the view is released and the previous system view stays active.
//! A per-application latency violation only demotes that application - its
//! previous assignment is restored and it competes again next round. A
//! failed mandatory transition disables the application.
//!
//! Rounds are triggered through a deferrable executor, so bursts of client
//! events (registrations, constraint updates, goal-gap reports) coalesce
//! into a single re-scheduling; an optional period keeps the system
//! re-optimizing in the background.

use once_cell::sync::OnceCell;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use tile_arbiter_domain::{
    AppId, AppRef, AppState, ArbiterError, ClientRequest, ClientResponse, GwmEvent, PlatformProxy,
    RecipeLoader, RecipeQuality, SyncPlan, ViewToken,
};

use crate::infrastructure::accounting::accounter::ResourceAccounter;
use crate::infrastructure::metrics::ArbiterMetrics;
use crate::infrastructure::registry::application_registry::ApplicationRegistry;
use crate::infrastructure::runtime::deferrable::{Deferrable, DeferredTask};
use crate::infrastructure::scheduling::policy::YamsPolicy;
use crate::infrastructure::sync::sasb::SasbPolicy;

/// The arbiter's orchestration service.
pub struct ResourceManager {
    accounter: Arc<ResourceAccounter>,
    apps: Arc<ApplicationRegistry>,
    policy: YamsPolicy,
    sync_policy: SasbPolicy,
    proxy: Arc<dyn PlatformProxy>,
    loader: Arc<dyn RecipeLoader>,
    metrics: ArbiterMetrics,
    rescheduler: OnceCell<Deferrable>,
}

impl ResourceManager {
    /// Wire the service together.
    pub fn new(
        accounter: Arc<ResourceAccounter>,
        apps: Arc<ApplicationRegistry>,
        policy: YamsPolicy,
        proxy: Arc<dyn PlatformProxy>,
        loader: Arc<dyn RecipeLoader>,
        metrics: ArbiterMetrics,
    ) -> Self {
        ResourceManager {
            accounter,
            apps,
            policy,
            sync_policy: SasbPolicy::new(),
            proxy,
            loader,
            metrics,
            rescheduler: OnceCell::new(),
        }
    }

    /// The accounter backing this manager
    pub fn accounter(&self) -> &Arc<ResourceAccounter> {
        &self.accounter
    }

    /// The application registry backing this manager
    pub fn applications(&self) -> &Arc<ApplicationRegistry> {
        &self.apps
    }

    // ------------------------------------------------------------------
    // Deferred triggering
    // ------------------------------------------------------------------

    /// Start the re-scheduling deferrable. With a period the arbiter keeps
    /// re-optimizing on its own; without one it only reacts to events.
    pub fn start(self: &Arc<Self>, period: Option<Duration>) {
        let weak = Arc::downgrade(self);
        let task: DeferredTask = Arc::new(move || {
            let weak = weak.clone();
            Box::pin(async move {
                if let Some(manager) = weak.upgrade() {
                    if let Err(err) = manager.schedule_once().await {
                        error!(error = %err, "scheduling round failed");
                    }
                }
            })
        });

        let deferrable = Deferrable::new("resource-manager", task, period);
        deferrable.start();
        if self.rescheduler.set(deferrable).is_err() {
            warn!("resource manager already started");
        }
    }

    /// Request a re-scheduling round; bursts coalesce into one.
    pub fn notify_event(&self) {
        if let Some(rescheduler) = self.rescheduler.get() {
            rescheduler.schedule(Duration::ZERO);
        }
    }

    /// Stop the re-scheduling deferrable; an in-flight round completes.
    pub async fn shutdown(&self) {
        if let Some(rescheduler) = self.rescheduler.get() {
            rescheduler.stop().await;
        }
        info!("resource manager stopped");
    }

    // ------------------------------------------------------------------
    // One scheduling round
    // ------------------------------------------------------------------

    /// Drive one full scheduling round.
    pub async fn schedule_once(&self) -> Result<(), ArbiterError> {
        let started = Instant::now();
        let token = self.accounter.get_view("sched")?;
        debug!(token = %token, "scheduling round opened");

        if let Err(err) = self.policy.schedule(&self.accounter, &self.apps, token) {
            self.metrics.rounds_failed_total.inc();
            self.accounter.put_view(token)?;
            return Err(err);
        }

        self.block_unscheduled(token)?;

        if let Err(err) = self.synchronize(token).await {
            // The previous system view stays active
            self.metrics.rounds_failed_total.inc();
            self.accounter.put_view(token)?;
            return Err(err);
        }

        self.accounter.adopt_view(token)?;
        self.metrics.rounds_total.inc();
        self.metrics
            .round_duration_seconds
            .observe(started.elapsed().as_secs_f64());
        self.metrics
            .sync_worst_latency_ms
            .set(self.sync_policy.estimated_sync_time_ms() as f64);
        info!(
            token = %token,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scheduling round adopted"
        );
        Ok(())
    }

    /// Transition every application the round assigned nothing to into the
    /// blocked state and drop its charges from the view.
    fn block_unscheduled(&self, token: ViewToken) -> Result<(), ArbiterError> {
        for app in self.apps.all() {
            if app.state().is_inactive() || app.sync_pending() {
                continue;
            }
            if self.accounter.committed_usages(&app, token)?.is_some() {
                // Assigned, but with an unchanged working mode
                self.metrics
                    .outcomes_total
                    .with_label_values(&["unchanged"])
                    .inc();
                continue;
            }
            if app.mark_unscheduled() == SyncPlan::Block {
                debug!(app = %app, "no resources assigned, blocking");
                self.accounter.evict(&app, token)?;
                self.metrics
                    .outcomes_total
                    .with_label_values(&["blocked"])
                    .inc();
            }
        }
        Ok(())
    }

    /// Apply the synchronization subsets in SASB order.
    async fn synchronize(&self, token: ViewToken) -> Result<(), ArbiterError> {
        let mut restart = true;
        while let Some(subset) = self.sync_policy.next_subset(&self.apps, restart) {
            restart = false;
            debug!(state = %subset.state, count = subset.apps.len(), "applying subset");

            for app in &subset.apps {
                let step_started = Instant::now();
                let applied = self.apply_transition(app, subset.state, token).await;
                let latency_ms = step_started.elapsed().as_millis() as u64;

                match applied {
                    Ok(()) => match self.sync_policy.check_latency(app, latency_ms) {
                        Ok(()) => self.finish_transition(app, subset.state)?,
                        Err(violation) => {
                            warn!(app = %app, error = %violation, "latency ceiling exceeded");
                            self.demote(app, token).await?;
                        }
                    },
                    Err(err @ ArbiterError::Internal(_)) => return Err(err),
                    Err(err) => {
                        // A mandatory transition failed: the application is
                        // withdrawn from scheduling
                        warn!(app = %app, error = %err, "transition failed, disabling");
                        self.accounter.evict(app, token)?;
                        app.disable();
                        self.proxy.reclaim(app).await?;
                    }
                }
            }
        }
        self.metrics.sync_passes_total.inc();
        Ok(())
    }

    /// Drive the platform-proxy side of one transition.
    async fn apply_transition(
        &self,
        app: &AppRef,
        state: AppState,
        token: ViewToken,
    ) -> Result<(), ArbiterError> {
        match state {
            AppState::Blocked => self.proxy.reclaim(app).await,
            AppState::Starting | AppState::Reconf | AppState::Migrate | AppState::Migrec => {
                let usages = self
                    .accounter
                    .committed_usages(app, token)?
                    .ok_or_else(|| {
                        ArbiterError::MissUsages(format!(
                            "'{}' synchronizing without committed usages",
                            app.id()
                        ))
                    })?;
                if matches!(state, AppState::Migrate | AppState::Migrec) {
                    // Leave the old partition before entering the new one
                    self.proxy.reclaim(app).await?;
                }
                self.proxy.map(app, &usages, token, false).await
            }
            other => Err(ArbiterError::internal(format!(
                "'{}' in subset with non-sync state {}",
                app.id(),
                other
            ))),
        }
    }

    /// Book-keep a successfully applied transition.
    fn finish_transition(&self, app: &AppRef, state: AppState) -> Result<(), ArbiterError> {
        let event = GwmEvent::from_state(state);
        match state {
            AppState::Blocked => app.ack_blocked()?,
            _ => {
                app.ack_sync()?;
                self.metrics
                    .outcomes_total
                    .with_label_values(&["scheduled"])
                    .inc();
            }
        }
        if let Some(event) = event {
            info!(app = %app, ?event, "transition applied");
        }
        Ok(())
    }

    /// Roll a rejected candidate back to its previous assignment; the
    /// application is reconsidered in the next round.
    async fn demote(&self, app: &AppRef, token: ViewToken) -> Result<(), ArbiterError> {
        // Withdraw whatever the rejected transition just applied
        self.proxy.reclaim(app).await?;
        if let Err(err) = self.accounter.release(app, token) {
            debug!(app = %app, error = %err, "nothing to release while demoting");
        }
        app.rollback_schedule();

        let (Some(awm_id), Some(cluster_id)) = (app.current_awm(), app.current_cluster()) else {
            return Ok(());
        };

        // Restore the previous assignment, in the view and on the platform
        let restored = app
            .bind_awm(awm_id, self.accounter.registry().as_ref(), cluster_id)
            .and_then(|usages| {
                self.accounter.reserve(app, usages.clone(), token)?;
                Ok(usages)
            });
        match restored {
            Ok(usages) => self.proxy.map(app, &usages, token, false).await,
            Err(err) => {
                warn!(app = %app, error = %err, "previous assignment lost, blocking");
                self.accounter.evict(app, token)?;
                app.mark_unscheduled();
                app.ack_blocked()
            }
        }
    }

    // ------------------------------------------------------------------
    // Client boundary
    // ------------------------------------------------------------------

    /// Handle one client request.
    pub async fn handle_request(&self, request: ClientRequest) -> ClientResponse {
        match request {
            ClientRequest::Register { name } => match self.register_application(&name).await {
                Ok(()) => {
                    self.notify_event();
                    ClientResponse::Ok
                }
                Err(err) => {
                    warn!(app = %name, error = %err, "registration failed");
                    ClientResponse::RegistrationFailed(err)
                }
            },
            ClientRequest::Unregister { name } => {
                self.respond(self.unregister_application(&name).await)
            }
            ClientRequest::Enable { name } => self.respond(self.with_app(&name, |app| {
                app.enable()?;
                self.notify_event();
                Ok(())
            })),
            ClientRequest::Disable { name } => self.respond(match self.with_app(&name, Ok) {
                Ok(app) => {
                    app.disable();
                    let result = self.accounter.evict(&app, ViewToken::SYSTEM);
                    self.notify_event();
                    result
                }
                Err(err) => Err(err),
            }),
            ClientRequest::GetWorkingMode { name } => match self.with_app(&name, Ok) {
                Ok(app) => Self::working_mode_response(&app),
                Err(err) => ClientResponse::Error(err),
            },
            ClientRequest::SetConstraints { name, constraints } => {
                self.respond(self.with_app(&name, |app| {
                    app.set_constraints(&constraints);
                    self.notify_event();
                    Ok(())
                }))
            }
            ClientRequest::SetGoalGap { name, gap } => self.respond(self.with_app(&name, |app| {
                app.set_goal_gap(gap);
                self.notify_event();
                Ok(())
            })),
        }
    }

    fn respond<T>(&self, result: Result<T, ArbiterError>) -> ClientResponse {
        match result {
            Ok(_) => ClientResponse::Ok,
            Err(err) => ClientResponse::Error(err),
        }
    }

    fn with_app<T>(
        &self,
        name: &str,
        operate: impl FnOnce(AppRef) -> Result<T, ArbiterError>,
    ) -> Result<T, ArbiterError> {
        let id = AppId::new(name)?;
        let app = self
            .apps
            .get(&id)
            .ok_or_else(|| ArbiterError::not_found(format!("application '{}'", id)))?;
        operate(app)
    }

    fn working_mode_response(app: &AppRef) -> ClientResponse {
        match (app.state(), app.current_awm(), app.current_cluster()) {
            (AppState::Running, Some(awm_id), Some(cluster_id)) => ClientResponse::WorkingMode {
                awm_id,
                cluster_id,
            },
            (state, _, _) => match GwmEvent::from_state(state) {
                Some(event) => ClientResponse::Event(event),
                None => ClientResponse::Error(ArbiterError::not_found(format!(
                    "'{}' holds no working mode in state {}",
                    app.id(),
                    state
                ))),
            },
        }
    }

    async fn register_application(&self, name: &str) -> Result<(), ArbiterError> {
        let id = AppId::new(name)?;
        let load = self.loader.load(name).await?;
        if let RecipeQuality::Weak { unresolved } = &load.quality {
            warn!(
                app = %id,
                unresolved = unresolved.len(),
                "recipe loaded weakly, some requests dropped"
            );
        }

        let recipe = load.recipe;
        let app = Arc::new(tile_arbiter_domain::Application::new(
            id,
            recipe.priority,
            recipe.working_modes,
        ));
        app.set_latency_ceiling_ms(recipe.latency_ceiling_ms);
        app.merge_attributes(recipe.plugin_data);

        self.apps.register(app.clone())?;
        self.metrics.applications.set(self.apps.len() as i64);
        self.proxy.setup(&app).await?;
        info!(app = %app, "application admitted");
        Ok(())
    }

    async fn unregister_application(&self, name: &str) -> Result<(), ArbiterError> {
        let id = AppId::new(name)?;
        let app = self
            .apps
            .get(&id)
            .ok_or_else(|| ArbiterError::not_found(format!("application '{}'", id)))?;

        self.proxy.reclaim(&app).await?;
        self.proxy.release(&app).await?;
        self.accounter.evict(&app, ViewToken::SYSTEM)?;
        self.apps.deregister(&id)?;
        self.metrics.applications.set(self.apps.len() as i64);
        self.notify_event();
        info!(app = %id, "application departed");
        Ok(())
    }
}
