// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Entity
//!
//! A managed application: stable identifier, priority class, declared menu
//! of working modes, current and next AWM assignment, goal-gap hint,
//! constraint set and the synchronization state machine.
//!
//! ## State Machine
//!
//! ```text
//!      ┌── starting ──► running ──► reconf ──► running
//! new ─┤                   │        migrate     │
//!      │                   │        migrec      │
//!      └── disabled        ▼                    ▼
//!                        blocked ──► running   finished
//! ```
//!
//! Transitions are initiated by the scheduler (choosing a next AWM →
//! `reconf`/`migrate`/`migrec`/`starting`, choosing none → `blocked`), by the
//! synchronization driver (acknowledging a reconfiguration → `running`), and
//! by the registration boundary (`disabled`, `finished`). Concurrent
//! transitions on the same application are serialized by the entity's
//! internal mutex; invalid transitions surface as `Internal` errors instead
//! of corrupting state.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::attributes::{AttributeContainer, AttributeValue};
use crate::entities::usage::UsagesMap;
use crate::entities::working_mode::WorkingMode;
use crate::error::ArbiterError;
use crate::repositories::resource_catalog::ResourceCatalog;
use crate::value_objects::app_id::AppId;
use crate::value_objects::goal_gap::GoalGap;
use crate::value_objects::priority::Priority;

/// Shared handle to an application
pub type AppRef = Arc<Application>;

/// Synchronization state of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AppState {
    /// Admitted, waiting for the first (or next) resource assignment to be
    /// applied
    Starting,
    /// Running under its current working mode
    Running,
    /// No resources assigned
    Blocked,
    /// Same cluster, different working mode pending
    Reconf,
    /// Same working mode, different cluster pending
    Migrate,
    /// Different working mode on a different cluster pending
    Migrec,
    /// Administratively excluded from scheduling
    Disabled,
    /// Deregistered; terminal
    Finished,
}

impl AppState {
    /// Whether the application is waiting for a synchronization step
    pub fn is_synchronizing(&self) -> bool {
        matches!(
            self,
            AppState::Reconf | AppState::Migrate | AppState::Migrec | AppState::Starting
        )
    }

    /// Whether the scheduler must skip the application entirely
    pub fn is_inactive(&self) -> bool {
        matches!(self, AppState::Disabled | AppState::Finished)
    }
}

impl fmt::Display for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppState::Starting => "starting",
            AppState::Running => "running",
            AppState::Blocked => "blocked",
            AppState::Reconf => "reconf",
            AppState::Migrate => "migrate",
            AppState::Migrec => "migrec",
            AppState::Disabled => "disabled",
            AppState::Finished => "finished",
        };
        write!(f, "{}", name)
    }
}

/// Outcome of a scheduling decision for one application, telling the
/// synchronization driver which transition (if any) must be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPlan {
    /// Nothing to do: the assignment equals the current one
    Unchanged,
    /// Newly admitted (or re-admitted) application must be started
    Start,
    /// Working mode change within the current cluster
    Reconf,
    /// Same working mode, moved to another cluster
    Migrate,
    /// Working mode and cluster both change
    Migrec,
    /// The application lost all resources
    Block,
}

/// Operation half of a working-mode constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintOperation {
    /// Assert the constraint
    Add,
    /// Retract the constraint
    Remove,
}

/// Bound half of a working-mode constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstraintBound {
    /// Toggle a single working-mode id
    Exact,
    /// Only ids greater than or equal to the given one are admissible
    Lower,
    /// Only ids less than or equal to the given one are admissible
    Upper,
}

/// One working-mode constraint asserted by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AwmConstraint {
    /// Working-mode id the constraint refers to
    pub awm_id: u8,
    /// Assert or retract
    pub operation: ConstraintOperation,
    /// Which bound the constraint sets
    pub bound: ConstraintBound,
}

/// Effective constraint set filtered against at candidate enumeration.
#[derive(Debug, Clone, Default)]
struct ConstraintSet {
    lower: Option<u8>,
    upper: Option<u8>,
    disabled: BTreeSet<u8>,
}

impl ConstraintSet {
    fn apply(&mut self, constraint: &AwmConstraint) {
        match (constraint.bound, constraint.operation) {
            (ConstraintBound::Lower, ConstraintOperation::Add) => {
                self.lower = Some(constraint.awm_id);
            }
            (ConstraintBound::Lower, ConstraintOperation::Remove) => {
                self.lower = None;
            }
            (ConstraintBound::Upper, ConstraintOperation::Add) => {
                self.upper = Some(constraint.awm_id);
            }
            (ConstraintBound::Upper, ConstraintOperation::Remove) => {
                self.upper = None;
            }
            (ConstraintBound::Exact, ConstraintOperation::Add) => {
                self.disabled.remove(&constraint.awm_id);
            }
            (ConstraintBound::Exact, ConstraintOperation::Remove) => {
                self.disabled.insert(constraint.awm_id);
            }
        }
    }

    fn admits(&self, awm_id: u8) -> bool {
        if self.disabled.contains(&awm_id) {
            return false;
        }
        if let Some(lower) = self.lower {
            if awm_id < lower {
                return false;
            }
        }
        if let Some(upper) = self.upper {
            if awm_id > upper {
                return false;
            }
        }
        true
    }
}

#[derive(Debug)]
struct AppInner {
    state: AppState,
    working_modes: Vec<WorkingMode>,
    current_awm: Option<u8>,
    current_cluster: Option<u16>,
    next_awm: Option<u8>,
    next_cluster: Option<u16>,
    goal_gap: GoalGap,
    constraints: ConstraintSet,
    attributes: AttributeContainer,
    sync_pending: bool,
    latency_ceiling_ms: Option<u64>,
}

/// A managed application.
pub struct Application {
    id: AppId,
    priority: Priority,
    inner: Mutex<AppInner>,
}

impl Application {
    /// Create an application entering the system in the `starting` state.
    pub fn new(id: AppId, priority: Priority, working_modes: Vec<WorkingMode>) -> Self {
        Application {
            id,
            priority,
            inner: Mutex::new(AppInner {
                state: AppState::Starting,
                working_modes,
                current_awm: None,
                current_cluster: None,
                next_awm: None,
                next_cluster: None,
                goal_gap: GoalGap::NONE,
                constraints: ConstraintSet::default(),
                attributes: AttributeContainer::new(),
                sync_pending: false,
                latency_ceiling_ms: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, AppInner> {
        // A panic while holding the lock must not wedge the whole registry
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Stable identifier
    pub fn id(&self) -> &AppId {
        &self.id
    }

    /// Priority class
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// Current synchronization state
    pub fn state(&self) -> AppState {
        self.lock().state
    }

    /// Current working mode id, if any
    pub fn current_awm(&self) -> Option<u8> {
        self.lock().current_awm
    }

    /// Cluster the current working mode is bound to, if any
    pub fn current_cluster(&self) -> Option<u16> {
        self.lock().current_cluster
    }

    /// Next working mode id assigned by the last scheduling round, if any
    pub fn next_awm(&self) -> Option<u8> {
        self.lock().next_awm
    }

    /// Whether a synchronization step is pending for this application
    pub fn sync_pending(&self) -> bool {
        self.lock().sync_pending
    }

    /// Reported goal gap
    pub fn goal_gap(&self) -> GoalGap {
        self.lock().goal_gap
    }

    /// Update the goal gap hint
    pub fn set_goal_gap(&self, gap: GoalGap) {
        self.lock().goal_gap = gap;
    }

    /// Reconfiguration latency ceiling, if the recipe declared one
    pub fn latency_ceiling_ms(&self) -> Option<u64> {
        self.lock().latency_ceiling_ms
    }

    /// Set the reconfiguration latency ceiling
    pub fn set_latency_ceiling_ms(&self, ceiling: Option<u64>) {
        self.lock().latency_ceiling_ms = ceiling;
    }

    /// Apply a batch of working-mode constraints.
    pub fn set_constraints(&self, constraints: &[AwmConstraint]) {
        let mut inner = self.lock();
        for constraint in constraints {
            inner.constraints.apply(constraint);
        }
    }

    /// Whether the constraint set admits the given working mode
    pub fn admits(&self, awm_id: u8) -> bool {
        self.lock().constraints.admits(awm_id)
    }

    /// Static value of a working mode, if declared
    pub fn awm_value(&self, awm_id: u8) -> Option<f32> {
        let inner = self.lock();
        inner
            .working_modes
            .iter()
            .find(|wm| wm.id() == awm_id)
            .map(|wm| wm.value())
    }

    /// Static value of the current working mode, if any
    pub fn current_awm_value(&self) -> Option<f32> {
        let inner = self.lock();
        let current = inner.current_awm?;
        inner
            .working_modes
            .iter()
            .find(|wm| wm.id() == current)
            .map(|wm| wm.value())
    }

    /// Admissible `(awm_id, value)` candidates under the constraint set.
    pub fn candidate_awms(&self) -> Vec<(u8, f32)> {
        let inner = self.lock();
        inner
            .working_modes
            .iter()
            .filter(|wm| inner.constraints.admits(wm.id()))
            .map(|wm| (wm.id(), wm.value()))
            .collect()
    }

    /// Bind one working mode's requests to a physical cluster, returning a
    /// copy of the materialized usages for the scheduling entity.
    pub fn bind_awm(
        &self,
        awm_id: u8,
        catalog: &dyn ResourceCatalog,
        cluster_id: u16,
    ) -> Result<UsagesMap, ArbiterError> {
        let mut inner = self.lock();
        let awm = inner
            .working_modes
            .iter_mut()
            .find(|wm| wm.id() == awm_id)
            .ok_or_else(|| {
                ArbiterError::MissAwm(format!("working mode {} of '{}'", awm_id, self.id))
            })?;
        let usages = awm.bind_resource(catalog, "cluster", None, cluster_id, cluster_id)?;
        Ok(usages.clone())
    }

    /// Attach an opaque attribute
    pub fn set_attribute<N, K>(&self, ns: N, key: K, value: AttributeValue)
    where
        N: Into<String>,
        K: Into<String>,
    {
        self.lock().attributes.set(ns, key, value);
    }

    /// Look up an opaque attribute
    pub fn attribute(&self, ns: &str, key: &str) -> Option<AttributeValue> {
        self.lock().attributes.get(ns, key).cloned()
    }

    /// Absorb a whole attribute container (e.g. recipe plugin data)
    pub fn merge_attributes(&self, attributes: AttributeContainer) {
        self.lock().attributes.merge(attributes);
    }

    // ------------------------------------------------------------------
    // Scheduling-driven transitions
    // ------------------------------------------------------------------

    /// Record the scheduling decision for this round and derive the
    /// synchronization transition it requires.
    ///
    /// Fails with `Internal` when called on an inactive or already
    /// synchronizing application.
    pub fn commit_schedule(&self, awm_id: u8, cluster_id: u16) -> Result<SyncPlan, ArbiterError> {
        let mut inner = self.lock();
        if inner.state.is_inactive() || inner.sync_pending {
            return Err(ArbiterError::internal(format!(
                "schedule committed to '{}' in state {} (pending: {})",
                self.id, inner.state, inner.sync_pending
            )));
        }

        inner.next_awm = Some(awm_id);
        inner.next_cluster = Some(cluster_id);

        let plan = match inner.state {
            AppState::Running => {
                let same_awm = inner.current_awm == Some(awm_id);
                let same_cluster = inner.current_cluster == Some(cluster_id);
                match (same_awm, same_cluster) {
                    (true, true) => SyncPlan::Unchanged,
                    (true, false) => SyncPlan::Migrate,
                    (false, true) => SyncPlan::Reconf,
                    (false, false) => SyncPlan::Migrec,
                }
            }
            AppState::Starting | AppState::Blocked => SyncPlan::Start,
            state => {
                return Err(ArbiterError::internal(format!(
                    "unexpected state {} while committing schedule for '{}'",
                    state, self.id
                )))
            }
        };

        match plan {
            SyncPlan::Unchanged => {
                inner.next_awm = None;
                inner.next_cluster = None;
            }
            SyncPlan::Start => {
                inner.state = AppState::Starting;
                inner.sync_pending = true;
            }
            SyncPlan::Reconf => {
                inner.state = AppState::Reconf;
                inner.sync_pending = true;
            }
            SyncPlan::Migrate => {
                inner.state = AppState::Migrate;
                inner.sync_pending = true;
            }
            SyncPlan::Migrec => {
                inner.state = AppState::Migrec;
                inner.sync_pending = true;
            }
            SyncPlan::Block => unreachable!("commit_schedule never blocks"),
        }

        Ok(plan)
    }

    /// Record that the round assigned no resources to this application.
    pub fn mark_unscheduled(&self) -> SyncPlan {
        let mut inner = self.lock();
        match inner.state {
            AppState::Running | AppState::Starting => {
                inner.state = AppState::Blocked;
                inner.next_awm = None;
                inner.next_cluster = None;
                inner.sync_pending = true;
                SyncPlan::Block
            }
            // Already blocked (or inactive): nothing changed this round
            _ => SyncPlan::Unchanged,
        }
    }

    // ------------------------------------------------------------------
    // Synchronization-driven transitions
    // ------------------------------------------------------------------

    /// Acknowledge a completed reconfiguration: the next assignment becomes
    /// current and the application returns to `running`.
    pub fn ack_sync(&self) -> Result<(), ArbiterError> {
        let mut inner = self.lock();
        if !inner.state.is_synchronizing() {
            return Err(ArbiterError::internal(format!(
                "sync acknowledged for '{}' in state {}",
                self.id, inner.state
            )));
        }
        let changed = inner.next_awm != inner.current_awm;
        inner.current_awm = inner.next_awm.take();
        inner.current_cluster = inner.next_cluster.take();
        inner.state = AppState::Running;
        inner.sync_pending = false;
        if changed {
            // The menu moved under the client; any stale penalty is void
            inner.goal_gap = GoalGap::NONE;
        }
        Ok(())
    }

    /// Acknowledge that the application has been blocked and its resources
    /// reclaimed.
    pub fn ack_blocked(&self) -> Result<(), ArbiterError> {
        let mut inner = self.lock();
        if inner.state != AppState::Blocked {
            return Err(ArbiterError::internal(format!(
                "block acknowledged for '{}' in state {}",
                self.id, inner.state
            )));
        }
        inner.current_awm = None;
        inner.current_cluster = None;
        inner.next_awm = None;
        inner.next_cluster = None;
        inner.sync_pending = false;
        Ok(())
    }

    /// Undo this round's assignment after a rejected transition; the
    /// application keeps its previous working mode and is reconsidered in
    /// the next round.
    pub fn rollback_schedule(&self) {
        let mut inner = self.lock();
        inner.next_awm = None;
        inner.next_cluster = None;
        inner.sync_pending = false;
        inner.state = if inner.current_awm.is_some() {
            AppState::Running
        } else {
            AppState::Blocked
        };
    }

    // ------------------------------------------------------------------
    // Boundary-driven transitions
    // ------------------------------------------------------------------

    /// Re-admit a disabled application.
    pub fn enable(&self) -> Result<(), ArbiterError> {
        let mut inner = self.lock();
        if inner.state != AppState::Disabled {
            return Err(ArbiterError::internal(format!(
                "enable on '{}' in state {}",
                self.id, inner.state
            )));
        }
        inner.state = AppState::Starting;
        inner.sync_pending = false;
        Ok(())
    }

    /// Exclude the application from scheduling; its assignment is dropped.
    pub fn disable(&self) {
        let mut inner = self.lock();
        inner.state = AppState::Disabled;
        inner.current_awm = None;
        inner.current_cluster = None;
        inner.next_awm = None;
        inner.next_cluster = None;
        inner.sync_pending = false;
    }

    /// Terminal transition on deregistration or crash detection.
    pub fn finish(&self) {
        let mut inner = self.lock();
        inner.state = AppState::Finished;
        inner.next_awm = None;
        inner.next_cluster = None;
        inner.sync_pending = false;
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("Application")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("state", &inner.state)
            .field("current_awm", &inner.current_awm)
            .field("next_awm", &inner.next_awm)
            .finish()
    }
}

impl fmt::Display for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{} {}]", self.id, self.priority)
    }
}
