// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # SASB Synchronization Policy
//!
//! The Starvation-Avoidance State-Based heuristic yields the applications to
//! reconfigure in subsets, in a fixed order:
//!
//! 1. `blocked` - applications that lost all resources
//! 2. running → `migrate`, lower-priority band first, then higher
//! 3. running → `migrec`, lower band first, then higher
//! 4. running → `reconf`, lower band first, then higher
//! 5. `starting` - newly admitted applications
//!
//! Resources are reclaimed before they are redistributed, and redistributed
//! from lower-priority losers toward higher-priority winners, so a full pass
//! never starves a high-priority application on resources a low-priority one
//! is about to give up. A pass touches every pending application exactly
//! once and spans at most eight subsets.
//!
//! The policy also keeps the worst observed reconfiguration latency of the
//! round, which [`estimated_sync_time_ms`](SasbPolicy::estimated_sync_time_ms)
//! reports as the (coarse, worst-case) synchronization time estimate.

use parking_lot::Mutex;
use tracing::debug;

use tile_arbiter_domain::{AppRef, AppState, ArbiterError};

use crate::infrastructure::registry::application_registry::ApplicationRegistry;

/// Which half of the priority range a step addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PrioBand {
    All,
    Lower,
    Higher,
}

/// The fixed step sequence of one synchronization pass.
const STEPS: [(AppState, PrioBand); 8] = [
    (AppState::Blocked, PrioBand::All),
    (AppState::Migrate, PrioBand::Lower),
    (AppState::Migrate, PrioBand::Higher),
    (AppState::Migrec, PrioBand::Lower),
    (AppState::Migrec, PrioBand::Higher),
    (AppState::Reconf, PrioBand::Lower),
    (AppState::Reconf, PrioBand::Higher),
    (AppState::Starting, PrioBand::All),
];

/// One yielded subset: the synchronization state being served and its
/// members, ascending by priority class.
#[derive(Debug)]
pub struct SyncSubset {
    /// State every member must be transitioned through
    pub state: AppState,
    /// The applications to reconfigure
    pub apps: Vec<AppRef>,
}

/// The SASB synchronization policy.
#[derive(Debug, Default)]
pub struct SasbPolicy {
    step: Mutex<usize>,
    max_latency_ms: Mutex<u64>,
}

impl SasbPolicy {
    /// Create the policy at the start of its first round
    pub fn new() -> Self {
        Self::default()
    }

    /// Yield the next non-empty subset of applications to reconfigure, or
    /// `None` when the pass is complete.
    ///
    /// `restart` rewinds to the first step and resets the latency
    /// bookkeeping; pass it once per round.
    pub fn next_subset(
        &self,
        apps: &ApplicationRegistry,
        restart: bool,
    ) -> Option<SyncSubset> {
        let mut step = self.step.lock();
        if restart {
            debug!("resetting synchronization status");
            *step = 0;
            *self.max_latency_ms.lock() = 0;
        }

        // The lower band holds the priority classes above the midpoint of
        // the active range; with a single active class the band is empty
        // and the state is served in one subset.
        let split = apps.lowest_prio().class() / 2;

        while *step < STEPS.len() {
            let (state, band) = STEPS[*step];
            *step += 1;

            let members: Vec<AppRef> = apps
                .sync_candidates(state)
                .into_iter()
                .filter(|app| match band {
                    PrioBand::All => true,
                    PrioBand::Lower => app.priority().class() > split,
                    PrioBand::Higher => app.priority().class() <= split,
                })
                .collect();

            if members.is_empty() {
                debug!(%state, ?band, "no applications to serve");
                continue;
            }

            debug!(%state, ?band, count = members.len(), "serving subset");
            return Some(SyncSubset {
                state,
                apps: members,
            });
        }

        None
    }

    /// Record an observed reconfiguration latency and validate it against
    /// the application's ceiling.
    pub fn check_latency(&self, app: &AppRef, latency_ms: u64) -> Result<(), ArbiterError> {
        let mut worst = self.max_latency_ms.lock();
        if latency_ms > *worst {
            *worst = latency_ms;
        }
        drop(worst);

        match app.latency_ceiling_ms() {
            Some(ceiling) if latency_ms > ceiling => Err(ArbiterError::Violation(format!(
                "'{}' reconfigured in {}ms over its {}ms ceiling",
                app.id(),
                latency_ms,
                ceiling
            ))),
            _ => Ok(()),
        }
    }

    /// Worst-case reconfiguration latency observed in the current round
    pub fn estimated_sync_time_ms(&self) -> u64 {
        *self.max_latency_ms.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tile_arbiter_domain::{AppId, Application, Priority};

    fn registered(apps: &ApplicationRegistry, name: &str, prio: u8) -> AppRef {
        let app = Arc::new(Application::new(
            AppId::new(name).unwrap(),
            Priority::new(prio).unwrap(),
            Vec::new(),
        ));
        apps.register(app.clone()).unwrap();
        app
    }

    /// Drive an application into a synchronization state with a pending
    /// flag, the way a scheduling round would.
    fn force_state(app: &AppRef, state: AppState) {
        match state {
            AppState::Starting => {
                app.commit_schedule(0, 0).unwrap();
            }
            AppState::Blocked => {
                app.mark_unscheduled();
            }
            AppState::Reconf => {
                app.commit_schedule(0, 0).unwrap();
                app.ack_sync().unwrap();
                app.commit_schedule(1, 0).unwrap();
            }
            AppState::Migrate => {
                app.commit_schedule(0, 0).unwrap();
                app.ack_sync().unwrap();
                app.commit_schedule(0, 1).unwrap();
            }
            AppState::Migrec => {
                app.commit_schedule(0, 0).unwrap();
                app.ack_sync().unwrap();
                app.commit_schedule(1, 1).unwrap();
            }
            _ => unreachable!("not a synchronization state"),
        }
        assert_eq!(app.state(), state);
    }

    #[test]
    fn test_reference_ordering() {
        let apps = ApplicationRegistry::new();
        let x = registered(&apps, "x", 0);
        let y = registered(&apps, "y", 1);
        let z = registered(&apps, "z", 0);
        let w = registered(&apps, "w", 1);

        force_state(&x, AppState::Blocked);
        force_state(&y, AppState::Migrate); // lower-priority band
        force_state(&z, AppState::Reconf); // higher-priority band
        force_state(&w, AppState::Starting);

        let policy = SasbPolicy::new();

        let subset = policy.next_subset(&apps, true).unwrap();
        assert_eq!(subset.state, AppState::Blocked);
        assert_eq!(subset.apps.len(), 1);
        assert_eq!(subset.apps[0].id(), x.id());
        x.ack_blocked().unwrap();

        let subset = policy.next_subset(&apps, false).unwrap();
        assert_eq!(subset.state, AppState::Migrate);
        assert_eq!(subset.apps[0].id(), y.id());
        y.ack_sync().unwrap();

        let subset = policy.next_subset(&apps, false).unwrap();
        assert_eq!(subset.state, AppState::Reconf);
        assert_eq!(subset.apps[0].id(), z.id());
        z.ack_sync().unwrap();

        let subset = policy.next_subset(&apps, false).unwrap();
        assert_eq!(subset.state, AppState::Starting);
        assert_eq!(subset.apps[0].id(), w.id());
        w.ack_sync().unwrap();

        assert!(policy.next_subset(&apps, false).is_none());
    }

    #[test]
    fn test_each_pending_app_served_once_within_eight_steps() {
        let apps = ApplicationRegistry::new();
        let states = [
            AppState::Blocked,
            AppState::Migrate,
            AppState::Migrec,
            AppState::Reconf,
            AppState::Starting,
        ];
        for (index, state) in states.iter().enumerate() {
            let lo = registered(&apps, &format!("lo{}", index), 3);
            force_state(&lo, *state);
            let hi = registered(&apps, &format!("hi{}", index), 0);
            force_state(&hi, *state);
        }

        let policy = SasbPolicy::new();
        let mut served = 0usize;
        let mut subsets = 0usize;
        let mut restart = true;
        while let Some(subset) = policy.next_subset(&apps, restart) {
            restart = false;
            subsets += 1;
            for app in &subset.apps {
                served += 1;
                match subset.state {
                    AppState::Blocked => app.ack_blocked().unwrap(),
                    _ => app.ack_sync().unwrap(),
                }
            }
        }

        assert_eq!(served, 10);
        assert!(subsets <= 8, "{} subsets", subsets);
    }

    #[test]
    fn test_latency_bookkeeping() {
        let apps = ApplicationRegistry::new();
        let app = registered(&apps, "a", 0);
        app.set_latency_ceiling_ms(Some(50));

        let policy = SasbPolicy::new();
        policy.check_latency(&app, 20).unwrap();
        assert_eq!(policy.estimated_sync_time_ms(), 20);

        let err = policy.check_latency(&app, 80).unwrap_err();
        assert!(matches!(err, ArbiterError::Violation(_)));
        assert_eq!(policy.estimated_sync_time_ms(), 80);

        // A new round resets the worst case
        force_state(&app, AppState::Blocked);
        policy.next_subset(&apps, true);
        assert_eq!(policy.estimated_sync_time_ms(), 0);
    }
}
