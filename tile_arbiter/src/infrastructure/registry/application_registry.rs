// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Registry
//!
//! Tracks every managed application in per-priority buckets. Iteration hands
//! out snapshots (cheap `Arc` clones), so callers never hold the registry
//! lock while driving state transitions - those are serialized by each
//! application's own mutex.

use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use tile_arbiter_domain::{AppId, AppRef, AppState, ArbiterError, Priority};

#[derive(Debug, Default)]
struct RegistryInner {
    by_id: HashMap<AppId, AppRef>,
    by_priority: BTreeMap<Priority, Vec<AppRef>>,
}

/// Registry of managed applications.
#[derive(Debug, Default)]
pub struct ApplicationRegistry {
    inner: RwLock<RegistryInner>,
}

impl ApplicationRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an application handle.
    ///
    /// Fails with `AlreadyExists` when the identifier is taken.
    pub fn register(&self, app: AppRef) -> Result<(), ArbiterError> {
        let mut inner = self.inner.write();
        if inner.by_id.contains_key(app.id()) {
            return Err(ArbiterError::already_exists(format!(
                "application '{}' already registered",
                app.id()
            )));
        }
        info!(app = %app, "application registered");
        inner.by_id.insert(app.id().clone(), app.clone());
        inner.by_priority.entry(app.priority()).or_default().push(app);
        Ok(())
    }

    /// Deregister an application; the handle transitions to `finished` and
    /// is returned so the caller can release its platform data.
    pub fn deregister(&self, id: &AppId) -> Result<AppRef, ArbiterError> {
        let mut inner = self.inner.write();
        let app = inner
            .by_id
            .remove(id)
            .ok_or_else(|| ArbiterError::not_found(format!("application '{}'", id)))?;
        let priority = app.priority();
        let bucket_empty = match inner.by_priority.get_mut(&priority) {
            Some(bucket) => {
                bucket.retain(|a| a.id() != id);
                bucket.is_empty()
            }
            None => false,
        };
        if bucket_empty {
            inner.by_priority.remove(&priority);
        }
        app.finish();
        debug!(app = %app, "application deregistered");
        Ok(app)
    }

    /// Look up an application by identifier
    pub fn get(&self, id: &AppId) -> Option<AppRef> {
        self.inner.read().by_id.get(id).cloned()
    }

    /// Snapshot of the applications in one priority class, registration
    /// order preserved.
    pub fn iter_by_prio(&self, priority: Priority) -> Vec<AppRef> {
        self.inner
            .read()
            .by_priority
            .get(&priority)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of applications in one priority class
    pub fn count_by_prio(&self, priority: Priority) -> usize {
        self.inner
            .read()
            .by_priority
            .get(&priority)
            .map(|b| b.len())
            .unwrap_or(0)
    }

    /// The numerically largest (least important) priority class in use.
    /// Empty registries report the highest class so iteration stays valid.
    pub fn lowest_prio(&self) -> Priority {
        self.inner
            .read()
            .by_priority
            .keys()
            .next_back()
            .copied()
            .unwrap_or(Priority::HIGHEST)
    }

    /// Whether any application currently is in the given state
    pub fn has_any(&self, state: AppState) -> bool {
        self.inner
            .read()
            .by_id
            .values()
            .any(|app| app.state() == state)
    }

    /// Snapshot of every registered application
    pub fn all(&self) -> Vec<AppRef> {
        self.inner.read().by_id.values().cloned().collect()
    }

    /// Snapshot of the applications in the given state with a pending
    /// synchronization step, ascending by priority class.
    pub fn sync_candidates(&self, state: AppState) -> Vec<AppRef> {
        let inner = self.inner.read();
        let mut apps: Vec<AppRef> = inner
            .by_priority
            .values()
            .flatten()
            .filter(|app| app.state() == state && app.sync_pending())
            .cloned()
            .collect();
        apps.sort_by_key(|a| a.priority());
        apps
    }

    /// Number of registered applications
    pub fn len(&self) -> usize {
        self.inner.read().by_id.len()
    }

    /// Whether no application is registered
    pub fn is_empty(&self) -> bool {
        self.inner.read().by_id.is_empty()
    }
}
