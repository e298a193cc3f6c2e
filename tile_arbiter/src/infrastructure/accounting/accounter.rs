// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Accounter
//!
//! Transactional, multi-versioned bookkeeping of resource allocations. The
//! accounter answers three questions, per view: how much of a resource
//! exists, how much is in use, and who is using it - and it changes the
//! answer only through atomic reservations.
//!
//! ## View Lifecycle
//!
//! - [`get_view`](ResourceAccounter::get_view) derives a fresh copy-on-write
//!   view from the committed system view
//! - [`reserve`](ResourceAccounter::reserve) /
//!   [`release`](ResourceAccounter::release) charge and discharge an
//!   application's bound usages within one view
//! - [`adopt_view`](ResourceAccounter::adopt_view) publishes a view as the
//!   new system view; holders of the previous system view keep reading it
//!   until they release their pins
//! - [`put_view`](ResourceAccounter::put_view) releases a pin (a no-op on
//!   the system view)
//!
//! ## Guarantees
//!
//! - **Conservation**: for every descriptor and view,
//!   `used + available == total`
//! - **Isolation**: writes through one token never change reads through
//!   another until adoption
//! - **Atomicity**: a failed reservation rolls back every charge it made
//!   and leaves the view untouched
//! - **Exactly-once**: a second `reserve` for the same application under the
//!   same view fails with `AppUsages`
//!
//! ## Locking
//!
//! The view map is guarded by an outer read/write lock; each view's
//! accounting slots by a per-view mutex taken only for the duration of a
//! query or reservation. Views are locked before their base, and bases are
//! never derived views, so lock ordering is acyclic.

use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, trace, warn};

use tile_arbiter_domain::{AppId, AppRef, ArbiterError, Resource, ResourcePath, UsagesMap, ViewToken};

use crate::infrastructure::accounting::view::{
    AccountingSlot, Charge, CommittedUsages, ViewState,
};
use crate::infrastructure::registry::resource_registry::ResourceRegistry;

type ViewArc = Arc<Mutex<ViewState>>;

struct AccounterState {
    views: HashMap<u32, ViewArc>,
    system: ViewToken,
    next: ViewToken,
}

/// Multi-view resource accounter.
pub struct ResourceAccounter {
    registry: Arc<ResourceRegistry>,
    state: RwLock<AccounterState>,
}

impl ResourceAccounter {
    /// Create an accounter over the given registry, with an empty committed
    /// system view.
    pub fn new(registry: Arc<ResourceRegistry>) -> Self {
        let mut views = HashMap::new();
        // The initial system view is a root: no base, one (system) pin
        views.insert(
            ViewToken::SYSTEM.raw(),
            Arc::new(Mutex::new(ViewState::new(ViewToken::SYSTEM, "system", None))),
        );
        ResourceAccounter {
            registry,
            state: RwLock::new(AccounterState {
                views,
                system: ViewToken::SYSTEM,
                next: ViewToken::SYSTEM.successor(),
            }),
        }
    }

    /// The registry this accounter accounts for
    pub fn registry(&self) -> &Arc<ResourceRegistry> {
        &self.registry
    }

    /// Token of the current system view
    pub fn system_token(&self) -> ViewToken {
        self.state.read().system
    }

    // ------------------------------------------------------------------
    // View lifecycle
    // ------------------------------------------------------------------

    /// Allocate a new view derived from the system view.
    ///
    /// `owner` identifies the requester for diagnostics. Fails with
    /// `NoMemory` when the token space is exhausted by live views; never
    /// fails for validity reasons.
    pub fn get_view(&self, owner: &str) -> Result<ViewToken, ArbiterError> {
        let mut state = self.state.write();

        let mut candidate = state.next;
        loop {
            if !candidate.is_system() && !state.views.contains_key(&candidate.raw()) {
                break;
            }
            candidate = candidate.successor();
            if candidate == state.next {
                return Err(ArbiterError::no_memory(
                    "resource state view tokens exhausted",
                ));
            }
        }
        state.next = candidate.successor();

        let base = state.system;
        let view = ViewState::new(candidate, owner, Some(base));
        state.views.insert(candidate.raw(), Arc::new(Mutex::new(view)));
        if let Some(base_arc) = state.views.get(&base.raw()) {
            base_arc.lock().pins += 1;
        }

        debug!(token = %candidate, owner, "resource state view created");
        Ok(candidate)
    }

    /// Release a pin on a view. A no-op on the (current) system view; fails
    /// with `UnknownView` for tokens that never existed or were already
    /// destroyed.
    pub fn put_view(&self, token: ViewToken) -> Result<(), ArbiterError> {
        let mut state = self.state.write();
        let raw = self.resolve_locked(&state, token);
        if raw == state.system {
            return Ok(());
        }
        if !state.views.contains_key(&raw.raw()) {
            return Err(ArbiterError::UnknownView(raw.raw()));
        }
        Self::unpin_locked(&mut state, raw);
        Ok(())
    }

    /// Replace the system view with `token`.
    ///
    /// The view's remaining fall-through accounting is materialized, its pin
    /// is repurposed as the system pin (the caller must not release the
    /// token afterwards), and the previous system view survives only while
    /// other holders still pin it.
    pub fn adopt_view(&self, token: ViewToken) -> Result<(), ArbiterError> {
        let mut state = self.state.write();
        let raw = self.resolve_locked(&state, token);
        if raw == state.system {
            return Ok(());
        }
        let view = state
            .views
            .get(&raw.raw())
            .cloned()
            .ok_or(ArbiterError::UnknownView(raw.raw()))?;

        // Flatten: copy every base slot and commitment the view did not
        // shadow, then cut the base link.
        let base_token = {
            let mut v = view.lock();
            let base_token = v.base.take();
            if let Some(bt) = base_token {
                if let Some(base_arc) = state.views.get(&bt.raw()) {
                    let b = base_arc.lock();
                    for (path, slot) in &b.slots {
                        v.slots
                            .entry(path.clone())
                            .or_insert_with(|| slot.clone());
                    }
                    for (app, committed) in &b.committed {
                        if !v.committed.contains_key(app) && !v.evicted.contains(app) {
                            v.committed.insert(app.clone(), committed.clone());
                        }
                    }
                }
            }
            base_token
        };

        if let Some(bt) = base_token {
            Self::unpin_locked(&mut state, bt);
        }

        let old_system = state.system;
        state.system = raw;
        Self::unpin_locked(&mut state, old_system);

        debug!(token = %raw, previous = %old_system, "system view adopted");
        Ok(())
    }

    fn resolve_locked(&self, state: &AccounterState, token: ViewToken) -> ViewToken {
        if token.is_system() {
            state.system
        } else {
            token
        }
    }

    fn unpin_locked(state: &mut AccounterState, token: ViewToken) {
        let destroy = match state.views.get(&token.raw()) {
            Some(view) => {
                let mut v = view.lock();
                v.pins = v.pins.saturating_sub(1);
                v.pins == 0 && token != state.system
            }
            None => false,
        };
        if destroy {
            trace!(token = %token, "resource state view destroyed");
            state.views.remove(&token.raw());
        }
    }

    /// Look up a live view together with its base, holding the map open.
    fn view_pair(
        &self,
        token: ViewToken,
    ) -> Result<(ViewArc, Option<ViewArc>), ArbiterError> {
        let state = self.state.read();
        let raw = self.resolve_locked(&state, token);
        let view = state
            .views
            .get(&raw.raw())
            .cloned()
            .ok_or(ArbiterError::UnknownView(raw.raw()))?;
        let base = {
            let v = view.lock();
            v.base
        };
        let base_arc = base.and_then(|b| state.views.get(&b.raw()).cloned());
        Ok((view, base_arc))
    }

    // ------------------------------------------------------------------
    // Read-only queries
    // ------------------------------------------------------------------

    /// Total capacity of every descriptor matching the path (1 descriptor
    /// for a fully indexed path).
    pub fn total(&self, query: &ResourcePath) -> u64 {
        self.registry
            .lookup_template(query)
            .iter()
            .map(|r| r.total())
            .sum()
    }

    /// Total capacity across a pre-resolved binding list
    pub fn total_of(&self, resources: &[Arc<Resource>]) -> u64 {
        resources.iter().map(|r| r.total()).sum()
    }

    /// Amount in use across every descriptor matching the path, under the
    /// given view.
    pub fn used(&self, query: &ResourcePath, token: ViewToken) -> Result<u64, ArbiterError> {
        let resources = self.registry.lookup_template(query);
        self.used_of(&resources, token)
    }

    /// Amount in use across a pre-resolved binding list
    pub fn used_of(
        &self,
        resources: &[Arc<Resource>],
        token: ViewToken,
    ) -> Result<u64, ArbiterError> {
        let (view, base) = self.view_pair(token)?;
        let v = view.lock();
        let b = base.as_ref().map(|a| a.lock());
        Ok(resources
            .iter()
            .map(|r| Self::effective(&v, b.as_deref(), r.path()).map(|s| s.used).unwrap_or(0))
            .sum())
    }

    /// Amount available across every descriptor matching the path.
    ///
    /// When `app` is supplied, the amount already charged to that
    /// application is added back, so a scheduler can treat a re-allocation
    /// to the same application as free.
    pub fn available(
        &self,
        query: &ResourcePath,
        token: ViewToken,
        app: Option<&AppId>,
    ) -> Result<u64, ArbiterError> {
        let resources = self.registry.lookup_template(query);
        self.available_of(&resources, token, app)
    }

    /// Amount available across a pre-resolved binding list
    pub fn available_of(
        &self,
        resources: &[Arc<Resource>],
        token: ViewToken,
        app: Option<&AppId>,
    ) -> Result<u64, ArbiterError> {
        let (view, base) = self.view_pair(token)?;
        let v = view.lock();
        let b = base.as_ref().map(|a| a.lock());
        let mut available = 0u64;
        for r in resources {
            let slot = Self::effective(&v, b.as_deref(), r.path());
            let used = slot.map(|s| s.used).unwrap_or(0);
            let addback = match (app, slot) {
                (Some(app), Some(slot)) => slot.charged_to(app),
                _ => 0,
            };
            available += r.total() - used + addback;
        }
        Ok(available)
    }

    /// Number of descriptors matching the path
    pub fn count(&self, query: &ResourcePath) -> usize {
        self.registry.lookup_template(query).len()
    }

    fn effective<'a>(
        view: &'a ViewState,
        base: Option<&'a ViewState>,
        path: &ResourcePath,
    ) -> Option<&'a AccountingSlot> {
        view.slot(path).or_else(|| base.and_then(|b| b.slot(path)))
    }

    // ------------------------------------------------------------------
    // Reservations
    // ------------------------------------------------------------------

    /// Commit an application's bound usages into a view.
    ///
    /// Walks each usage's binding list in order, drawing from every
    /// descriptor the minimum of the remaining request and the remaining
    /// availability, and records the committed slice on the usage. Any
    /// accounting the view currently observes for the application (inherited
    /// from the base view) is dropped first, so re-scheduling a running
    /// application never double-charges it.
    ///
    /// Errors: `MissUsages` on an empty map, `AppUsages` when the
    /// application already committed under this view, `UsageExceeded` when a
    /// positive residual cannot be satisfied - in which case every charge
    /// made by this call has been rolled back.
    pub fn reserve(
        &self,
        app: &AppRef,
        mut usages: UsagesMap,
        token: ViewToken,
    ) -> Result<(), ArbiterError> {
        if usages.is_empty() {
            return Err(ArbiterError::MissUsages(format!(
                "reserve for '{}' with no bound usages",
                app.id()
            )));
        }

        let (view, base) = self.view_pair(token)?;
        let mut v = view.lock();
        let b = base.as_ref().map(|a| a.lock());
        let b_ref = b.as_deref();

        if v.committed.contains_key(app.id()) {
            return Err(ArbiterError::AppUsages(format!(
                "'{}' already committed under {}",
                app.id(),
                token
            )));
        }

        // Saved originals for rollback; `None` marks a slot that was not
        // materialized in the overlay before this call.
        let mut saved: HashMap<ResourcePath, Option<AccountingSlot>> = HashMap::new();

        Self::drop_inherited(&mut v, b_ref, app.id(), &mut saved);

        let mut charges: Vec<Charge> = Vec::new();
        let mut failure: Option<ArbiterError> = None;

        'usages: for (path, usage) in usages.iter_mut() {
            let mut residual = usage.amount();
            let mut first_bind: Option<usize> = None;
            let mut last_bind = 0usize;
            let mut grants: Vec<(ResourcePath, u64)> = Vec::new();

            for (index, resource) in usage.binding_list().iter().enumerate() {
                if residual == 0 {
                    break;
                }
                let used = Self::effective(&v, b_ref, resource.path())
                    .map(|s| s.used)
                    .unwrap_or(0);
                let grant = residual.min(resource.total().saturating_sub(used));
                if grant == 0 {
                    continue;
                }
                grants.push((resource.path().clone(), grant));
                if first_bind.is_none() {
                    first_bind = Some(index);
                }
                last_bind = index;
                residual -= grant;
            }

            if residual > 0 {
                failure = Some(ArbiterError::usage_exceeded(format!(
                    "'{}' request {} for '{}' short by {} under {}",
                    app.id(),
                    usage.amount(),
                    path,
                    residual,
                    token
                )));
                break 'usages;
            }

            for (grant_path, amount) in grants {
                let seed = b_ref.and_then(|base| base.slot(&grant_path)).cloned();
                saved.entry(grant_path.clone())
                    .or_insert_with(|| v.slot(&grant_path).cloned());
                let slot = v.slot_mut_seeded(&grant_path, seed.as_ref());
                slot.used += amount;
                *slot.by_app.entry(app.id().clone()).or_insert(0) += amount;
                charges.push(Charge {
                    path: grant_path,
                    amount,
                });
            }

            let first = first_bind.unwrap_or(0);
            if let Err(err) = usage.commit_range(app.id().clone(), token, first, last_bind) {
                failure = Some(err);
                break 'usages;
            }
        }

        if let Some(err) = failure {
            for (path, original) in saved {
                match original {
                    Some(slot) => {
                        v.slots.insert(path, slot);
                    }
                    None => {
                        v.slots.remove(&path);
                    }
                }
            }
            warn!(app = %app.id(), token = %token, error = %err, "reservation rolled back");
            return Err(err);
        }

        trace!(app = %app.id(), token = %token, charges = charges.len(), "usages reserved");
        v.evicted.remove(app.id());
        v.committed
            .insert(app.id().clone(), CommittedUsages { usages, charges });
        Ok(())
    }

    /// Undo the usages committed by [`reserve`](Self::reserve) for an
    /// application under a view. Fails with `MissUsages` when nothing is
    /// committed.
    pub fn release(&self, app: &AppRef, token: ViewToken) -> Result<(), ArbiterError> {
        let (view, _) = self.view_pair(token)?;
        let mut v = view.lock();
        let committed = v.committed.remove(app.id()).ok_or_else(|| {
            ArbiterError::MissUsages(format!(
                "release for '{}' with nothing committed under {}",
                app.id(),
                token
            ))
        })?;

        for charge in &committed.charges {
            if let Some(slot) = v.slots.get_mut(&charge.path) {
                slot.used = slot.used.saturating_sub(charge.amount);
                if let Some(app_used) = slot.by_app.get_mut(app.id()) {
                    *app_used = app_used.saturating_sub(charge.amount);
                    if *app_used == 0 {
                        slot.by_app.remove(app.id());
                    }
                }
            }
        }

        v.evicted.insert(app.id().clone());
        trace!(app = %app.id(), token = %token, "usages released");
        Ok(())
    }

    /// Drop every charge the view observes for an application - committed
    /// through the view or inherited from its base. Idempotent; used when an
    /// application is blocked or leaves the system.
    pub fn evict(&self, app: &AppRef, token: ViewToken) -> Result<(), ArbiterError> {
        let (view, base) = self.view_pair(token)?;
        let mut v = view.lock();
        let b = base.as_ref().map(|a| a.lock());

        v.committed.remove(app.id());
        let mut saved = HashMap::new();
        Self::drop_inherited(&mut v, b.as_deref(), app.id(), &mut saved);
        v.evicted.insert(app.id().clone());
        Ok(())
    }

    /// The usages an application has committed under a view, if any.
    pub fn committed_usages(
        &self,
        app: &AppRef,
        token: ViewToken,
    ) -> Result<Option<UsagesMap>, ArbiterError> {
        let (view, _) = self.view_pair(token)?;
        let v = view.lock();
        Ok(v.committed.get(app.id()).map(|c| c.usages.clone()))
    }

    fn drop_inherited(
        v: &mut ViewState,
        base: Option<&ViewState>,
        app: &AppId,
        saved: &mut HashMap<ResourcePath, Option<AccountingSlot>>,
    ) {
        let mut paths: Vec<ResourcePath> = v
            .slots
            .iter()
            .filter(|(_, slot)| slot.charged_to(app) > 0)
            .map(|(path, _)| path.clone())
            .collect();
        if let Some(base) = base {
            for (path, slot) in &base.slots {
                if slot.charged_to(app) > 0 && !v.slots.contains_key(path) {
                    paths.push(path.clone());
                }
            }
        }

        for path in paths {
            let seed = base.and_then(|b| b.slot(&path)).cloned();
            saved
                .entry(path.clone())
                .or_insert_with(|| v.slot(&path).cloned());
            let slot = v.slot_mut_seeded(&path, seed.as_ref());
            let charged = slot.charged_to(app);
            slot.used = slot.used.saturating_sub(charged);
            slot.by_app.remove(app);
        }
    }

    /// Log the per-descriptor accounting of a view at debug level.
    pub fn report(&self, token: ViewToken) {
        let resources = self.registry.all();
        let Ok((view, base)) = self.view_pair(token) else {
            debug!(token = %token, "status report requested for unknown view");
            return;
        };
        let v = view.lock();
        let b = base.as_ref().map(|a| a.lock());
        for r in resources {
            let used = Self::effective(&v, b.as_deref(), r.path())
                .map(|s| s.used)
                .unwrap_or(0);
            debug!(
                resource = %r.path(),
                total = r.total(),
                used,
                available = r.total() - used,
                token = %token,
                "accounting status"
            );
        }
    }
}
