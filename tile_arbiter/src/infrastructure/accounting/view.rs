// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource State Views
//!
//! A view is a named snapshot of the resource accountings. The committed
//! *system* view holds the allocations currently enforced on the platform;
//! scheduler views are copy-on-write overlays derived from it - a view only
//! materializes the accounting slot of a descriptor it writes, and reads
//! fall through to the base view for everything else. Scheduler rounds touch
//! a small subset of descriptors, so overlays stay cheap.
//!
//! Each view carries the identity of its creator, its creation timestamp and
//! a pin count. A view stays alive while pinned; the previous system view is
//! therefore still readable by holders of its token after a successor has
//! been adopted.

use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};

use tile_arbiter_domain::{AppId, ResourcePath, UsagesMap, ViewToken};

/// Per-descriptor accounting: total drawn plus the per-application split.
#[derive(Debug, Clone, Default)]
pub struct AccountingSlot {
    /// Amount drawn from the descriptor in this view
    pub used: u64,
    /// Breakdown of `used` by application
    pub by_app: HashMap<AppId, u64>,
}

impl AccountingSlot {
    /// Amount charged to one application
    pub fn charged_to(&self, app: &AppId) -> u64 {
        self.by_app.get(app).copied().unwrap_or(0)
    }
}

/// One charge made against a descriptor, recorded for release and rollback.
#[derive(Debug, Clone)]
pub struct Charge {
    /// Descriptor path the charge was drawn from
    pub path: ResourcePath,
    /// Amount drawn
    pub amount: u64,
}

/// The usages an application committed into a view, with their charges.
#[derive(Debug, Clone)]
pub struct CommittedUsages {
    /// The bound usages, with committed slices recorded
    pub usages: UsagesMap,
    /// Flat charge journal backing `release`
    pub charges: Vec<Charge>,
}

/// One named snapshot of the accountings.
#[derive(Debug)]
pub struct ViewState {
    /// Token naming this view
    pub token: ViewToken,
    /// Identity of the creator, for diagnostics
    pub owner: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Number of holders pinning the view alive
    pub pins: usize,
    /// View reads fall through to this base for unmaterialized slots
    pub base: Option<ViewToken>,
    /// Copy-on-write accounting slots
    pub slots: HashMap<ResourcePath, AccountingSlot>,
    /// Per-application commitments made through this view
    pub committed: HashMap<AppId, CommittedUsages>,
    /// Applications whose inherited accounting was dropped in this view;
    /// their base-view charges must not resurface when the view is adopted
    pub evicted: HashSet<AppId>,
}

impl ViewState {
    /// Create a view deriving from `base` (or a root view when `None`).
    pub fn new(token: ViewToken, owner: impl Into<String>, base: Option<ViewToken>) -> Self {
        ViewState {
            token,
            owner: owner.into(),
            created_at: Utc::now(),
            pins: 1,
            base,
            slots: HashMap::new(),
            committed: HashMap::new(),
            evicted: HashSet::new(),
        }
    }

    /// Materialized slot lookup (no base fall-through).
    pub fn slot(&self, path: &ResourcePath) -> Option<&AccountingSlot> {
        self.slots.get(path)
    }

    /// Materialize a slot for writing, seeding it from the base slot the
    /// read side currently falls through to.
    pub fn slot_mut_seeded(
        &mut self,
        path: &ResourcePath,
        seed: Option<&AccountingSlot>,
    ) -> &mut AccountingSlot {
        self.slots
            .entry(path.clone())
            .or_insert_with(|| seed.cloned().unwrap_or_default())
    }
}
