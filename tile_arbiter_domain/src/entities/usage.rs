// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Usage Entity
//!
//! One resource request of a working mode, after binding: the requested
//! amount plus the ordered list of resource descriptors that, together, may
//! satisfy it. The binding list is produced by
//! [`WorkingMode::bind_resource`](crate::entities::working_mode::WorkingMode::bind_resource);
//! the accounter later walks the list in order and records the committed
//! slice `first_bind..=last_bind` together with the owning application and
//! the view token under which the commitment lives.
//!
//! Invariant: the sum of the shares granted across the committed slice
//! equals the requested amount.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::entities::resource::Resource;
use crate::error::ArbiterError;
use crate::value_objects::app_id::AppId;
use crate::value_objects::resource_path::ResourcePath;
use crate::value_objects::view_token::ViewToken;

/// Ordered map of bound usages, keyed by the bound resource path.
pub type UsagesMap = BTreeMap<ResourcePath, Usage>;

/// A bound resource request.
#[derive(Debug, Clone)]
pub struct Usage {
    amount: u64,
    bindings: Vec<Arc<Resource>>,
    committed: Option<Commitment>,
}

/// The slice of the binding list granted to an application under a view.
#[derive(Debug, Clone)]
struct Commitment {
    owner: AppId,
    view: ViewToken,
    first_bind: usize,
    last_bind: usize,
}

impl Usage {
    /// Create a usage for the requested amount, with an empty binding list.
    pub fn new(amount: u64) -> Self {
        Usage {
            amount,
            bindings: Vec::new(),
            committed: None,
        }
    }

    /// Requested amount
    pub fn amount(&self) -> u64 {
        self.amount
    }

    /// Replace the binding list, discarding any previous commitment.
    pub fn set_binding_list(&mut self, bindings: Vec<Arc<Resource>>) {
        self.bindings = bindings;
        self.committed = None;
    }

    /// The ordered binding list
    pub fn binding_list(&self) -> &[Arc<Resource>] {
        &self.bindings
    }

    /// Whether the binding list is non-empty
    pub fn is_bound(&self) -> bool {
        !self.bindings.is_empty()
    }

    /// Record the committed slice of the binding list.
    ///
    /// Fails with `AppMismatch` when re-committing under a different owner
    /// without an intervening [`clear_commitment`](Self::clear_commitment),
    /// and with `Internal` when the slice is out of bounds.
    pub fn commit_range(
        &mut self,
        owner: AppId,
        view: ViewToken,
        first_bind: usize,
        last_bind: usize,
    ) -> Result<(), ArbiterError> {
        if let Some(existing) = &self.committed {
            if existing.owner != owner {
                return Err(ArbiterError::AppMismatch(format!(
                    "usage already committed to '{}', not '{}'",
                    existing.owner, owner
                )));
            }
        }
        if first_bind > last_bind || last_bind >= self.bindings.len() {
            return Err(ArbiterError::internal(format!(
                "commit slice {}..={} outside binding list of {}",
                first_bind,
                last_bind,
                self.bindings.len()
            )));
        }
        self.committed = Some(Commitment {
            owner,
            view,
            first_bind,
            last_bind,
        });
        Ok(())
    }

    /// Drop the commitment, keeping the binding list.
    pub fn clear_commitment(&mut self) {
        self.committed = None;
    }

    /// Owning application, once committed
    pub fn owner(&self) -> Option<&AppId> {
        self.committed.as_ref().map(|c| &c.owner)
    }

    /// View token the commitment lives under
    pub fn view(&self) -> Option<ViewToken> {
        self.committed.as_ref().map(|c| c.view)
    }

    /// The committed slice of the binding list (empty when uncommitted).
    pub fn committed_slice(&self) -> &[Arc<Resource>] {
        match &self.committed {
            Some(c) => &self.bindings[c.first_bind..=c.last_bind],
            None => &[],
        }
    }
}
