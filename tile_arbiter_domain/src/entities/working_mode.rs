// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Working Mode Entity
//!
//! An Application Working Mode (AWM): a pre-declared pairing of a static
//! quality value with a set of resource requests. Requests are expressed
//! against path templates (`tile.cluster.pe = 4`); before the scheduler can
//! evaluate an AWM on a concrete cluster the requests must be *bound*,
//! replacing the template cluster identifier with a physical one and
//! resolving each request to the descriptors that can satisfy it.
//!
//! ## Resource Binding
//!
//! [`WorkingMode::bind_resource`] resolves every request whose template
//! contains the named segment, producing a materialized [`UsagesMap`] keyed
//! by the caller's cluster key. Binding is all-or-nothing: if any request
//! cannot be mapped to registered descriptors the partial mapping is
//! discarded and `IncompleteBind` is returned. After a successful bind every
//! usage has a non-empty binding list.

use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};

use crate::entities::usage::{Usage, UsagesMap};
use crate::error::ArbiterError;
use crate::repositories::resource_catalog::ResourceCatalog;
use crate::value_objects::resource_path::ResourcePath;

/// An application working mode.
#[derive(Debug, Clone)]
pub struct WorkingMode {
    id: u8,
    name: String,
    value: f32,
    requests: BTreeMap<ResourcePath, u64>,
    bindings: HashMap<u16, UsagesMap>,
}

impl WorkingMode {
    /// Create a working mode with its static quality value in `[0, 1]`.
    pub fn new<S: Into<String>>(id: u8, name: S, value: f32) -> Result<Self, ArbiterError> {
        if !(0.0..=1.0).contains(&value) || !value.is_finite() {
            return Err(ArbiterError::invalid_parameter(format!(
                "working mode value {} outside [0, 1]",
                value
            )));
        }
        Ok(WorkingMode {
            id,
            name: name.into(),
            value,
            requests: BTreeMap::new(),
            bindings: HashMap::new(),
        })
    }

    /// Working mode identifier, stable within the application
    pub fn id(&self) -> u8 {
        self.id
    }

    /// Human-readable name from the recipe
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Static quality value in `[0, 1]`
    pub fn value(&self) -> f32 {
        self.value
    }

    /// Add a resource request against a path template.
    ///
    /// Duplicate templates accumulate, so a recipe may split one request
    /// across entries.
    pub fn add_request(&mut self, template: ResourcePath, amount: u64) -> Result<(), ArbiterError> {
        if amount == 0 {
            return Err(ArbiterError::invalid_parameter(format!(
                "zero-amount request for '{}' in working mode {}",
                template, self.id
            )));
        }
        *self.requests.entry(template).or_insert(0) += amount;
        Ok(())
    }

    /// The declared requests, template → amount
    pub fn requests(&self) -> &BTreeMap<ResourcePath, u64> {
        &self.requests
    }

    /// Bind every request whose path contains `segment_name` to the physical
    /// identifier `dst_id`, materializing the result under `cluster_key`.
    ///
    /// `src_id` restricts binding to requests whose segment currently carries
    /// that index; `None` acts as a wildcard (the common case, since recipe
    /// requests are templates).
    ///
    /// Returns the materialized map. On `IncompleteBind` no mapping is stored
    /// for `cluster_key`.
    pub fn bind_resource(
        &mut self,
        catalog: &dyn ResourceCatalog,
        segment_name: &str,
        src_id: Option<u16>,
        dst_id: u16,
        cluster_key: u16,
    ) -> Result<&UsagesMap, ArbiterError> {
        let mut bound: UsagesMap = BTreeMap::new();
        let mut missing: Vec<String> = Vec::new();

        for (template, amount) in &self.requests {
            let bound_path = if template.segments().iter().any(|s| {
                s.name() == segment_name && (src_id.is_none() || s.id() == src_id)
            }) {
                template.with_segment_id(segment_name, dst_id)?
            } else {
                template.clone()
            };

            let descriptors = catalog.resources_matching(&bound_path);
            if descriptors.is_empty() {
                missing.push(bound_path.to_string());
                continue;
            }

            let mut usage = Usage::new(*amount);
            usage.set_binding_list(descriptors);
            bound.insert(bound_path, usage);
        }

        if !missing.is_empty() {
            return Err(ArbiterError::incomplete_bind(format!(
                "working mode {} bound {}/{} requests to {}{}; unresolved: [{}]",
                self.id,
                bound.len(),
                self.requests.len(),
                segment_name,
                dst_id,
                missing.join(", ")
            )));
        }

        // A re-bind replaces any stale mapping for the key
        match self.bindings.entry(cluster_key) {
            Entry::Occupied(mut entry) => {
                entry.insert(bound);
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => Ok(entry.insert(bound)),
        }
    }

    /// The materialized mapping for a cluster key, if bound
    pub fn binding(&self, cluster_key: u16) -> Option<&UsagesMap> {
        self.bindings.get(&cluster_key)
    }

    /// Drop every materialized mapping (start of a new scheduling round).
    pub fn clear_bindings(&mut self) {
        self.bindings.clear();
    }
}
