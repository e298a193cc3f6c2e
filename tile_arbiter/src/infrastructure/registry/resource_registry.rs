// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Registry
//!
//! Hierarchical naming and lookup of resource descriptors. Registration is
//! one-shot at startup (duplicates fail with `AlreadyExists`); afterwards
//! the registry is effectively immutable and every read hands out cheap
//! `Arc` clones.
//!
//! Template lookup matches segment-by-segment against the stored paths:
//! `tile.cluster.pe` addresses every processing element on the platform,
//! `tile0.cluster2.pe` the processing elements of one cluster. Lookup is
//! O(descriptors · depth) and does not need to be faster - registries hold
//! tens of descriptors, not millions.

use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

use tile_arbiter_domain::{ArbiterError, Resource, ResourceCatalog, ResourcePath};

/// Registry of platform resource descriptors.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    by_path: RwLock<BTreeMap<ResourcePath, Arc<Resource>>>,
}

impl ResourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource with its total capacity.
    ///
    /// Fails with `AlreadyExists` on a duplicate path and propagates the
    /// descriptor validation errors (template path, zero capacity).
    pub fn register(&self, path: ResourcePath, total: u64) -> Result<Arc<Resource>, ArbiterError> {
        let resource = Arc::new(Resource::new(path.clone(), total)?);
        let mut by_path = self.by_path.write();
        if by_path.contains_key(&path) {
            return Err(ArbiterError::already_exists(format!(
                "resource '{}' already registered",
                path
            )));
        }
        debug!(resource = %resource, "registered platform resource");
        by_path.insert(path, resource.clone());
        Ok(resource)
    }

    /// Exact-path lookup; absent is not an error.
    pub fn lookup_exact(&self, path: &ResourcePath) -> Option<Arc<Resource>> {
        self.by_path.read().get(path).cloned()
    }

    /// Every descriptor matching the query path (template or partially
    /// indexed).
    pub fn lookup_template(&self, query: &ResourcePath) -> Vec<Arc<Resource>> {
        self.by_path
            .read()
            .values()
            .filter(|r| r.path().matches(query))
            .cloned()
            .collect()
    }

    /// Number of registered descriptors
    pub fn len(&self) -> usize {
        self.by_path.read().len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.by_path.read().is_empty()
    }

    /// Every registered descriptor, in path order
    pub fn all(&self) -> Vec<Arc<Resource>> {
        self.by_path.read().values().cloned().collect()
    }

    /// Distinct indices of the named segment across registered paths,
    /// ascending (e.g. the cluster ids of the platform).
    pub fn segment_ids(&self, segment_name: &str) -> Vec<u16> {
        let mut ids: Vec<u16> = self
            .by_path
            .read()
            .keys()
            .filter_map(|p| p.id_of(segment_name))
            .collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }
}

impl ResourceCatalog for ResourceRegistry {
    fn resource(&self, path: &ResourcePath) -> Option<Arc<Resource>> {
        self.lookup_exact(path)
    }

    fn resources_matching(&self, query: &ResourcePath) -> Vec<Arc<Resource>> {
        self.lookup_template(query)
    }

    fn count_by_type(&self, type_name: &str) -> usize {
        self.by_path
            .read()
            .values()
            .filter(|r| r.type_name() == type_name)
            .count()
    }

    fn count_types(&self) -> usize {
        let by_path = self.by_path.read();
        let mut types: Vec<&str> = by_path.values().map(|r| r.type_name()).collect();
        types.sort_unstable();
        types.dedup();
        types.len()
    }
}
