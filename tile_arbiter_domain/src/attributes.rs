// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Attribute Container
//!
//! Namespaced, opaque per-entity metadata. Applications, working modes and
//! recipes carry an [`AttributeContainer`] so platform backends and policy
//! modules can attach their own data (control-group handles, cached scoring
//! hints) without the domain model knowing the payload shape.
//!
//! Keys are `(namespace, key)` pairs; payloads are tagged variants owned by
//! the entity. Typical namespaces are the backend or policy module name
//! (e.g. `cgroups`, `yams`).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tagged attribute payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum AttributeValue {
    /// UTF-8 text
    Text(String),
    /// Signed integer
    Integer(i64),
    /// Unsigned integer
    Unsigned(u64),
    /// Boolean flag
    Boolean(bool),
    /// Raw bytes
    Blob(Vec<u8>),
}

/// Namespaced `(ns, key) → value` container.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttributeContainer {
    namespaces: BTreeMap<String, BTreeMap<String, AttributeValue>>,
}

impl AttributeContainer {
    /// Create an empty container
    pub fn new() -> Self {
        Self::default()
    }

    /// Set an attribute, replacing any previous value under the same key.
    pub fn set<N, K>(&mut self, ns: N, key: K, value: AttributeValue)
    where
        N: Into<String>,
        K: Into<String>,
    {
        self.namespaces
            .entry(ns.into())
            .or_default()
            .insert(key.into(), value);
    }

    /// Look up an attribute
    pub fn get(&self, ns: &str, key: &str) -> Option<&AttributeValue> {
        self.namespaces.get(ns).and_then(|m| m.get(key))
    }

    /// Remove one attribute; returns the removed value if present.
    pub fn clear(&mut self, ns: &str, key: &str) -> Option<AttributeValue> {
        let values = self.namespaces.get_mut(ns)?;
        let removed = values.remove(key);
        if values.is_empty() {
            self.namespaces.remove(ns);
        }
        removed
    }

    /// Remove every attribute under a namespace; returns how many were
    /// dropped.
    pub fn clear_namespace(&mut self, ns: &str) -> usize {
        self.namespaces.remove(ns).map(|m| m.len()).unwrap_or(0)
    }

    /// Iterate `(key, value)` pairs of one namespace
    pub fn namespace(&self, ns: &str) -> impl Iterator<Item = (&str, &AttributeValue)> {
        self.namespaces
            .get(ns)
            .into_iter()
            .flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), v)))
    }

    /// Absorb every attribute of another container, overwriting clashes.
    pub fn merge(&mut self, other: AttributeContainer) {
        for (ns, values) in other.namespaces {
            self.namespaces.entry(ns).or_default().extend(values);
        }
    }

    /// Whether the container holds no attributes
    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
    }
}
