// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Resource Descriptor Entity
//!
//! A registered platform resource: canonical path plus total capacity. The
//! capacity is unit-agnostic (processing-element shares, memory bytes) and
//! immutable after registration.
//!
//! Descriptors are owned by the resource registry and shared as
//! `Arc<Resource>`; all mutable accounting state lives in the resource
//! accounter's views, keyed by the descriptor path, so descriptors stay
//! read-only and lock-free after startup.

use std::fmt;

use crate::error::ArbiterError;
use crate::value_objects::resource_path::ResourcePath;

/// Registered resource descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    path: ResourcePath,
    total: u64,
}

impl Resource {
    /// Create a descriptor with its one-shot total capacity.
    ///
    /// The path must be concrete (every segment indexed) so the descriptor
    /// addresses exactly one platform resource.
    pub fn new(path: ResourcePath, total: u64) -> Result<Self, ArbiterError> {
        if !path.is_concrete() {
            return Err(ArbiterError::invalid_parameter(format!(
                "resource path '{}' is not fully indexed",
                path
            )));
        }
        if total == 0 {
            return Err(ArbiterError::invalid_parameter(format!(
                "resource '{}' registered with zero capacity",
                path
            )));
        }
        Ok(Resource { path, total })
    }

    /// Canonical path
    pub fn path(&self) -> &ResourcePath {
        &self.path
    }

    /// Total capacity, set at registration and immutable
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Resource type name (leaf segment name, e.g. `pe`, `mem`)
    pub fn type_name(&self) -> &str {
        self.path.type_name()
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (total {})", self.path, self.total)
    }
}
