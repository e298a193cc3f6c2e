// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Recipe Loader Port
//!
//! A recipe declares an application's working-mode menu: per AWM an id, a
//! static value in `[0, 1]`, and a sequence of resource requests (path
//! template plus amount, with optional K/M/G unit suffixes). Plugin-data
//! sections are opaque key-value pairs namespaced per backend and end up in
//! the application's attribute container.
//!
//! The core consumes recipes exclusively through this port. A load can
//! succeed outright, succeed *weakly* (some request templates cannot be
//! resolved on this platform but the recipe is otherwise valid), or fail
//! with `NotFound` / `FormatError`.

use async_trait::async_trait;

use crate::attributes::AttributeContainer;
use crate::entities::working_mode::WorkingMode;
use crate::error::ArbiterError;
use crate::value_objects::priority::Priority;

/// Parsed recipe content.
#[derive(Debug, Clone)]
pub struct Recipe {
    /// Priority class the application requests
    pub priority: Priority,
    /// Declared working-mode menu, in recipe order
    pub working_modes: Vec<WorkingMode>,
    /// Reconfiguration latency ceiling in milliseconds, if declared
    pub latency_ceiling_ms: Option<u64>,
    /// Opaque per-backend sections
    pub plugin_data: AttributeContainer,
}

/// How completely the recipe resolved against the platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeQuality {
    /// Every request template matched registered resources
    Complete,
    /// The recipe is valid but the listed templates matched nothing
    Weak { unresolved: Vec<String> },
}

/// Result of a successful (possibly weak) load.
#[derive(Debug, Clone)]
pub struct RecipeLoad {
    /// The parsed recipe
    pub recipe: Recipe,
    /// Resolution quality
    pub quality: RecipeQuality,
}

/// Loads recipes by application name.
#[async_trait]
pub trait RecipeLoader: Send + Sync {
    /// Load the recipe registered under `recipe_name`.
    ///
    /// Errors: `NotFound` when no recipe exists under that name,
    /// `FormatError` when the file cannot be parsed or fails validation.
    async fn load(&self, recipe_name: &str) -> Result<RecipeLoad, ArbiterError>;
}
