// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Registries
//!
//! In-memory registries for the two long-lived entity populations:
//!
//! - [`resource_registry::ResourceRegistry`] - resource descriptors, filled
//!   once at startup, lock-free to read afterwards
//! - [`application_registry::ApplicationRegistry`] - managed applications in
//!   per-priority buckets

pub mod application_registry;
pub mod resource_registry;

pub use application_registry::ApplicationRegistry;
pub use resource_registry::ResourceRegistry;
