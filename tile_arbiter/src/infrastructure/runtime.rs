// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Runtime Machinery
//!
//! Cooperative execution primitives of the arbiter:
//!
//! - [`deferrable::Deferrable`] - a named task whose executions are
//!   coalesced and may be periodic or on-demand

pub mod deferrable;

pub use deferrable::{Deferrable, DeferredTask};
