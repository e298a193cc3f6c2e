// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Synchronization Policy
//!
//! The state-based ("SASB") ordering of applications through the
//! reconfiguration protocol.

pub mod sasb;

pub use sasb::{SasbPolicy, SyncSubset};
