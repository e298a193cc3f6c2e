// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Value Objects
//!
//! Validated, immutable value types used throughout the arbiter:
//!
//! - [`resource_path::ResourcePath`] - dotted, indexed hierarchical resource
//!   keys and their templates
//! - [`view_token::ViewToken`] - opaque names for resource state views
//! - [`priority::Priority`] - dense application priority classes (0 highest)
//! - [`goal_gap::GoalGap`] - Normalized Actual Penalty reported by clients
//! - [`app_id::AppId`] - stable application identifiers

pub mod app_id;
pub mod goal_gap;
pub mod priority;
pub mod resource_path;
pub mod view_token;

pub use app_id::AppId;
pub use goal_gap::GoalGap;
pub use priority::Priority;
pub use resource_path::ResourcePath;
pub use view_token::ViewToken;
