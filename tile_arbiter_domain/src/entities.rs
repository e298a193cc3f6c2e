// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Entities
//!
//! Identity-bearing domain objects:
//!
//! - [`resource::Resource`] - a registered resource descriptor
//! - [`usage::Usage`] - one resource request together with its binding list
//!   and committed slice
//! - [`working_mode::WorkingMode`] - an application working mode (AWM)
//! - [`application::Application`] - a managed application and its
//!   synchronization state machine

pub mod application;
pub mod resource;
pub mod usage;
pub mod working_mode;

pub use application::{AppRef, AppState, Application, SyncPlan};
pub use resource::Resource;
pub use usage::{Usage, UsagesMap};
pub use working_mode::WorkingMode;
