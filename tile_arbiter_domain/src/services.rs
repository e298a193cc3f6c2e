// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Domain Service Ports
//!
//! Interfaces the arbiter core consumes from its collaborators:
//!
//! - [`recipe_loader::RecipeLoader`] - loads an application's working-mode
//!   menu from its recipe
//! - [`platform_proxy::PlatformProxy`] - applies resource assignments on the
//!   target platform
//! - [`client_api`] - request and event types exchanged with application
//!   processes

pub mod client_api;
pub mod platform_proxy;
pub mod recipe_loader;

pub use client_api::{ClientRequest, ClientResponse, GwmEvent};
pub use platform_proxy::PlatformProxy;
pub use recipe_loader::{Recipe, RecipeLoad, RecipeLoader, RecipeQuality};
