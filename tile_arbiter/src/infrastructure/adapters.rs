// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Port Adapters
//!
//! Concrete implementations of the domain service ports:
//!
//! - [`toml_recipe_loader::TomlRecipeLoader`] - recipes as TOML documents
//! - [`passthrough_proxy::PassthroughProxy`] - a log-only platform backend

pub mod passthrough_proxy;
pub mod toml_recipe_loader;

pub use passthrough_proxy::PassthroughProxy;
pub use toml_recipe_loader::TomlRecipeLoader;
