// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Layer
//!
//! Use-case orchestration above the domain and infrastructure layers:
//!
//! - [`services::resource_manager::ResourceManager`] - drives scheduling
//!   rounds and the synchronization protocol, and handles client requests

pub mod services;
