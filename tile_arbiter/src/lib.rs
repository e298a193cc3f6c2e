// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

// Production code safety enforced via CI and `make lint-strict`
// (lib/bins checked separately from tests - tests may use unwrap/expect)

//! # Tile Arbiter
//!
//! A run-time resource manager (RTRM) for heterogeneous many-core platforms,
//! built with Rust. The arbiter distributes a shared pool of compute
//! resources - processing elements and memory banks organized in tiles and
//! clusters - among long-lived applications whose performance-vs-resource
//! tradeoffs are pre-declared as a menu of alternative working modes (AWMs).
//!
//! ## Architecture Overview
//!
//! The system follows Clean Architecture and Domain-Driven Design principles:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                  Application Layer                          │
//! │  (Resource Manager Service, Client Request Handling)       │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    Domain Layer                             │
//! │  (Applications, Working Modes, Usages, Paths, Ports)        │
//! └─────────────────────────────────────────────────────────────┘
//!                                │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                Infrastructure Layer                         │
//! │  (Registries, Accounter, Policies, Deferrable, Adapters)    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Core Concepts
//!
//! ### Resource State Views
//! The resource accounter is multi-versioned. Every scheduling round opens a
//! fresh *view* of the bookkeeping - a copy-on-write overlay over the
//! committed system view - reserves resources into it, and publishes it
//! atomically at the end of a clean synchronization pass. Readers holding
//! the previous system view keep seeing it until they release.
//!
//! ### Weighted-Metrics Scheduling
//! The scheduling policy enumerates `(application, working mode, cluster)`
//! candidates, scores each through a set of pluggable contributions
//! (AWM value, reconfiguration cost, congestion, fairness), sorts by the
//! weighted metrics and greedily reserves resources in that order.
//!
//! ### State-Based Synchronization
//! Applications whose assignment changed are reconfigured in a deterministic
//! order - blocked first, then migrations and reconfigurations from
//! lower-priority losers toward higher-priority winners, newly admitted
//! applications last - so resources are reclaimed before they are
//! redistributed and transient starvation is avoided.
//!
//! ### Deferred Execution
//! Scheduling rounds are driven by a deferrable executor that coalesces
//! bursts of re-scheduling requests into a single round, with an optional
//! periodic tick.
//!
//! ## One Scheduling Round
//!
//! ```text
//! trigger → deferrable fires → new view → policy scores and reserves
//!         → sync subsets applied via platform proxy → view adopted
//! ```

pub mod application;
pub mod infrastructure;
