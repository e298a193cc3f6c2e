// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # View Token Value Object
//!
//! An opaque, monotonically assigned identifier naming a snapshot of the
//! resource accountings. Token `0` always refers to the committed *system*
//! view; every scheduling round works against a freshly assigned token.
//!
//! Tokens are 32-bit and wrap around at the maximum; the accounter rejects
//! an assignment that would collide with a still-live view.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque name of a resource state view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ViewToken(u32);

impl ViewToken {
    /// The committed system view
    pub const SYSTEM: ViewToken = ViewToken(0);

    /// Wrap a raw token value
    pub fn new(raw: u32) -> Self {
        ViewToken(raw)
    }

    /// Raw token value
    pub fn raw(&self) -> u32 {
        self.0
    }

    /// Whether this token names the system view alias
    pub fn is_system(&self) -> bool {
        self.0 == 0
    }

    /// The token following this one, wrapping past `u32::MAX` to 1 so the
    /// system alias is never reassigned.
    pub fn successor(&self) -> ViewToken {
        match self.0.checked_add(1) {
            Some(next) => ViewToken(next),
            None => ViewToken(1),
        }
    }
}

impl Default for ViewToken {
    fn default() -> Self {
        ViewToken::SYSTEM
    }
}

impl fmt::Display for ViewToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_system() {
            write!(f, "view:system")
        } else {
            write!(f, "view:{}", self.0)
        }
    }
}
