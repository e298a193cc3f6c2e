// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Goal Gap Value Object
//!
//! The Normalized Actual Penalty (NAP) a client reports when it is missing
//! its quality target, expressed as a percentage in `0..=100`. A positive
//! goal gap biases the scheduler toward higher-value working modes for that
//! application; it is a coarse ordering hint and nothing more.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ArbiterError;

/// Normalized Actual Penalty, `0..=100`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct GoalGap(u8);

impl GoalGap {
    /// No penalty asserted
    pub const NONE: GoalGap = GoalGap(0);

    /// Create a goal gap, validating the percentage range.
    pub fn new(percent: u8) -> Result<Self, ArbiterError> {
        if percent > 100 {
            return Err(ArbiterError::invalid_parameter(format!(
                "goal gap {}% above 100%",
                percent
            )));
        }
        Ok(GoalGap(percent))
    }

    /// Percentage value
    pub fn percent(&self) -> u8 {
        self.0
    }

    /// Whether the client is asserting a penalty
    pub fn is_asserted(&self) -> bool {
        self.0 > 0
    }

    /// The penalty as a fraction in `[0, 1]`
    pub fn as_fraction(&self) -> f32 {
        f32::from(self.0) / 100.0
    }
}

impl fmt::Display for GoalGap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "nap:{}%", self.0)
    }
}
