// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Application Identifier Value Object
//!
//! Stable identifier under which an application registers with the arbiter
//! and after which its recipe file is named. Identity is the registration
//! name; the arbiter never invents identifiers of its own.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ArbiterError;

/// Stable application identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppId(String);

impl AppId {
    /// Maximum identifier length accepted at registration
    pub const MAX_LENGTH: usize = 128;

    /// Create an application identifier.
    ///
    /// Identifiers must be non-empty, at most [`Self::MAX_LENGTH`] bytes,
    /// and restricted to alphanumerics plus `._-` so they stay usable as
    /// recipe file names and control-group names.
    pub fn new<S: Into<String>>(name: S) -> Result<Self, ArbiterError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ArbiterError::invalid_parameter(
                "application identifier is empty",
            ));
        }
        if name.len() > Self::MAX_LENGTH {
            return Err(ArbiterError::invalid_parameter(format!(
                "application identifier '{}' longer than {} bytes",
                name,
                Self::MAX_LENGTH
            )));
        }
        if !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        {
            return Err(ArbiterError::invalid_parameter(format!(
                "application identifier '{}' contains unsupported characters",
                name
            )));
        }
        Ok(AppId(name))
    }

    /// Identifier text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AppId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
