// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Client Boundary Types
//!
//! Message kinds exchanged with each managed application process. The
//! transport is out of scope; these types define the surface the arbiter
//! core handles.

use crate::entities::application::{AppState, AwmConstraint};
use crate::error::ArbiterError;
use crate::value_objects::goal_gap::GoalGap;

/// Request from an application process.
#[derive(Debug, Clone)]
pub enum ClientRequest {
    /// Register under `name`, loading the recipe of that name
    Register { name: String },
    /// Deregister and release every assignment
    Unregister { name: String },
    /// Re-admit a disabled application
    Enable { name: String },
    /// Withdraw the application from scheduling
    Disable { name: String },
    /// Query the current working-mode assignment
    GetWorkingMode { name: String },
    /// Restrict the admissible working modes
    SetConstraints {
        name: String,
        constraints: Vec<AwmConstraint>,
    },
    /// Report a Normalized Actual Penalty
    SetGoalGap { name: String, gap: GoalGap },
}

/// Event code surfaced to a client from `GetWorkingMode`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GwmEvent {
    /// First assignment granted
    Start,
    /// Working mode changed within the cluster
    Reconf,
    /// Working mode and cluster changed
    Migrec,
    /// Cluster changed
    Migrate,
    /// All resources withdrawn
    Blocked,
}

impl GwmEvent {
    /// Derive the event code a client should observe for a synchronization
    /// state, if the state maps to one.
    pub fn from_state(state: AppState) -> Option<GwmEvent> {
        match state {
            AppState::Starting => Some(GwmEvent::Start),
            AppState::Reconf => Some(GwmEvent::Reconf),
            AppState::Migrec => Some(GwmEvent::Migrec),
            AppState::Migrate => Some(GwmEvent::Migrate),
            AppState::Blocked => Some(GwmEvent::Blocked),
            _ => None,
        }
    }
}

/// Response to a client request.
#[derive(Debug, Clone)]
pub enum ClientResponse {
    /// Request applied
    Ok,
    /// Current assignment, when the application is running
    WorkingMode { awm_id: u8, cluster_id: u16 },
    /// Pending or completed transition the client must react to
    Event(GwmEvent),
    /// Registration rejected
    RegistrationFailed(ArbiterError),
    /// Any other failure
    Error(ArbiterError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_mapping() {
        assert_eq!(GwmEvent::from_state(AppState::Starting), Some(GwmEvent::Start));
        assert_eq!(GwmEvent::from_state(AppState::Migrec), Some(GwmEvent::Migrec));
        assert_eq!(GwmEvent::from_state(AppState::Running), None);
        assert_eq!(GwmEvent::from_state(AppState::Finished), None);
    }
}
