// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # AWM Value Contribution
//!
//! Scores a candidate by the static quality value of its working mode,
//! boosted by the application's goal gap when the candidate actually
//! improves over the currently running working mode:
//!
//! `index = 0.4 · value + 0.6 · (goal_gap / 100)` when the boost applies,
//! `index = 0.4 · value` otherwise. Always in `[0, 1]`.

use crate::infrastructure::scheduling::contrib::{ContribError, EvalContext, SchedContrib};
use crate::infrastructure::scheduling::entity::SchedEntity;

const VALUE_WEIGHT: f32 = 0.4;
const NAP_WEIGHT: f32 = 0.6;

/// Static working-mode value index.
#[derive(Debug, Default)]
pub struct AwmValue;

impl AwmValue {
    /// Create the contribution
    pub fn new() -> Self {
        AwmValue
    }
}

impl SchedContrib for AwmValue {
    fn name(&self) -> &'static str {
        "awmvalue"
    }

    fn compute(&self, _ctx: &EvalContext<'_>, entity: &SchedEntity) -> Result<f32, ContribError> {
        let index = VALUE_WEIGHT * entity.awm_value;

        let gap = entity.app.goal_gap();
        let nap = NAP_WEIGHT * gap.as_fraction();
        match entity.app.current_awm_value() {
            // The penalty only biases candidates that improve on the
            // current working mode
            Some(current_value) if gap.is_asserted() && current_value < entity.awm_value => {
                Ok(index + nap)
            }
            _ => Ok(index),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::accounting::accounter::ResourceAccounter;
    use crate::infrastructure::registry::application_registry::ApplicationRegistry;
    use crate::infrastructure::registry::resource_registry::ResourceRegistry;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tile_arbiter_domain::{
        AppId, AppRef, Application, GoalGap, Priority, ResourcePath, ViewToken, WorkingMode,
    };

    fn context_fixtures() -> (Arc<ResourceRegistry>, ResourceAccounter, ApplicationRegistry) {
        let registry = Arc::new(ResourceRegistry::new());
        registry
            .register(ResourcePath::parse("tile0.cluster0.pe0").unwrap(), 100)
            .unwrap();
        let accounter = ResourceAccounter::new(registry.clone());
        (registry, accounter, ApplicationRegistry::new())
    }

    fn app_with_modes() -> AppRef {
        let modes = vec![
            WorkingMode::new(0, "low", 0.3).unwrap(),
            WorkingMode::new(1, "high", 0.9).unwrap(),
        ];
        Arc::new(Application::new(
            AppId::new("a").unwrap(),
            Priority::HIGHEST,
            modes,
        ))
    }

    fn entity_for(app: &AppRef, awm_id: u8, awm_value: f32) -> SchedEntity {
        SchedEntity {
            app: app.clone(),
            awm_id,
            awm_value,
            cluster_id: 0,
            usages: BTreeMap::new(),
            metrics: 0.0,
        }
    }

    #[test]
    fn test_plain_value_without_goal_gap() {
        let (_r, accounter, apps) = context_fixtures();
        let ctx = EvalContext {
            accounter: &accounter,
            apps: &apps,
            token: ViewToken::new(1),
        };
        let app = app_with_modes();
        let value = AwmValue::new();

        let index = value.compute(&ctx, &entity_for(&app, 1, 0.9)).unwrap();
        assert!((index - 0.36).abs() < 1e-6);
    }

    #[test]
    fn test_goal_gap_boosts_improving_candidates_only() {
        let (_r, accounter, apps) = context_fixtures();
        let ctx = EvalContext {
            accounter: &accounter,
            apps: &apps,
            token: ViewToken::new(1),
        };
        let app = app_with_modes();
        // Run in the low-value mode, then assert a 50% penalty
        app.commit_schedule(0, 0).unwrap();
        app.ack_sync().unwrap();
        app.set_goal_gap(GoalGap::new(50).unwrap());

        let value = AwmValue::new();
        let improving = value.compute(&ctx, &entity_for(&app, 1, 0.9)).unwrap();
        assert!((improving - (0.36 + 0.3)).abs() < 1e-6);

        let lateral = value.compute(&ctx, &entity_for(&app, 0, 0.3)).unwrap();
        assert!((lateral - 0.12).abs() < 1e-6);
    }
}
