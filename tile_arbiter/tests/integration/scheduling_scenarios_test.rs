//! # Scheduling Scenario Tests
//!
//! Reference scenarios for the scheduling policy: admission, contention,
//! reconfiguration preference and constraint handling, validated against
//! the accounter state the round produces.

use std::sync::Arc;

use tile_arbiter::infrastructure::accounting::accounter::ResourceAccounter;
use tile_arbiter::infrastructure::registry::application_registry::ApplicationRegistry;
use tile_arbiter::infrastructure::registry::resource_registry::ResourceRegistry;
use tile_arbiter::infrastructure::scheduling::policy::{YamsConfig, YamsPolicy};
use tile_arbiter_domain::entities::application::{
    AwmConstraint, ConstraintBound, ConstraintOperation,
};
use tile_arbiter_domain::{
    AppId, AppRef, AppState, Application, Priority, ResourcePath, WorkingMode,
};

fn single_cluster_platform() -> (Arc<ResourceRegistry>, Arc<ResourceAccounter>) {
    let registry = Arc::new(ResourceRegistry::new());
    for (path, total) in [("tile0.cluster0.pe0", 100), ("tile0.cluster0.mem0", 100)] {
        registry
            .register(ResourcePath::parse(path).unwrap(), total)
            .unwrap();
    }
    let accounter = Arc::new(ResourceAccounter::new(registry.clone()));
    (registry, accounter)
}

fn two_cluster_platform() -> (Arc<ResourceRegistry>, Arc<ResourceAccounter>) {
    let registry = Arc::new(ResourceRegistry::new());
    for (path, total) in [
        ("tile0.cluster0.pe0", 100),
        ("tile0.cluster0.mem0", 100),
        ("tile0.cluster1.pe0", 100),
        ("tile0.cluster1.mem0", 100),
    ] {
        registry
            .register(ResourcePath::parse(path).unwrap(), total)
            .unwrap();
    }
    let accounter = Arc::new(ResourceAccounter::new(registry.clone()));
    (registry, accounter)
}

fn app_one_mode(name: &str, prio: u8, pe: u64, mem: u64) -> AppRef {
    let mut wm = WorkingMode::new(0, "wm0", 0.8).unwrap();
    wm.add_request(ResourcePath::parse("tile.cluster.pe").unwrap(), pe)
        .unwrap();
    if mem > 0 {
        wm.add_request(ResourcePath::parse("tile.cluster.mem").unwrap(), mem)
            .unwrap();
    }
    Arc::new(Application::new(
        AppId::new(name).unwrap(),
        Priority::new(prio).unwrap(),
        vec![wm],
    ))
}

fn policy() -> YamsPolicy {
    YamsPolicy::new(&YamsConfig::default()).unwrap()
}

/// Single application, single working mode, sufficient resources: the round
/// assigns the working mode and charges exactly the requested amounts.
#[test]
fn test_single_app_sufficient_resources() {
    let (_registry, accounter) = single_cluster_platform();
    let apps = ApplicationRegistry::new();
    let a = app_one_mode("a", 0, 40, 30);
    apps.register(a.clone()).unwrap();

    let token = accounter.get_view("round").unwrap();
    policy().schedule(&accounter, &apps, token).unwrap();

    assert_eq!(a.next_awm(), Some(0));
    assert_eq!(a.state(), AppState::Starting);
    assert_eq!(
        accounter
            .used(&ResourcePath::parse("tile.cluster.pe").unwrap(), token)
            .unwrap(),
        40
    );
    assert_eq!(
        accounter
            .used(&ResourcePath::parse("tile.cluster.mem").unwrap(), token)
            .unwrap(),
        30
    );
}

/// Two applications contending for one cluster: the earlier-registered one
/// wins on equal priority, the loser stays unassigned and total usage is
/// the winner's.
#[test]
fn test_two_apps_contention() {
    let (_registry, accounter) = single_cluster_platform();
    let apps = ApplicationRegistry::new();
    let a = app_one_mode("a", 0, 70, 0);
    let b = app_one_mode("b", 0, 70, 0);
    apps.register(a.clone()).unwrap();
    apps.register(b.clone()).unwrap();

    let token = accounter.get_view("round").unwrap();
    policy().schedule(&accounter, &apps, token).unwrap();

    assert_eq!(a.next_awm(), Some(0));
    assert_eq!(b.next_awm(), None);
    assert_eq!(
        accounter
            .used(&ResourcePath::parse("tile.cluster.pe").unwrap(), token)
            .unwrap(),
        70
    );
}

/// Priority beats registration order under contention.
#[test]
fn test_priority_wins_contention() {
    let (_registry, accounter) = single_cluster_platform();
    let apps = ApplicationRegistry::new();
    let lo = app_one_mode("lo", 1, 70, 0);
    let hi = app_one_mode("hi", 0, 70, 0);
    apps.register(lo.clone()).unwrap();
    apps.register(hi.clone()).unwrap();

    let token = accounter.get_view("round").unwrap();
    policy().schedule(&accounter, &apps, token).unwrap();

    assert_eq!(hi.next_awm(), Some(0));
    assert_eq!(lo.next_awm(), None);
}

/// A running application offered an equally good working mode keeps its
/// cluster: the reconfiguration contribution dominates the migration cost.
#[test]
fn test_reconfig_preferred_over_migration() {
    let (_registry, accounter) = two_cluster_platform();
    let apps = ApplicationRegistry::new();

    let mut wm0 = WorkingMode::new(0, "wm0", 0.8).unwrap();
    wm0.add_request(ResourcePath::parse("tile.cluster.pe").unwrap(), 40)
        .unwrap();
    let mut wm1 = WorkingMode::new(1, "wm1", 0.8).unwrap();
    wm1.add_request(ResourcePath::parse("tile.cluster.pe").unwrap(), 40)
        .unwrap();
    let a: AppRef = Arc::new(Application::new(
        AppId::new("a").unwrap(),
        Priority::HIGHEST,
        vec![wm0, wm1],
    ));
    apps.register(a.clone()).unwrap();

    // First round: the application starts somewhere
    let round1 = accounter.get_view("round-1").unwrap();
    policy().schedule(&accounter, &apps, round1).unwrap();
    a.ack_sync().unwrap();
    let home = a.current_cluster().unwrap();
    accounter.adopt_view(round1).unwrap();

    // Only working mode 1 stays admissible, so the next round must move
    // the application; it must do so without migrating
    a.set_constraints(&[AwmConstraint {
        awm_id: 0,
        operation: ConstraintOperation::Remove,
        bound: ConstraintBound::Exact,
    }]);

    let round2 = accounter.get_view("round-2").unwrap();
    policy().schedule(&accounter, &apps, round2).unwrap();

    assert_eq!(a.next_awm(), Some(1));
    assert_eq!(a.state(), AppState::Reconf);
    assert_eq!(a.current_cluster(), Some(home));
}

/// An upper-bound constraint invalidates the current working mode: the next
/// round reconfigures into the best admissible one.
#[test]
fn test_constraint_forces_downgrade() {
    let (_registry, accounter) = single_cluster_platform();
    let apps = ApplicationRegistry::new();

    let working_modes: Vec<WorkingMode> = (0u8..=8)
        .map(|id| {
            let mut wm =
                WorkingMode::new(id, format!("wm{}", id), 0.1 + 0.1 * f32::from(id)).unwrap();
            wm.add_request(
                ResourcePath::parse("tile.cluster.pe").unwrap(),
                10 + u64::from(id),
            )
            .unwrap();
            wm
        })
        .collect();
    let a: AppRef = Arc::new(Application::new(
        AppId::new("a").unwrap(),
        Priority::HIGHEST,
        working_modes,
    ));
    apps.register(a.clone()).unwrap();

    // First round picks the highest-value mode
    let round1 = accounter.get_view("round-1").unwrap();
    policy().schedule(&accounter, &apps, round1).unwrap();
    assert_eq!(a.next_awm(), Some(8));
    a.ack_sync().unwrap();
    accounter.adopt_view(round1).unwrap();

    // Only ids <= 2 stay admissible
    a.set_constraints(&[AwmConstraint {
        awm_id: 2,
        operation: ConstraintOperation::Add,
        bound: ConstraintBound::Upper,
    }]);

    let round2 = accounter.get_view("round-2").unwrap();
    policy().schedule(&accounter, &apps, round2).unwrap();
    assert_eq!(a.next_awm(), Some(2));
    assert_eq!(a.state(), AppState::Reconf);
}

/// With every working mode constrained away the application has no
/// candidate and is left for the blocked transition.
#[test]
fn test_no_admissible_mode_leaves_app_unassigned() {
    let (_registry, accounter) = single_cluster_platform();
    let apps = ApplicationRegistry::new();
    let a = app_one_mode("a", 0, 40, 0);
    apps.register(a.clone()).unwrap();

    a.set_constraints(&[AwmConstraint {
        awm_id: 0,
        operation: ConstraintOperation::Remove,
        bound: ConstraintBound::Exact,
    }]);

    let token = accounter.get_view("round").unwrap();
    policy().schedule(&accounter, &apps, token).unwrap();

    assert_eq!(a.next_awm(), None);
    assert!(accounter.committed_usages(&a, token).unwrap().is_none());
}

/// Fixed registries, applications and weights produce a deterministic
/// outcome, round after round.
#[test]
fn test_round_determinism_under_fixed_weights() {
    let mut outcomes = Vec::new();
    for _ in 0..5 {
        let (_registry, accounter) = two_cluster_platform();
        let apps = ApplicationRegistry::new();
        for (name, prio, pe) in [("a", 0, 60), ("b", 0, 60), ("c", 1, 60)] {
            apps.register(app_one_mode(name, prio, pe, 10)).unwrap();
        }

        let token = accounter.get_view("round").unwrap();
        policy().schedule(&accounter, &apps, token).unwrap();

        let outcome: Vec<(String, Option<u8>)> = ["a", "b", "c"]
            .iter()
            .map(|name| {
                let app = apps.get(&AppId::new(*name).unwrap()).unwrap();
                (name.to_string(), app.next_awm())
            })
            .collect();
        outcomes.push(outcome);
    }
    assert!(outcomes.windows(2).all(|pair| pair[0] == pair[1]));
}

/// The same reservations committed through the policy hold the conservation
/// invariant on every descriptor.
#[test]
fn test_conservation_after_round() {
    let (registry, accounter) = two_cluster_platform();
    let apps = ApplicationRegistry::new();
    for (name, pe) in [("a", 80), ("b", 50), ("c", 30)] {
        apps.register(app_one_mode(name, 0, pe, 20)).unwrap();
    }

    let token = accounter.get_view("round").unwrap();
    policy().schedule(&accounter, &apps, token).unwrap();

    for resource in registry.all() {
        let used = accounter.used(resource.path(), token).unwrap();
        let available = accounter.available(resource.path(), token, None).unwrap();
        assert_eq!(used + available, resource.total(), "{}", resource.path());
    }
}
