//! # Accounting Properties
//!
//! The accounter invariants under randomized operation sequences:
//! conservation, view isolation, reservation atomicity and exactly-once
//! semantics.

use proptest::prelude::*;
use std::sync::Arc;

use tile_arbiter::infrastructure::accounting::accounter::ResourceAccounter;
use tile_arbiter::infrastructure::registry::resource_registry::ResourceRegistry;
use tile_arbiter_domain::{
    AppId, AppRef, Application, ArbiterError, Priority, ResourcePath, UsagesMap, ViewToken,
    WorkingMode,
};

const APPS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Reserve { app: usize, amount: u64, cluster: u16 },
    Release { app: usize },
    Evict { app: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..APPS, 1u64..160, 0u16..2).prop_map(|(app, amount, cluster)| Op::Reserve {
            app,
            amount,
            cluster
        }),
        (0..APPS).prop_map(|app| Op::Release { app }),
        (0..APPS).prop_map(|app| Op::Evict { app }),
    ]
}

fn platform() -> (Arc<ResourceRegistry>, ResourceAccounter) {
    let registry = Arc::new(ResourceRegistry::new());
    for (path, total) in [
        ("tile0.cluster0.pe0", 100),
        ("tile0.cluster0.pe1", 50),
        ("tile0.cluster1.pe0", 100),
    ] {
        registry
            .register(ResourcePath::parse(path).unwrap(), total)
            .unwrap();
    }
    let accounter = ResourceAccounter::new(registry.clone());
    (registry, accounter)
}

fn apps() -> Vec<AppRef> {
    (0..APPS)
        .map(|index| {
            Arc::new(Application::new(
                AppId::new(format!("app{}", index)).unwrap(),
                Priority::HIGHEST,
                Vec::new(),
            )) as AppRef
        })
        .collect()
}

fn bound_usages(registry: &ResourceRegistry, amount: u64, cluster: u16) -> UsagesMap {
    let mut wm = WorkingMode::new(0, "wm", 0.5).unwrap();
    wm.add_request(ResourcePath::parse("tile.cluster.pe").unwrap(), amount)
        .unwrap();
    wm.bind_resource(registry, "cluster", None, cluster, cluster)
        .unwrap()
        .clone()
}

fn usage_snapshot(
    accounter: &ResourceAccounter,
    registry: &ResourceRegistry,
    token: ViewToken,
) -> Vec<u64> {
    registry
        .all()
        .iter()
        .map(|r| accounter.used(r.path(), token).unwrap())
        .collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// For any operation sequence restricted to one view: conservation
    /// holds on every descriptor, failed reservations leave the view
    /// byte-identical, and a disjoint view never observes anything.
    #[test]
    fn prop_accounting_invariants(ops in prop::collection::vec(op_strategy(), 1..24)) {
        let (registry, accounter) = platform();
        let apps = apps();
        let worked = accounter.get_view("worked").unwrap();
        let observer = accounter.get_view("observer").unwrap();
        let observer_baseline = usage_snapshot(&accounter, &registry, observer);

        for op in ops {
            match op {
                Op::Reserve { app, amount, cluster } => {
                    let usages = bound_usages(&registry, amount, cluster);
                    let before = usage_snapshot(&accounter, &registry, worked);
                    match accounter.reserve(&apps[app], usages, worked) {
                        Ok(()) => {}
                        Err(ArbiterError::UsageExceeded(_)) | Err(ArbiterError::AppUsages(_)) => {
                            // Atomicity: a rejected reservation changes nothing
                            prop_assert_eq!(
                                usage_snapshot(&accounter, &registry, worked),
                                before
                            );
                        }
                        Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                    }
                }
                Op::Release { app } => {
                    match accounter.release(&apps[app], worked) {
                        Ok(()) | Err(ArbiterError::MissUsages(_)) => {}
                        Err(other) => prop_assert!(false, "unexpected error {:?}", other),
                    }
                }
                Op::Evict { app } => accounter.evict(&apps[app], worked).unwrap(),
            }

            // Conservation on every descriptor and both views
            for resource in registry.all() {
                for token in [worked, observer, ViewToken::SYSTEM] {
                    let used = accounter.used(resource.path(), token).unwrap();
                    let available =
                        accounter.available(resource.path(), token, None).unwrap();
                    prop_assert!(used <= resource.total());
                    prop_assert_eq!(used + available, resource.total());
                }
            }

            // Isolation: the observer view never moves
            prop_assert_eq!(
                usage_snapshot(&accounter, &registry, observer),
                observer_baseline.clone()
            );
        }
    }

    /// Two consecutive reservations for the same application under the
    /// same view: the second always reports `AppUsages` and changes
    /// nothing.
    #[test]
    fn prop_exactly_once_reservation(amount in 1u64..100, second in 1u64..100) {
        let (registry, accounter) = platform();
        let apps = apps();
        let token = accounter.get_view("round").unwrap();

        accounter
            .reserve(&apps[0], bound_usages(&registry, amount, 0), token)
            .unwrap();
        let before = usage_snapshot(&accounter, &registry, token);

        let err = accounter
            .reserve(&apps[0], bound_usages(&registry, second, 0), token)
            .unwrap_err();
        prop_assert!(matches!(err, ArbiterError::AppUsages(_)));
        prop_assert_eq!(usage_snapshot(&accounter, &registry, token), before);
    }

    /// Adoption publishes exactly the worked view's accounting.
    #[test]
    fn prop_adoption_publishes_view(amount in 1u64..150) {
        let (registry, accounter) = platform();
        let apps = apps();
        let token = accounter.get_view("round").unwrap();

        let reserved = accounter
            .reserve(&apps[0], bound_usages(&registry, amount, 0), token)
            .is_ok();
        let worked = usage_snapshot(&accounter, &registry, token);

        accounter.adopt_view(token).unwrap();
        prop_assert_eq!(
            usage_snapshot(&accounter, &registry, ViewToken::SYSTEM),
            worked.clone()
        );
        if reserved {
            let total_used: u64 = worked.iter().sum();
            prop_assert_eq!(total_used, amount);
        }
    }
}
