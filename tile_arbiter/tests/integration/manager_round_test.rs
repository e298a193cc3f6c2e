//! # Resource Manager Round Tests
//!
//! Client-boundary flows driven through the resource manager service:
//! recipe-backed registration, full scheduling rounds with view adoption,
//! goal-gap and constraint updates, departure cleanup.

use std::sync::Arc;

use tile_arbiter::application::services::resource_manager::ResourceManager;
use tile_arbiter::infrastructure::accounting::accounter::ResourceAccounter;
use tile_arbiter::infrastructure::adapters::passthrough_proxy::PassthroughProxy;
use tile_arbiter::infrastructure::adapters::toml_recipe_loader::TomlRecipeLoader;
use tile_arbiter::infrastructure::metrics::ArbiterMetrics;
use tile_arbiter::infrastructure::registry::application_registry::ApplicationRegistry;
use tile_arbiter::infrastructure::registry::resource_registry::ResourceRegistry;
use tile_arbiter::infrastructure::scheduling::policy::{YamsConfig, YamsPolicy};
use tile_arbiter_domain::{
    AppId, AppState, ClientRequest, ClientResponse, GoalGap, ResourcePath, ViewToken,
};

struct Harness {
    _recipes: tempfile::TempDir,
    manager: Arc<ResourceManager>,
    registry: Arc<ResourceRegistry>,
}

fn harness(recipes: &[(&str, &str)]) -> Harness {
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

    let dir = tempfile::tempdir().unwrap();
    for (name, content) in recipes {
        std::fs::write(dir.path().join(format!("{}.recipe", name)), content).unwrap();
    }

    let accounter = Arc::new(ResourceAccounter::new(registry.clone()));
    let applications = Arc::new(ApplicationRegistry::new());
    let policy = YamsPolicy::new(&YamsConfig::default()).unwrap();
    let loader = Arc::new(TomlRecipeLoader::new(dir.path(), registry.clone()));
    let proxy = Arc::new(PassthroughProxy::new());
    let metrics = ArbiterMetrics::new().unwrap();

    Harness {
        _recipes: dir,
        manager: Arc::new(ResourceManager::new(
            accounter,
            applications,
            policy,
            proxy,
            loader,
            metrics,
        )),
        registry,
    }
}

const SIMPLE_RECIPE: &str = r#"
priority = 0

[[working_mode]]
id = 0
name = "only"
value = 0.8
[working_mode.resources]
"tile.cluster.pe" = 40
"tile.cluster.mem" = 30
"#;

const HUNGRY_RECIPE: &str = r#"
priority = 0

[[working_mode]]
id = 0
value = 0.9
[working_mode.resources]
"tile.cluster.pe" = 100
"tile.cluster.mem" = 100
"#;

#[tokio::test]
async fn test_register_schedule_and_query() {
    let h = harness(&[("video", SIMPLE_RECIPE)]);

    let response = h
        .manager
        .handle_request(ClientRequest::Register {
            name: "video".to_string(),
        })
        .await;
    assert!(matches!(response, ClientResponse::Ok));

    h.manager.schedule_once().await.unwrap();

    let app = h
        .manager
        .applications()
        .get(&AppId::new("video").unwrap())
        .unwrap();
    assert_eq!(app.state(), AppState::Running);
    assert_eq!(app.current_awm(), Some(0));

    let response = h
        .manager
        .handle_request(ClientRequest::GetWorkingMode {
            name: "video".to_string(),
        })
        .await;
    assert!(matches!(
        response,
        ClientResponse::WorkingMode { awm_id: 0, .. }
    ));

    // The round was adopted: the system view carries the charges
    let used = h
        .manager
        .accounter()
        .used(
            &ResourcePath::parse("tile.cluster.pe").unwrap(),
            ViewToken::SYSTEM,
        )
        .unwrap();
    assert_eq!(used, 40);
}

#[tokio::test]
async fn test_registration_without_recipe_fails() {
    let h = harness(&[]);
    let response = h
        .manager
        .handle_request(ClientRequest::Register {
            name: "ghost".to_string(),
        })
        .await;
    assert!(matches!(response, ClientResponse::RegistrationFailed(_)));
    assert!(h.manager.applications().is_empty());
}

#[tokio::test]
async fn test_unregister_releases_system_charges() {
    let h = harness(&[("video", SIMPLE_RECIPE)]);
    h.manager
        .handle_request(ClientRequest::Register {
            name: "video".to_string(),
        })
        .await;
    h.manager.schedule_once().await.unwrap();

    h.manager
        .handle_request(ClientRequest::Unregister {
            name: "video".to_string(),
        })
        .await;

    assert!(h.manager.applications().is_empty());
    for resource in h.registry.all() {
        assert_eq!(
            h.manager
                .accounter()
                .used(resource.path(), ViewToken::SYSTEM)
                .unwrap(),
            0,
            "{}",
            resource.path()
        );
    }
}

#[tokio::test]
async fn test_two_hungry_apps_share_clusters() {
    let h = harness(&[("one", HUNGRY_RECIPE), ("two", HUNGRY_RECIPE)]);
    for name in ["one", "two"] {
        h.manager
            .handle_request(ClientRequest::Register {
                name: name.to_string(),
            })
            .await;
    }
    h.manager.schedule_once().await.unwrap();

    let one = h.manager.applications().get(&AppId::new("one").unwrap()).unwrap();
    let two = h.manager.applications().get(&AppId::new("two").unwrap()).unwrap();
    assert_eq!(one.state(), AppState::Running);
    assert_eq!(two.state(), AppState::Running);
    assert_ne!(one.current_cluster(), two.current_cluster());
}

#[tokio::test]
async fn test_goal_gap_and_constraint_requests() {
    let h = harness(&[("video", SIMPLE_RECIPE)]);
    h.manager
        .handle_request(ClientRequest::Register {
            name: "video".to_string(),
        })
        .await;

    let response = h
        .manager
        .handle_request(ClientRequest::SetGoalGap {
            name: "video".to_string(),
            gap: GoalGap::new(30).unwrap(),
        })
        .await;
    assert!(matches!(response, ClientResponse::Ok));

    let app = h
        .manager
        .applications()
        .get(&AppId::new("video").unwrap())
        .unwrap();
    assert_eq!(app.goal_gap().percent(), 30);

    let response = h
        .manager
        .handle_request(ClientRequest::SetGoalGap {
            name: "missing".to_string(),
            gap: GoalGap::new(10).unwrap(),
        })
        .await;
    assert!(matches!(response, ClientResponse::Error(_)));
}

#[tokio::test]
async fn test_disable_blocks_enable_readmits() {
    let h = harness(&[("video", SIMPLE_RECIPE)]);
    h.manager
        .handle_request(ClientRequest::Register {
            name: "video".to_string(),
        })
        .await;
    h.manager.schedule_once().await.unwrap();

    h.manager
        .handle_request(ClientRequest::Disable {
            name: "video".to_string(),
        })
        .await;
    let app = h
        .manager
        .applications()
        .get(&AppId::new("video").unwrap())
        .unwrap();
    assert_eq!(app.state(), AppState::Disabled);

    // The disabled application no longer occupies the system view
    let used = h
        .manager
        .accounter()
        .used(
            &ResourcePath::parse("tile.cluster.pe").unwrap(),
            ViewToken::SYSTEM,
        )
        .unwrap();
    assert_eq!(used, 0);

    h.manager
        .handle_request(ClientRequest::Enable {
            name: "video".to_string(),
        })
        .await;
    h.manager.schedule_once().await.unwrap();
    assert_eq!(app.state(), AppState::Running);
}
