//! # Synchronization Protocol Tests
//!
//! Full rounds through the resource manager observing the reconfiguration
//! protocol: preemption of lower-priority applications, blocked-before-
//! started ordering effects on the accounting, and latency demotion.

use std::sync::Arc;

use tile_arbiter::application::services::resource_manager::ResourceManager;
use tile_arbiter::infrastructure::accounting::accounter::ResourceAccounter;
use tile_arbiter::infrastructure::adapters::passthrough_proxy::PassthroughProxy;
use tile_arbiter::infrastructure::adapters::toml_recipe_loader::TomlRecipeLoader;
use tile_arbiter::infrastructure::metrics::ArbiterMetrics;
use tile_arbiter::infrastructure::registry::application_registry::ApplicationRegistry;
use tile_arbiter::infrastructure::registry::resource_registry::ResourceRegistry;
use tile_arbiter::infrastructure::scheduling::policy::{YamsConfig, YamsPolicy};
use tile_arbiter_domain::{AppId, AppState, ClientRequest, ResourcePath, ViewToken};

struct Harness {
    _recipes: tempfile::TempDir,
    manager: Arc<ResourceManager>,
    proxy: Arc<PassthroughProxy>,
}

fn harness(recipes: &[(&str, &str)]) -> Harness {
    // One cluster only, so demand conflicts cannot spread out
    let registry = Arc::new(ResourceRegistry::new());
    for (path, total) in [("tile0.cluster0.pe0", 100), ("tile0.cluster0.mem0", 100)] {
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
            proxy.clone(),
            loader,
            metrics,
        )),
        proxy,
    }
}

const GREEDY_LOW_PRIO: &str = r#"
priority = 2

[[working_mode]]
id = 0
value = 0.9
[working_mode.resources]
"tile.cluster.pe" = 90
"#;

const GREEDY_HIGH_PRIO: &str = r#"
priority = 0

[[working_mode]]
id = 0
value = 0.9
[working_mode.resources]
"tile.cluster.pe" = 90
"#;

async fn register(h: &Harness, name: &str) {
    let response = h
        .manager
        .handle_request(ClientRequest::Register {
            name: name.to_string(),
        })
        .await;
    assert!(
        matches!(response, tile_arbiter_domain::ClientResponse::Ok),
        "registration of '{}' failed",
        name
    );
}

fn app(h: &Harness, name: &str) -> tile_arbiter_domain::AppRef {
    h.manager
        .applications()
        .get(&AppId::new(name).unwrap())
        .unwrap()
}

/// A high-priority arrival preempts a running low-priority application:
/// the loser is blocked and reclaimed, the winner mapped, and the system
/// view swaps atomically to the new assignment.
#[tokio::test]
async fn test_high_priority_preempts_running_low() {
    let h = harness(&[("low", GREEDY_LOW_PRIO), ("high", GREEDY_HIGH_PRIO)]);

    register(&h, "low").await;
    h.manager.schedule_once().await.unwrap();
    let low = app(&h, "low");
    assert_eq!(low.state(), AppState::Running);
    assert!(h.proxy.is_mapped(low.id()));

    register(&h, "high").await;
    h.manager.schedule_once().await.unwrap();

    let high = app(&h, "high");
    assert_eq!(high.state(), AppState::Running);
    assert_eq!(low.state(), AppState::Blocked);
    assert!(low.current_awm().is_none());
    assert!(h.proxy.is_mapped(high.id()));
    assert!(!h.proxy.is_mapped(low.id()));

    let used = h
        .manager
        .accounter()
        .used(
            &ResourcePath::parse("tile.cluster.pe").unwrap(),
            ViewToken::SYSTEM,
        )
        .unwrap();
    assert_eq!(used, 90);
}

/// Once the high-priority application departs, the next round readmits the
/// blocked one.
#[tokio::test]
async fn test_blocked_app_returns_after_departure() {
    let h = harness(&[("low", GREEDY_LOW_PRIO), ("high", GREEDY_HIGH_PRIO)]);
    register(&h, "low").await;
    h.manager.schedule_once().await.unwrap();
    register(&h, "high").await;
    h.manager.schedule_once().await.unwrap();

    let low = app(&h, "low");
    assert_eq!(low.state(), AppState::Blocked);

    h.manager
        .handle_request(ClientRequest::Unregister {
            name: "high".to_string(),
        })
        .await;
    h.manager.schedule_once().await.unwrap();

    assert_eq!(low.state(), AppState::Running);
    assert_eq!(low.current_awm(), Some(0));
    assert!(h.proxy.is_mapped(low.id()));
}

/// A platform whose mappings take measurably long, for latency tests.
struct SlowProxy {
    inner: Arc<PassthroughProxy>,
}

#[async_trait::async_trait]
impl tile_arbiter_domain::PlatformProxy for SlowProxy {
    async fn setup(&self, app: &tile_arbiter_domain::AppRef) -> Result<(), tile_arbiter_domain::ArbiterError> {
        self.inner.setup(app).await
    }

    async fn release(&self, app: &tile_arbiter_domain::AppRef) -> Result<(), tile_arbiter_domain::ArbiterError> {
        self.inner.release(app).await
    }

    async fn reclaim(&self, app: &tile_arbiter_domain::AppRef) -> Result<(), tile_arbiter_domain::ArbiterError> {
        self.inner.reclaim(app).await
    }

    async fn map(
        &self,
        app: &tile_arbiter_domain::AppRef,
        usages: &tile_arbiter_domain::UsagesMap,
        view: tile_arbiter_domain::ViewToken,
        exclusive: bool,
    ) -> Result<(), tile_arbiter_domain::ArbiterError> {
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        self.inner.map(app, usages, view, exclusive).await
    }
}

/// A too-strict latency ceiling demotes the application instead of
/// aborting the round; it keeps competing afterwards.
#[tokio::test]
async fn test_strict_latency_ceiling_demotes() {
    let registry = Arc::new(ResourceRegistry::new());
    for (path, total) in [("tile0.cluster0.pe0", 100), ("tile0.cluster0.mem0", 100)] {
        registry
            .register(ResourcePath::parse(path).unwrap(), total)
            .unwrap();
    }
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("strict.recipe"), GREEDY_HIGH_PRIO).unwrap();

    let inner = Arc::new(PassthroughProxy::new());
    let manager = Arc::new(ResourceManager::new(
        Arc::new(ResourceAccounter::new(registry.clone())),
        Arc::new(ApplicationRegistry::new()),
        YamsPolicy::new(&YamsConfig::default()).unwrap(),
        Arc::new(SlowProxy {
            inner: inner.clone(),
        }),
        Arc::new(TomlRecipeLoader::new(dir.path(), registry)),
        ArbiterMetrics::new().unwrap(),
    ));

    manager
        .handle_request(ClientRequest::Register {
            name: "strict".to_string(),
        })
        .await;
    let strict = manager
        .applications()
        .get(&AppId::new("strict").unwrap())
        .unwrap();

    // Mappings take ~20ms, the ceiling allows 1ms: never admitted
    strict.set_latency_ceiling_ms(Some(1));
    manager.schedule_once().await.unwrap();
    assert_eq!(strict.state(), AppState::Blocked);
    assert!(!inner.is_mapped(strict.id()));

    // Relaxing the ceiling lets the next round admit it
    strict.set_latency_ceiling_ms(None);
    manager.schedule_once().await.unwrap();
    assert_eq!(strict.state(), AppState::Running);
    assert!(inner.is_mapped(strict.id()));
}
