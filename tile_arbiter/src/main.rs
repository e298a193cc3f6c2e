// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Tile Arbiter Daemon
//!
//! Composition root of the arbiter: parse the command line, optionally
//! daemonize (before the async runtime exists, as fork and threads do not
//! mix), load and validate the configuration, wire the components together
//! and run until a shutdown signal arrives.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use tile_arbiter::application::services::resource_manager::ResourceManager;
use tile_arbiter::infrastructure::accounting::accounter::ResourceAccounter;
use tile_arbiter::infrastructure::adapters::passthrough_proxy::PassthroughProxy;
use tile_arbiter::infrastructure::adapters::toml_recipe_loader::TomlRecipeLoader;
use tile_arbiter::infrastructure::config::ArbiterConfig;
use tile_arbiter::infrastructure::logging::init_logging;
use tile_arbiter::infrastructure::metrics::ArbiterMetrics;
use tile_arbiter::infrastructure::registry::application_registry::ApplicationRegistry;
use tile_arbiter::infrastructure::registry::resource_registry::ResourceRegistry;
use tile_arbiter::infrastructure::scheduling::policy::YamsPolicy;
use tile_arbiter_bootstrap::exit_code::ExitCode;
use tile_arbiter_bootstrap::platform::{daemonize, DaemonContext};
use tile_arbiter_bootstrap::signals::wait_for_shutdown_signal;
use tile_arbiter_bootstrap::shutdown::ShutdownCoordinator;
use tile_arbiter_bootstrap::Cli;
use tile_arbiter_domain::ResourcePath;

fn main() {
    let cli = Cli::parse();

    // Daemonize before any thread exists
    if cli.daemon {
        let context = DaemonContext {
            name: cli.name.clone(),
            user: cli.user.clone(),
            lockfile: cli.lockfile_path(),
            pidfile: cli.pidfile_path(),
            rundir: cli.rundir.clone(),
        };
        if let Err(err) = daemonize(&context) {
            eprintln!("{}: daemonization failed: {}", cli.name, err);
            std::process::exit(ExitCode::from(&err).as_i32());
        }
    }

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            eprintln!("{}: runtime creation failed: {}", cli.name, err);
            std::process::exit(ExitCode::OsError.as_i32());
        }
    };

    let exit_code = match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::Success,
        Err(err) => {
            error!(error = %format!("{:#}", err), "arbiter terminated with error");
            eprintln!("tile_arbiter: {:#}", err);
            ExitCode::Error
        }
    };
    std::process::exit(exit_code.as_i32());
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = ArbiterConfig::load(cli.config.as_deref()).context("loading configuration")?;
    init_logging(&config.logging).context("installing log subscriber")?;
    info!(daemon = cli.daemon, "tile arbiter starting");

    // Platform resources arrive declaratively from the configuration
    let registry = Arc::new(ResourceRegistry::new());
    for declaration in &config.platform.resources {
        let path = ResourcePath::parse(&declaration.path)
            .with_context(|| format!("platform resource '{}'", declaration.path))?;
        registry
            .register(path, declaration.total)
            .with_context(|| format!("registering '{}'", declaration.path))?;
    }
    info!(resources = registry.len(), "platform registered");

    let accounter = Arc::new(ResourceAccounter::new(registry.clone()));
    let applications = Arc::new(ApplicationRegistry::new());
    let policy = YamsPolicy::new(&config.yams()).context("building scheduling policy")?;
    let metrics = ArbiterMetrics::new().context("building metrics")?;
    let loader = Arc::new(TomlRecipeLoader::new(
        &config.runtime.recipe_dir,
        registry.clone(),
    ));
    let proxy = Arc::new(PassthroughProxy::new());

    let manager = Arc::new(ResourceManager::new(
        accounter,
        applications,
        policy,
        proxy,
        loader,
        metrics,
    ));

    let period = match config.runtime.period_ms {
        0 => None,
        millis => Some(Duration::from_millis(millis)),
    };
    manager.start(period);
    info!(period_ms = config.runtime.period_ms, "resource manager running");

    wait_for_shutdown_signal().await;

    let coordinator = ShutdownCoordinator::default();
    coordinator.initiate_shutdown();
    coordinator.wait_for(manager.shutdown()).await;
    info!("tile arbiter stopped");
    Ok(())
}
