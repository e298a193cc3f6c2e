// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Passthrough Platform Proxy
//!
//! A platform backend that applies nothing and logs everything. Useful on
//! platforms without an enforcement layer and as the default wiring in
//! tests: assignments are tracked so `reclaim` stays observably idempotent,
//! and an empty mapping is still rejected, which keeps the sync driver's
//! `MappingFailed` path honest.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashSet;
use tracing::{debug, info};

use tile_arbiter_domain::{
    AppId, AppRef, ArbiterError, PlatformProxy, UsagesMap, ViewToken,
};

/// Log-only platform proxy.
#[derive(Debug, Default)]
pub struct PassthroughProxy {
    mapped: Mutex<HashSet<AppId>>,
}

impl PassthroughProxy {
    /// Create the proxy
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an application currently holds a mapping
    pub fn is_mapped(&self, app: &AppId) -> bool {
        self.mapped.lock().contains(app)
    }
}

#[async_trait]
impl PlatformProxy for PassthroughProxy {
    async fn setup(&self, app: &AppRef) -> Result<(), ArbiterError> {
        debug!(app = %app.id(), "platform setup");
        Ok(())
    }

    async fn release(&self, app: &AppRef) -> Result<(), ArbiterError> {
        self.mapped.lock().remove(app.id());
        debug!(app = %app.id(), "platform release");
        Ok(())
    }

    async fn reclaim(&self, app: &AppRef) -> Result<(), ArbiterError> {
        let was_mapped = self.mapped.lock().remove(app.id());
        // Idempotent: reclaiming an unmapped application is a quiet no-op
        debug!(app = %app.id(), was_mapped, "platform reclaim");
        Ok(())
    }

    async fn map(
        &self,
        app: &AppRef,
        usages: &UsagesMap,
        view: ViewToken,
        exclusive: bool,
    ) -> Result<(), ArbiterError> {
        if usages.is_empty() {
            return Err(ArbiterError::MappingFailed(format!(
                "no usages to map for '{}'",
                app.id()
            )));
        }
        info!(
            app = %app.id(),
            resources = usages.len(),
            view = %view,
            exclusive,
            "platform mapping applied"
        );
        self.mapped.lock().insert(app.id().clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::sync::Arc;
    use tile_arbiter_domain::{Application, Priority, ResourcePath, Usage};

    fn app() -> AppRef {
        Arc::new(Application::new(
            AppId::new("a").unwrap(),
            Priority::HIGHEST,
            Vec::new(),
        ))
    }

    fn usages() -> UsagesMap {
        let mut map = BTreeMap::new();
        map.insert(
            ResourcePath::parse("tile0.cluster0.pe").unwrap(),
            Usage::new(10),
        );
        map
    }

    #[tokio::test]
    async fn test_map_then_reclaim_twice() {
        let proxy = PassthroughProxy::new();
        let a = app();

        proxy
            .map(&a, &usages(), ViewToken::new(1), false)
            .await
            .unwrap();
        assert!(proxy.is_mapped(a.id()));

        proxy.reclaim(&a).await.unwrap();
        proxy.reclaim(&a).await.unwrap();
        assert!(!proxy.is_mapped(a.id()));
    }

    #[tokio::test]
    async fn test_empty_mapping_fails() {
        let proxy = PassthroughProxy::new();
        let a = app();
        let err = proxy
            .map(&a, &BTreeMap::new(), ViewToken::new(1), false)
            .await
            .unwrap_err();
        assert!(matches!(err, ArbiterError::MappingFailed(_)));
    }
}
