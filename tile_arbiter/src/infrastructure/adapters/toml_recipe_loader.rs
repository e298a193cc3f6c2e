// /////////////////////////////////////////////////////////////////////////////
// Tile Arbiter RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # TOML Recipe Loader
//!
//! Loads an application's working-mode menu from `<name>.recipe` files in a
//! configured directory. A recipe declares the priority class, an optional
//! reconfiguration latency ceiling, and per working mode an id, a static
//! value in `[0, 1]` and its resource requests; request amounts accept unit
//! suffixes (`16MiB`, `2KB`) next to plain integers. Plugin-data sections
//! are opaque key-value tables handed through to the application's
//! attribute container.
//!
//! ## Example Recipe
//!
//! ```toml
//! priority = 1
//! latency_ceiling_ms = 100
//!
//! [[working_mode]]
//! id = 0
//! name = "low-quality"
//! value = 0.4
//!
//! [working_mode.resources]
//! "tile.cluster.pe" = 2
//! "tile.cluster.mem" = "16MiB"
//!
//! [plugin_data.cgroups]
//! cpuset = "0-3"
//! ```
//!
//! Requests whose template matches nothing on this platform are dropped and
//! reported through [`RecipeQuality::Weak`]; the recipe stays loadable as
//! long as at least one working mode keeps a resolvable request.

use async_trait::async_trait;
use byte_unit::Byte;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use tile_arbiter_domain::{
    ArbiterError, AttributeContainer, AttributeValue, Priority, Recipe, RecipeLoad, RecipeLoader,
    RecipeQuality, ResourceCatalog, ResourcePath, WorkingMode,
};

/// Raw amount as written in the recipe: a plain integer or a unit string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawAmount {
    Integer(u64),
    Text(String),
}

impl RawAmount {
    fn resolve(&self) -> Result<u64, ArbiterError> {
        match self {
            RawAmount::Integer(amount) => Ok(*amount),
            RawAmount::Text(text) => Byte::parse_str(text, true)
                .map(|byte| byte.as_u64())
                .map_err(|err| {
                    ArbiterError::FormatError(format!("amount '{}': {}", text, err))
                }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WorkingModeDoc {
    id: u8,
    #[serde(default)]
    name: Option<String>,
    value: f32,
    #[serde(default)]
    resources: BTreeMap<String, RawAmount>,
}

#[derive(Debug, Deserialize)]
struct RecipeDoc {
    #[serde(default)]
    priority: u8,
    #[serde(default)]
    latency_ceiling_ms: Option<u64>,
    #[serde(default)]
    working_mode: Vec<WorkingModeDoc>,
    #[serde(default)]
    plugin_data: BTreeMap<String, BTreeMap<String, toml::Value>>,
}

/// Recipe loader over a directory of TOML `.recipe` files.
pub struct TomlRecipeLoader {
    recipe_dir: PathBuf,
    catalog: Arc<dyn ResourceCatalog>,
}

impl TomlRecipeLoader {
    /// Create a loader resolving request templates against the given
    /// catalog.
    pub fn new(recipe_dir: impl Into<PathBuf>, catalog: Arc<dyn ResourceCatalog>) -> Self {
        TomlRecipeLoader {
            recipe_dir: recipe_dir.into(),
            catalog,
        }
    }

    fn recipe_path(&self, recipe_name: &str) -> PathBuf {
        self.recipe_dir.join(format!("{}.recipe", recipe_name))
    }

    fn parse(&self, text: &str, path: &Path) -> Result<RecipeLoad, ArbiterError> {
        let doc: RecipeDoc = toml::from_str(text).map_err(|err| {
            ArbiterError::FormatError(format!("{}: {}", path.display(), err))
        })?;

        if doc.working_mode.is_empty() {
            return Err(ArbiterError::FormatError(format!(
                "{}: no working mode declared",
                path.display()
            )));
        }

        let priority = Priority::new(doc.priority)
            .map_err(|err| ArbiterError::FormatError(err.to_string()))?;

        let mut unresolved: Vec<String> = Vec::new();
        let mut working_modes: Vec<WorkingMode> = Vec::new();

        for wm_doc in &doc.working_mode {
            if working_modes.iter().any(|wm| wm.id() == wm_doc.id) {
                return Err(ArbiterError::FormatError(format!(
                    "{}: duplicate working mode id {}",
                    path.display(),
                    wm_doc.id
                )));
            }

            let name = wm_doc
                .name
                .clone()
                .unwrap_or_else(|| format!("wm{}", wm_doc.id));
            let mut wm = WorkingMode::new(wm_doc.id, name, wm_doc.value)
                .map_err(|err| ArbiterError::FormatError(err.to_string()))?;

            for (template_text, raw_amount) in &wm_doc.resources {
                let template = ResourcePath::parse(template_text)
                    .map_err(|err| ArbiterError::FormatError(err.to_string()))?;
                if self.catalog.resources_matching(&template.template()).is_empty() {
                    warn!(
                        recipe = %path.display(),
                        template = %template,
                        "request template matches no platform resource"
                    );
                    unresolved.push(template.to_string());
                    continue;
                }
                wm.add_request(template, raw_amount.resolve()?)
                    .map_err(|err| ArbiterError::FormatError(err.to_string()))?;
            }

            if wm.requests().is_empty() {
                unresolved.push(format!("working mode {} (all requests)", wm_doc.id));
                continue;
            }
            working_modes.push(wm);
        }

        if working_modes.is_empty() {
            return Err(ArbiterError::FormatError(format!(
                "{}: no working mode is loadable on this platform",
                path.display()
            )));
        }

        let mut plugin_data = AttributeContainer::new();
        for (ns, values) in &doc.plugin_data {
            for (key, value) in values {
                plugin_data.set(ns.clone(), key.clone(), toml_attribute(value));
            }
        }

        let quality = if unresolved.is_empty() {
            RecipeQuality::Complete
        } else {
            RecipeQuality::Weak {
                unresolved: unresolved.clone(),
            }
        };
        debug!(
            recipe = %path.display(),
            working_modes = working_modes.len(),
            unresolved = unresolved.len(),
            "recipe parsed"
        );

        Ok(RecipeLoad {
            recipe: Recipe {
                priority,
                working_modes,
                latency_ceiling_ms: doc.latency_ceiling_ms,
                plugin_data,
            },
            quality,
        })
    }
}

fn toml_attribute(value: &toml::Value) -> AttributeValue {
    match value {
        toml::Value::String(text) => AttributeValue::Text(text.clone()),
        toml::Value::Integer(number) => AttributeValue::Integer(*number),
        toml::Value::Boolean(flag) => AttributeValue::Boolean(*flag),
        other => AttributeValue::Text(other.to_string()),
    }
}

#[async_trait]
impl RecipeLoader for TomlRecipeLoader {
    async fn load(&self, recipe_name: &str) -> Result<RecipeLoad, ArbiterError> {
        let path = self.recipe_path(recipe_name);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(ArbiterError::not_found(format!(
                    "recipe '{}'",
                    path.display()
                )));
            }
            Err(err) => return Err(err.into()),
        };
        self.parse(&text, &path)
    }
}
