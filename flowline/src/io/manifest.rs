//! Route manifest (`routes.toml`) loading.
//!
//! ```toml
//! [[route]]
//! pattern = "users/{id}"
//! target = "UserView"
//! layouts = ["MainLayout", "UsersLayout"]   # outermost first
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::errors::RouteConfigError;
use crate::core::route_registry::{RouteDefinition, RouteRegistry, RouteTable};
use crate::core::types::{ComponentId, LayoutId};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteManifest {
    #[serde(default, rename = "route")]
    pub routes: Vec<ManifestRoute>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ManifestRoute {
    pub pattern: String,
    pub target: String,
    #[serde(default)]
    pub layouts: Vec<String>,
}

impl RouteManifest {
    pub fn definitions(&self) -> impl Iterator<Item = RouteDefinition> + '_ {
        self.routes.iter().map(|route| RouteDefinition {
            pattern: route.pattern.clone(),
            target: ComponentId::new(route.target.as_str()),
            parent_layouts: route
                .layouts
                .iter()
                .map(|name| LayoutId::new(name.as_str()))
                .collect(),
        })
    }

    /// Register every route and freeze the result. All conflicts are
    /// reported, not only the first.
    pub fn build_table(&self) -> Result<RouteTable, Vec<RouteConfigError>> {
        let mut registry = RouteRegistry::new();
        registry.register_all(self.definitions())?;
        Ok(registry.freeze())
    }
}

pub fn load_manifest(path: &Path) -> Result<RouteManifest> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read manifest {}", path.display()))?;
    let manifest: RouteManifest = toml::from_str(&contents)
        .with_context(|| format!("parse manifest {}", path.display()))?;
    debug!(path = %path.display(), routes = manifest.routes.len(), "route manifest loaded");
    Ok(manifest)
}

/// Load a manifest and build its route table, failing with one message per
/// conflict.
pub fn load_route_table(path: &Path) -> Result<RouteTable> {
    let manifest = load_manifest(path)?;
    manifest.build_table().map_err(|errors| {
        warn!(path = %path.display(), conflicts = errors.len(), "route manifest rejected");
        anyhow!(
            "invalid route configuration in {}: {}",
            path.display(),
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ")
        )
    })
}
