// src/plan/model.rs

use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use crate::resource::Resource;

/// Plan file as read from TOML, before validation.
///
/// ```toml
/// [deploy]
/// parallel = true
///
/// [resource.network]
/// type = "command"
/// cmd = "echo creating network"
///
/// [resource.app]
/// type = "sleep"
/// duration_ms = 250
/// after = ["network"]
/// ```
///
/// All sections are optional at this stage; validation happens in
/// `TryFrom<RawPlanFile> for PlanFile`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawPlanFile {
    #[serde(default)]
    pub deploy: DeploySection,

    /// All resources from `[resource.<key>]`.
    #[serde(default)]
    pub resource: BTreeMap<String, ResourceConfig>,
}

/// Validated plan. Construct through [`crate::plan::load_and_validate`] or
/// `PlanFile::try_from(raw)`.
#[derive(Debug, Clone)]
pub struct PlanFile {
    deploy: DeploySection,
    resource: BTreeMap<String, ResourceConfig>,
    /// Keys with every resource after the resources in its `after`.
    build_order: Vec<String>,
}

/// `[deploy]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploySection {
    /// Run independent resources concurrently (default `true`).
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for DeploySection {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
        }
    }
}

/// `[resource.<key>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceConfig {
    /// Handler type, e.g. `"command"` or `"sleep"`.
    #[serde(rename = "type")]
    pub resource_type: String,

    /// Keys of resources that must be applied first.
    #[serde(default)]
    pub after: Vec<String>,

    /// Shell command for `command` resources.
    #[serde(default)]
    pub cmd: Option<String>,

    /// Delay for `sleep` resources.
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl PlanFile {
    pub(crate) fn new_unchecked(
        deploy: DeploySection,
        resource: BTreeMap<String, ResourceConfig>,
        build_order: Vec<String>,
    ) -> Self {
        Self {
            deploy,
            resource,
            build_order,
        }
    }

    pub fn deploy(&self) -> &DeploySection {
        &self.deploy
    }

    pub fn parallel(&self) -> bool {
        self.deploy.parallel
    }

    pub fn resource_configs(&self) -> &BTreeMap<String, ResourceConfig> {
        &self.resource
    }

    /// Materialise the plan as a resource collection with antecedent
    /// references wired up.
    ///
    /// Resources come back sorted by key, not in the order the file declares
    /// them (TOML tables are unordered), so the 1-based order a deployment
    /// assigns follows key order too.
    pub fn resources(&self) -> Vec<Arc<dyn Resource>> {
        let position: HashMap<&str, usize> = self
            .build_order
            .iter()
            .enumerate()
            .map(|(i, key)| (key.as_str(), i))
            .collect();

        // Validation guarantees every `after` entry is declared and comes
        // earlier in `build_order`.
        let mut built: Vec<Arc<dyn Resource>> = Vec::with_capacity(self.build_order.len());
        for key in self.build_order.iter() {
            let cfg = &self.resource[key];
            let antecedents = cfg
                .after
                .iter()
                .map(|dep| Arc::clone(&built[position[dep.as_str()]]))
                .collect();

            built.push(Arc::new(PlanResource {
                key: key.clone(),
                resource_type: cfg.resource_type.clone(),
                cmd: cfg.cmd.clone(),
                duration: cfg.duration_ms.map(Duration::from_millis),
                antecedents,
            }));
        }

        self.resource
            .keys()
            .map(|key| Arc::clone(&built[position[key.as_str()]]))
            .collect()
    }
}

/// A resource declared in a plan file.
#[derive(Debug)]
pub struct PlanResource {
    key: String,
    resource_type: String,
    cmd: Option<String>,
    duration: Option<Duration>,
    antecedents: Vec<Arc<dyn Resource>>,
}

impl PlanResource {
    pub fn cmd(&self) -> Option<&str> {
        self.cmd.as_deref()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }
}

impl Resource for PlanResource {
    fn key(&self) -> &str {
        &self.key
    }

    fn resource_type(&self) -> &str {
        &self.resource_type
    }

    fn antecedents(&self) -> &[Arc<dyn Resource>] {
        &self.antecedents
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
