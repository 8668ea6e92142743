// src/plan/validate.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;

use crate::activity::fold_key;
use crate::errors::{DeployError, Result};
use crate::handler::builtin::{COMMAND_TYPE, SLEEP_TYPE};
use crate::handler::normalize_type;
use crate::plan::model::{PlanFile, RawPlanFile};

impl TryFrom<RawPlanFile> for PlanFile {
    type Error = DeployError;

    fn try_from(raw: RawPlanFile) -> std::result::Result<Self, Self::Error> {
        let build_order = validate_raw_plan(&raw)?;
        Ok(PlanFile::new_unchecked(raw.deploy, raw.resource, build_order))
    }
}

/// Validate and return the keys in dependency-first order.
fn validate_raw_plan(plan: &RawPlanFile) -> Result<Vec<String>> {
    ensure_has_resources(plan)?;
    validate_unique_keys(plan)?;
    validate_resource_settings(plan)?;
    validate_resource_dependencies(plan)?;
    validate_dag(plan)
}

fn ensure_has_resources(plan: &RawPlanFile) -> Result<()> {
    if plan.resource.is_empty() {
        return Err(DeployError::ConfigError(
            "plan must contain at least one [resource.<key>] section".to_string(),
        ));
    }
    Ok(())
}

/// Keys are compared case-insensitively once deployed, so `App` and `app`
/// would collapse into one activity.
fn validate_unique_keys(plan: &RawPlanFile) -> Result<()> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for key in plan.resource.keys() {
        if key.trim().is_empty() {
            return Err(DeployError::ConfigError(
                "resource keys must not be empty".to_string(),
            ));
        }
        if let Some(previous) = seen.insert(fold_key(key), key) {
            return Err(DeployError::ConfigError(format!(
                "resources '{}' and '{}' differ only by case",
                previous, key
            )));
        }
    }
    Ok(())
}

fn validate_resource_settings(plan: &RawPlanFile) -> Result<()> {
    for (key, resource) in plan.resource.iter() {
        let resource_type = normalize_type(&resource.resource_type);
        if resource_type.is_empty() {
            return Err(DeployError::ConfigError(format!(
                "resource '{}' has an empty `type`",
                key
            )));
        }

        if resource_type == COMMAND_TYPE && resource.cmd.is_none() {
            return Err(DeployError::ConfigError(format!(
                "resource '{}' of type '{}' requires `cmd`",
                key, COMMAND_TYPE
            )));
        }
        if resource_type == SLEEP_TYPE && resource.duration_ms.is_none() {
            return Err(DeployError::ConfigError(format!(
                "resource '{}' of type '{}' requires `duration_ms`",
                key, SLEEP_TYPE
            )));
        }
    }
    Ok(())
}

fn validate_resource_dependencies(plan: &RawPlanFile) -> Result<()> {
    for (key, resource) in plan.resource.iter() {
        for dep in resource.after.iter() {
            if !plan.resource.contains_key(dep) {
                return Err(DeployError::ConfigError(format!(
                    "resource '{}' has unknown dependency '{}' in `after`",
                    key, dep
                )));
            }
            if dep == key {
                return Err(DeployError::ConfigError(format!(
                    "resource '{}' cannot depend on itself in `after`",
                    key
                )));
            }
        }
    }
    Ok(())
}

fn validate_dag(plan: &RawPlanFile) -> Result<Vec<String>> {
    // Edge direction: dependency -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for key in plan.resource.keys() {
        graph.add_node(key.as_str());
    }

    for (key, resource) in plan.resource.iter() {
        for dep in resource.after.iter() {
            graph.add_edge(dep.as_str(), key.as_str(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(order) => Ok(order.into_iter().map(str::to_string).collect()),
        Err(cycle) => Err(DeployError::DagCycle(format!(
            "cycle detected in plan involving resource '{}'",
            cycle.node_id()
        ))),
    }
}
