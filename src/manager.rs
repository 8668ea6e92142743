// src/manager.rs

//! Deployment orchestration: resources in, one graph walk out.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::activity::{fold_key, Activity};
use crate::errors::{DeployError, Result};
use crate::graph::Graph;
use crate::handler::ResourceHandlerAdaptor;
use crate::resource::{DeploymentContext, Resource};

/// Applies a collection of resources in dependency order.
///
/// Stateless: every [`deploy`](DeploymentManager::deploy) builds its own graph
/// and memo table, nothing is cached between runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeploymentManager;

impl DeploymentManager {
    pub fn new() -> Self {
        Self
    }

    /// Build the activity graph for `resources` without running anything.
    ///
    /// Each resource gets a 1-based order in input order and an activity that
    /// applies it through the handler `context` resolves for its type. Edges
    /// mirror each resource's antecedents.
    ///
    /// Fails before any action could run if a handler is missing or does not
    /// bind, two resources share a key, or an antecedent is not part of
    /// `resources`.
    pub fn plan(
        &self,
        context: &DeploymentContext,
        resources: &[Arc<dyn Resource>],
        cancel: &CancellationToken,
    ) -> Result<Graph<Activity>> {
        let mut activities: HashMap<String, Activity> = HashMap::with_capacity(resources.len());
        let mut ordered: Vec<Activity> = Vec::with_capacity(resources.len());

        for (index, resource) in resources.iter().enumerate() {
            let activity = self.activity_for(context, resource, index + 1, cancel)?;

            let folded = fold_key(resource.key());
            if activities.contains_key(&folded) {
                return Err(DeployError::ConfigError(format!(
                    "resource key '{}' appears more than once",
                    resource.key()
                )));
            }
            activities.insert(folded, activity.clone());
            ordered.push(activity);
        }

        let mut graph = Graph::new();
        for activity in ordered.iter() {
            graph.add(activity.clone());
        }

        for (resource, activity) in resources.iter().zip(ordered.iter()) {
            for antecedent in resource.antecedents() {
                let before = activities
                    .get(&fold_key(antecedent.key()))
                    .ok_or_else(|| {
                        DeployError::ResourceNotFound(format!(
                            "resource '{}' depends on '{}', which is not part of this deployment",
                            resource.key(),
                            antecedent.key()
                        ))
                    })?;
                graph.set_antecedent(activity.clone(), before.clone());
            }
        }

        debug!(activities = graph.len(), "deployment graph built");
        Ok(graph)
    }

    /// Apply every resource once, each after all of its antecedents.
    ///
    /// Independent branches run concurrently when `context.parallel()` is set;
    /// otherwise one at a time, stopping at the first failure. `cancel` is
    /// handed to every handler, which decide themselves how to honour it.
    pub async fn deploy(
        &self,
        context: &DeploymentContext,
        resources: &[Arc<dyn Resource>],
        cancel: CancellationToken,
    ) -> Result<()> {
        let graph = self.plan(context, resources, &cancel)?;

        if let Some(activity) = graph.find_cycle() {
            return Err(DeployError::DagCycle(format!(
                "resource '{}' depends on itself through its antecedents",
                activity.key()
            )));
        }

        info!(
            resources = graph.len(),
            parallel = context.parallel(),
            "deployment starting"
        );

        let outcome = graph
            .walk(
                |activity: &Activity| {
                    let key = activity.key().to_string();
                    let run = activity.execute();
                    async move {
                        debug!(activity = %key, "applying");
                        let result = run.await;
                        match &result {
                            Ok(()) => debug!(activity = %key, "applied"),
                            Err(err) => warn!(activity = %key, error = %err, "apply failed"),
                        }
                        result
                    }
                },
                context.parallel(),
            )
            .await;

        match outcome {
            Ok(()) => {
                info!(resources = graph.len(), "deployment finished");
                Ok(())
            }
            Err(failure) => {
                warn!(failures = failure.errors().len(), "deployment failed");
                Err(DeployError::from(failure))
            }
        }
    }

    fn activity_for(
        &self,
        context: &DeploymentContext,
        resource: &Arc<dyn Resource>,
        order: usize,
        cancel: &CancellationToken,
    ) -> Result<Activity> {
        let resource_type = resource.resource_type();
        let handler = context
            .handlers()
            .lookup(resource_type)
            .ok_or_else(|| DeployError::HandlerNotFound(resource_type.to_string()))?;
        let adaptor = Arc::new(ResourceHandlerAdaptor::bind(resource_type, Some(handler))?);

        let context = context.clone();
        let resource = Arc::clone(resource);
        let cancel = cancel.clone();
        let key = resource.key().to_string();

        Activity::new(key, order, move || {
            let adaptor = Arc::clone(&adaptor);
            let context = context.clone();
            let resource = Arc::clone(&resource);
            let cancel = cancel.clone();
            async move { adaptor.apply(&context, resource.as_ref(), &cancel).await }
        })
    }
}
