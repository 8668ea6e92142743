// src/resource.rs

//! Contracts supplied by the caller of a deployment: the resources to apply
//! and the context the run executes in.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::handler::HandlerLookup;

/// Something a deployment applies.
///
/// A resource names the resources that must be applied before it. Those
/// antecedents must themselves be part of the same deployment.
pub trait Resource: Send + Sync + fmt::Debug {
    /// Stable key, unique (case-insensitively) within one deployment.
    fn key(&self) -> &str;

    /// Type name used to resolve the handler that applies this resource.
    fn resource_type(&self) -> &str;

    fn antecedents(&self) -> &[Arc<dyn Resource>];

    /// Lets handlers recover their concrete resource type.
    fn as_any(&self) -> &dyn Any;
}

/// Per-run settings handed to the manager and to every handler.
#[derive(Clone)]
pub struct DeploymentContext {
    parallel: bool,
    handlers: Arc<dyn HandlerLookup>,
}

impl DeploymentContext {
    /// A context running independent branches concurrently.
    pub fn new(handlers: Arc<dyn HandlerLookup>) -> Self {
        Self {
            parallel: true,
            handlers,
        }
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    pub fn handlers(&self) -> &dyn HandlerLookup {
        self.handlers.as_ref()
    }
}

impl fmt::Debug for DeploymentContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentContext")
            .field("parallel", &self.parallel)
            .finish_non_exhaustive()
    }
}
