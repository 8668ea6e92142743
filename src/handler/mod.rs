// src/handler/mod.rs

//! Handler contract and resolution.
//!
//! - [`ResourceHandler`] is the one call every resource type implements.
//! - [`HandlerLookup`] is the capability lookup the manager resolves
//!   handlers through; [`registry::HandlerRegistry`] is the default one.
//! - [`adaptor`] binds a resolved handler to a resource type, checking the
//!   pairing once up front.
//! - [`builtin`] ships the `command` and `sleep` handlers used by plan files.

pub mod adaptor;
pub mod builtin;
pub mod registry;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::activity::fold_key;
use crate::resource::{DeploymentContext, Resource};

pub use adaptor::ResourceHandlerAdaptor;
pub use builtin::{CommandHandler, SleepHandler};
pub use registry::HandlerRegistry;

/// Outcome of a failed `apply`.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// The handler observed the cancellation token and gave up.
    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Failed(#[from] anyhow::Error),
}

/// Applies resources of one type.
///
/// Cancellation is cooperative: implementations should watch `cancel` around
/// anything that waits and return [`HandlerError::Cancelled`] when it fires.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// The resource type this handler applies.
    fn resource_type(&self) -> &str;

    async fn apply(
        &self,
        context: &DeploymentContext,
        resource: &dyn Resource,
        cancel: &CancellationToken,
    ) -> Result<(), HandlerError>;
}

/// Trimmed, case-folded resource type. Registration, lookup, binding and
/// plan validation all compare types in this form.
pub(crate) fn normalize_type(resource_type: &str) -> String {
    fold_key(resource_type.trim())
}

/// Resolves the handler for a resource type.
pub trait HandlerLookup: Send + Sync {
    fn lookup(&self, resource_type: &str) -> Option<Arc<dyn ResourceHandler>>;
}
