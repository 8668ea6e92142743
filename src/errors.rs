// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::activity::ActivityError;
use crate::graph::WalkFailure;

#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("No handler registered for resource type '{0}'")]
    HandlerNotFound(String),

    #[error("Cycle detected in dependency graph: {0}")]
    DagCycle(String),

    #[error("Deployment failed: {0}")]
    Failed(WalkFailure<ActivityError>),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl DeployError {
    /// `true` if the run failed only because handlers observed cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            DeployError::Failed(failure) => failure.errors().iter().all(|e| e.is_cancelled()),
            _ => false,
        }
    }
}

impl From<WalkFailure<ActivityError>> for DeployError {
    fn from(failure: WalkFailure<ActivityError>) -> Self {
        DeployError::Failed(failure)
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, DeployError>;
