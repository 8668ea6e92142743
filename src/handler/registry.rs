// src/handler/registry.rs

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::errors::{DeployError, Result};

use super::builtin::{CommandHandler, SleepHandler};
use super::{normalize_type, HandlerLookup, ResourceHandler};

/// In-memory handler lookup keyed by case-folded resource type.
///
/// Registration is where handlers are validated: the type must be non-empty
/// and may only be claimed once.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, Arc<dyn ResourceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry pre-loaded with the `command` and `sleep` handlers.
    pub fn with_builtin_handlers() -> Result<Self> {
        let mut registry = Self::new();
        registry.register(Arc::new(CommandHandler))?;
        registry.register(Arc::new(SleepHandler))?;
        Ok(registry)
    }

    pub fn register(&mut self, handler: Arc<dyn ResourceHandler>) -> Result<()> {
        let resource_type = normalize_type(handler.resource_type());
        if resource_type.is_empty() {
            return Err(DeployError::InvalidArgument(
                "handler resource type must not be empty".to_string(),
            ));
        }
        if self.handlers.contains_key(&resource_type) {
            return Err(DeployError::ConfigError(format!(
                "a handler for resource type '{resource_type}' is already registered"
            )));
        }

        debug!(resource_type = %resource_type, "registered resource handler");
        self.handlers.insert(resource_type, handler);
        Ok(())
    }

    /// Registered resource types, sorted.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl HandlerLookup for HandlerRegistry {
    fn lookup(&self, resource_type: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.handlers.get(&normalize_type(resource_type)).cloned()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("resource_types", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}
