use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;
use deploydag::handler::{HandlerError, HandlerRegistry, ResourceHandler};
use deploydag::resource::{DeploymentContext, Resource};
use tokio_util::sync::CancellationToken;

use crate::builders::{MockResource, MOCK_TYPE};

/// What happened to one resource key.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Record {
    pub applies: usize,
    pub started: Option<usize>,
    pub completed: Option<usize>,
}

/// A handler for `MockResource` that:
/// - records a strictly increasing start and completion index per key
/// - counts how often each key was applied
/// - sleeps for the resource's delay, giving up when cancelled
/// - fails resources built with `.fail()`.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    started: AtomicUsize,
    completed: AtomicUsize,
    records: Mutex<HashMap<String, Record>>,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A context resolving `mock` resources to `handler`.
    pub fn context(handler: &Arc<Self>, parallel: bool) -> DeploymentContext {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Arc::clone(handler) as Arc<dyn ResourceHandler>)
            .expect("registering recording handler");
        DeploymentContext::new(Arc::new(registry)).with_parallel(parallel)
    }

    pub fn record(&self, key: &str) -> Record {
        self.records
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// 1-based completion index of `key`, if it completed.
    pub fn completed_index(&self, key: &str) -> Option<usize> {
        self.record(key).completed
    }

    pub fn apply_count(&self, key: &str) -> usize {
        self.record(key).applies
    }

    /// Keys in the order they completed.
    pub fn completion_order(&self) -> Vec<String> {
        let records = self.records.lock().unwrap();
        let mut done: Vec<(usize, String)> = records
            .iter()
            .filter_map(|(key, r)| r.completed.map(|i| (i, key.clone())))
            .collect();
        done.sort();
        done.into_iter().map(|(_, key)| key).collect()
    }

    fn update(&self, key: &str, f: impl FnOnce(&mut Record)) {
        let mut records = self.records.lock().unwrap();
        f(records.entry(key.to_string()).or_default());
    }
}

#[async_trait]
impl ResourceHandler for RecordingHandler {
    fn resource_type(&self) -> &str {
        MOCK_TYPE
    }

    async fn apply(
        &self,
        _context: &DeploymentContext,
        resource: &dyn Resource,
        cancel: &CancellationToken,
    ) -> Result<(), HandlerError> {
        let mock = resource
            .as_any()
            .downcast_ref::<MockResource>()
            .ok_or_else(|| anyhow!("'{}' is not a MockResource", resource.key()))?;
        let key = resource.key();

        if cancel.is_cancelled() {
            return Err(HandlerError::Cancelled);
        }

        let started = self.started.fetch_add(1, Ordering::SeqCst) + 1;
        self.update(key, |r| {
            r.applies += 1;
            r.started = Some(started);
        });

        tokio::select! {
            _ = tokio::time::sleep(mock.delay()) => {}
            _ = cancel.cancelled() => return Err(HandlerError::Cancelled),
        }

        if mock.fails() {
            return Err(HandlerError::Failed(anyhow!("{key} exploded")));
        }

        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        self.update(key, |r| r.completed = Some(completed));
        Ok(())
    }
}
