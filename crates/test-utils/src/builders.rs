#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use deploydag::resource::Resource;

/// Resource type applied by [`crate::recording_handler::RecordingHandler`].
pub const MOCK_TYPE: &str = "mock";

/// In-memory resource for manager tests.
#[derive(Debug)]
pub struct MockResource {
    key: String,
    resource_type: String,
    delay: Duration,
    fail: bool,
    antecedents: Vec<Arc<dyn Resource>>,
}

impl MockResource {
    pub fn builder(key: &str) -> MockResourceBuilder {
        MockResourceBuilder::new(key)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn fails(&self) -> bool {
        self.fail
    }
}

impl Resource for MockResource {
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

/// Builder for `MockResource`.
pub struct MockResourceBuilder {
    resource: MockResource,
}

impl MockResourceBuilder {
    pub fn new(key: &str) -> Self {
        Self {
            resource: MockResource {
                key: key.to_string(),
                resource_type: MOCK_TYPE.to_string(),
                delay: Duration::ZERO,
                fail: false,
                antecedents: vec![],
            },
        }
    }

    pub fn delay_ms(mut self, ms: u64) -> Self {
        self.resource.delay = Duration::from_millis(ms);
        self
    }

    pub fn fail(mut self) -> Self {
        self.resource.fail = true;
        self
    }

    pub fn resource_type(mut self, resource_type: &str) -> Self {
        self.resource.resource_type = resource_type.to_string();
        self
    }

    pub fn after(mut self, antecedent: &Arc<MockResource>) -> Self {
        let antecedent: Arc<dyn Resource> = antecedent.clone();
        self.resource.antecedents.push(antecedent);
        self
    }

    pub fn build(self) -> Arc<MockResource> {
        Arc::new(self.resource)
    }
}

/// Erase a list of mock resources into the collection `deploy` takes,
/// keeping the given order.
pub fn resources(items: &[&Arc<MockResource>]) -> Vec<Arc<dyn Resource>> {
    items
        .iter()
        .map(|r| Arc::clone(*r) as Arc<dyn Resource>)
        .collect()
}
