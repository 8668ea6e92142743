// src/handler/adaptor.rs

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::errors::{DeployError, Result};
use crate::resource::{DeploymentContext, Resource};

use super::{normalize_type, HandlerError, ResourceHandler};

/// A handler bound to the resource type it will be asked to apply.
///
/// Binding is eager: a missing handler or one registered for a different
/// resource type is rejected by [`ResourceHandlerAdaptor::bind`], never at
/// the first call.
#[derive(Clone)]
pub struct ResourceHandlerAdaptor {
    resource_type: String,
    handler: Arc<dyn ResourceHandler>,
}

impl ResourceHandlerAdaptor {
    pub fn bind(resource_type: &str, handler: Option<Arc<dyn ResourceHandler>>) -> Result<Self> {
        let handler = handler.ok_or_else(|| {
            DeployError::InvalidArgument(format!(
                "no handler supplied for resource type '{resource_type}'"
            ))
        })?;

        if normalize_type(handler.resource_type()) != normalize_type(resource_type) {
            return Err(DeployError::ConfigError(format!(
                "handler for resource type '{}' cannot apply resources of type '{}'",
                handler.resource_type(),
                resource_type
            )));
        }

        Ok(Self {
            resource_type: resource_type.to_string(),
            handler,
        })
    }

    pub fn resource_type(&self) -> &str {
        &self.resource_type
    }

    /// Forward to the bound handler; its outcome is returned unchanged.
    pub async fn apply(
        &self,
        context: &DeploymentContext,
        resource: &dyn Resource,
        cancel: &CancellationToken,
    ) -> std::result::Result<(), HandlerError> {
        self.handler.apply(context, resource, cancel).await
    }
}

impl fmt::Debug for ResourceHandlerAdaptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceHandlerAdaptor")
            .field("resource_type", &self.resource_type)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicBool, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::handler::{HandlerLookup, HandlerRegistry};

    #[derive(Debug)]
    struct Widget;

    impl Resource for Widget {
        fn key(&self) -> &str {
            "widget-1"
        }

        fn resource_type(&self) -> &str {
            "widget"
        }

        fn antecedents(&self) -> &[Arc<dyn Resource>] {
            &[]
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[derive(Default)]
    struct WidgetHandler {
        called: AtomicBool,
    }

    #[async_trait]
    impl ResourceHandler for WidgetHandler {
        fn resource_type(&self) -> &str {
            "widget"
        }

        async fn apply(
            &self,
            _context: &DeploymentContext,
            resource: &dyn Resource,
            _cancel: &CancellationToken,
        ) -> std::result::Result<(), HandlerError> {
            if resource.key() == "broken" {
                return Err(HandlerError::Failed(anyhow::anyhow!("widget jammed")));
            }
            self.called.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    fn context() -> DeploymentContext {
        DeploymentContext::new(Arc::new(HandlerRegistry::new()))
    }

    #[test]
    fn bind_without_handler_is_invalid_argument() {
        let err = ResourceHandlerAdaptor::bind("widget", None).unwrap_err();
        assert!(matches!(err, DeployError::InvalidArgument(_)));
    }

    #[test]
    fn bind_to_handler_for_other_type_is_config_error() {
        let handler: Arc<dyn ResourceHandler> = Arc::new(WidgetHandler::default());
        let err = ResourceHandlerAdaptor::bind("gadget", Some(handler)).unwrap_err();
        match err {
            DeployError::ConfigError(msg) => {
                assert!(msg.contains("widget"));
                assert!(msg.contains("gadget"));
            }
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn bind_ignores_type_case() {
        let handler: Arc<dyn ResourceHandler> = Arc::new(WidgetHandler::default());
        let adaptor = ResourceHandlerAdaptor::bind("Widget", Some(handler)).unwrap();
        assert_eq!(adaptor.resource_type(), "Widget");
    }

    #[test]
    fn bind_accepts_every_type_the_registry_resolves() {
        let mut registry = HandlerRegistry::new();
        registry
            .register(Arc::new(WidgetHandler::default()))
            .unwrap();

        for requested in [" widget ", "WIDGET\t"] {
            let handler = registry.lookup(requested);
            assert!(handler.is_some(), "lookup of {requested:?}");
            ResourceHandlerAdaptor::bind(requested, handler).unwrap();
        }
    }

    #[test]
    fn bind_folds_non_ascii_types() {
        struct EtapeHandler;

        #[async_trait]
        impl ResourceHandler for EtapeHandler {
            fn resource_type(&self) -> &str {
                "ÉTAPE"
            }

            async fn apply(
                &self,
                _context: &DeploymentContext,
                _resource: &dyn Resource,
                _cancel: &CancellationToken,
            ) -> std::result::Result<(), HandlerError> {
                Ok(())
            }
        }

        let handler: Arc<dyn ResourceHandler> = Arc::new(EtapeHandler);
        ResourceHandlerAdaptor::bind(" étape", Some(handler)).unwrap();
    }

    #[tokio::test]
    async fn apply_forwards_to_handler() {
        let handler = Arc::new(WidgetHandler::default());
        let adaptor =
            ResourceHandlerAdaptor::bind("widget", Some(handler.clone() as Arc<dyn ResourceHandler>))
                .unwrap();

        adaptor
            .apply(&context(), &Widget, &CancellationToken::new())
            .await
            .unwrap();

        assert!(handler.called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn apply_propagates_handler_failure() {
        #[derive(Debug)]
        struct Broken;

        impl Resource for Broken {
            fn key(&self) -> &str {
                "broken"
            }

            fn resource_type(&self) -> &str {
                "widget"
            }

            fn antecedents(&self) -> &[Arc<dyn Resource>] {
                &[]
            }

            fn as_any(&self) -> &dyn Any {
                self
            }
        }

        let handler: Arc<dyn ResourceHandler> = Arc::new(WidgetHandler::default());
        let adaptor = ResourceHandlerAdaptor::bind("widget", Some(handler)).unwrap();
        let err = adaptor
            .apply(&context(), &Broken, &CancellationToken::new())
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "widget jammed");
    }
}
