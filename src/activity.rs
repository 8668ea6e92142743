// src/activity.rs

//! Named, deferred unit of work carried by graph nodes during a deployment.

use std::cmp::Ordering;
use std::fmt;
use std::future::Future;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;

use crate::errors::{DeployError, Result};
use crate::handler::HandlerError;

type Action = Arc<dyn Fn() -> BoxFuture<'static, std::result::Result<(), HandlerError>> + Send + Sync>;

/// Failure of a single activity, tagged with its key.
#[derive(Error, Debug)]
pub enum ActivityError {
    #[error("activity '{key}' was cancelled")]
    Cancelled { key: String },

    #[error("activity '{key}' failed: {source:#}")]
    Failed {
        key: String,
        #[source]
        source: anyhow::Error,
    },
}

impl ActivityError {
    fn from_handler(key: &str, err: HandlerError) -> Self {
        match err {
            HandlerError::Cancelled => ActivityError::Cancelled {
                key: key.to_string(),
            },
            HandlerError::Failed(source) => ActivityError::Failed {
                key: key.to_string(),
                source,
            },
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ActivityError::Cancelled { key } | ActivityError::Failed { key, .. } => key,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ActivityError::Cancelled { .. })
    }
}

/// A keyed, deferred action.
///
/// Equality and hashing use the key only, compared case-insensitively, so two
/// activities with the same key are the same graph node whatever their action.
/// `order` is a display / tie-break sequence number; execution order comes
/// from the graph.
#[derive(Clone)]
pub struct Activity {
    key: String,
    order: usize,
    action: Action,
}

impl Activity {
    pub fn new<F, Fut>(key: impl Into<String>, order: usize, action: F) -> Result<Self>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), HandlerError>> + Send + 'static,
    {
        let key = key.into();
        if key.trim().is_empty() {
            return Err(DeployError::InvalidArgument(
                "activity key must not be empty".to_string(),
            ));
        }

        Ok(Self {
            key,
            order,
            action: Arc::new(move || action().boxed()),
        })
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Start the deferred action.
    ///
    /// The returned future owns everything it needs, so it can outlive `self`.
    pub fn execute(&self) -> BoxFuture<'static, std::result::Result<(), ActivityError>> {
        let key = self.key.clone();
        let run = (self.action)();
        async move { run.await.map_err(|err| ActivityError::from_handler(&key, err)) }.boxed()
    }

    /// Compare by sequence number only.
    pub fn cmp_by_order(&self, other: &Activity) -> Ordering {
        self.order.cmp(&other.order)
    }

    fn folded_key(&self) -> impl Iterator<Item = char> + '_ {
        fold_chars(&self.key)
    }
}

fn fold_chars(key: &str) -> impl Iterator<Item = char> + '_ {
    key.chars().flat_map(char::to_lowercase)
}

/// Case-folded key. Two activities are equal exactly when their folded keys
/// are; anything indexing activities by key must use this form.
pub(crate) fn fold_key(key: &str) -> String {
    fold_chars(key).collect()
}

impl PartialEq for Activity {
    fn eq(&self, other: &Self) -> bool {
        self.folded_key().eq(other.folded_key())
    }
}

impl Eq for Activity {}

impl Hash for Activity {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for c in self.folded_key() {
            c.hash(state);
        }
    }
}

impl fmt::Display for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity")
            .field("key", &self.key)
            .field("order", &self.order)
            .finish_non_exhaustive()
    }
}
