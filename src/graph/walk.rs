// src/graph/walk.rs

//! Dependency-ordered async traversal.
//!
//! Starting from the frontier (nodes nothing depends on), each node first
//! walks its antecedents and then runs the action on its own value. A memo
//! table keyed by [`NodeId`] holds one [`OnceCell`] per node: whichever branch
//! reaches a node first runs it, every other branch awaits the same cell and
//! observes the same outcome. That is what keeps a shared antecedent from
//! being applied twice.

use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{join_all, BoxFuture};
use tokio::sync::OnceCell;
use tracing::trace;

use super::{Graph, Identity, NodeId};

/// Failures collected from a walk.
///
/// Always holds at least one error. Errors are shared so that every branch
/// waiting on a failed node reports the same instance; a shared failure is
/// reported once even when several branches observed it.
#[derive(Debug)]
pub struct WalkFailure<E> {
    errors: Vec<Arc<E>>,
}

impl<E> Clone for WalkFailure<E> {
    fn clone(&self) -> Self {
        Self {
            errors: self.errors.clone(),
        }
    }
}

impl<E> WalkFailure<E> {
    fn single(error: E) -> Self {
        Self {
            errors: vec![Arc::new(error)],
        }
    }

    fn absorb(&mut self, other: WalkFailure<E>) {
        for error in other.errors {
            if !self.errors.iter().any(|seen| Arc::ptr_eq(seen, &error)) {
                self.errors.push(error);
            }
        }
    }

    pub fn errors(&self) -> &[Arc<E>] {
        &self.errors
    }

    pub fn first(&self) -> &E {
        &self.errors[0]
    }
}

impl<E: fmt::Display> fmt::Display for WalkFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [only] = self.errors.as_slice() {
            return fmt::Display::fmt(only, f);
        }

        write!(f, "{} branches failed: ", self.errors.len())?;
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            fmt::Display::fmt(error, f)?;
        }
        Ok(())
    }
}

impl<E: Error + 'static> Error for WalkFailure<E> {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self.errors.as_slice() {
            [only] => Some(only.as_ref()),
            _ => None,
        }
    }
}

type Outcome<E> = Result<(), WalkFailure<E>>;

struct Walker<'g, T, I: Identity<T>, F, E> {
    graph: &'g Graph<T, I>,
    action: F,
    parallel: bool,
    memo: DashMap<NodeId, Arc<OnceCell<Outcome<E>>>>,
}

impl<'g, T, I, F, Fut, E> Walker<'g, T, I, F, E>
where
    T: Sync,
    I: Identity<T> + Sync,
    I::Key: Sync,
    F: Fn(&T) -> Fut + Sync,
    Fut: Future<Output = Result<(), E>> + Send + 'g,
    E: Send + Sync,
{
    fn walk_all<'a>(&'a self, ids: &'a [NodeId]) -> BoxFuture<'a, Outcome<E>> {
        Box::pin(async move {
            if self.parallel {
                // Every branch settles before failures are reported so no
                // in-flight action is orphaned.
                let outcomes = join_all(ids.iter().map(|&id| self.walk_node(id))).await;
                let mut failure: Option<WalkFailure<E>> = None;
                for outcome in outcomes {
                    if let Err(err) = outcome {
                        match failure.as_mut() {
                            Some(acc) => acc.absorb(err),
                            None => failure = Some(err),
                        }
                    }
                }
                failure.map_or(Ok(()), Err)
            } else {
                for &id in ids {
                    self.walk_node(id).await?;
                }
                Ok(())
            }
        })
    }

    fn walk_node(&self, id: NodeId) -> BoxFuture<'_, Outcome<E>> {
        Box::pin(async move {
            let cell = self.memo.entry(id).or_default().clone();
            cell.get_or_init(|| self.run_node(id)).await.clone()
        })
    }

    fn run_node(&self, id: NodeId) -> BoxFuture<'_, Outcome<E>> {
        Box::pin(async move {
            let node = &self.graph.nodes[id.0];
            self.walk_all(node.antecedents()).await?;
            trace!(node = %id, "antecedents settled; running action");
            (self.action)(node.value())
                .await
                .map_err(WalkFailure::single)
        })
    }
}

impl<T, I: Identity<T>> Graph<T, I> {
    /// Run `action` once on every value, never before the actions of all its
    /// antecedents have completed.
    ///
    /// With `parallel`, sibling branches (frontier nodes, and the antecedents
    /// of any node) run concurrently and all of them settle before the walk
    /// returns; every distinct failure is collected. Without it, branches are
    /// awaited one at a time in insertion order and the first failure stops
    /// the walk.
    ///
    /// The graph must be acyclic (see [`Graph::find_cycle`]); on a cycle the
    /// walk never completes.
    pub async fn walk<'g, F, Fut, E>(
        &'g self,
        action: F,
        parallel: bool,
    ) -> Result<(), WalkFailure<E>>
    where
        T: Sync,
        I: Sync,
        I::Key: Sync,
        F: Fn(&T) -> Fut + Sync,
        Fut: Future<Output = Result<(), E>> + Send + 'g,
        E: Send + Sync,
    {
        let frontier = self.frontier();
        let walker = Walker {
            graph: self,
            action,
            parallel,
            memo: DashMap::new(),
        };
        walker.walk_all(&frontier).await
    }
}
