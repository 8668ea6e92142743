// tests/property/graph.rs

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use deploydag::graph::Graph;
use deploydag::manager::DeploymentManager;
use deploydag::resource::Resource;
use deploydag_test_utils::{MockResource, RecordingHandler};
use proptest::prelude::*;
use tokio_util::sync::CancellationToken;

/// A random DAG as `(delay_ms, antecedents)` per node.
///
/// Acyclic by construction: node N only depends on nodes 0..N-1.
fn dag_strategy(max_nodes: usize) -> impl Strategy<Value = Vec<(u64, BTreeSet<usize>)>> {
    (1..=max_nodes).prop_flat_map(|num_nodes| {
        proptest::collection::vec(
            (0..5u64, proptest::collection::vec(any::<usize>(), 0..4)),
            num_nodes,
        )
        .prop_map(|raw| {
            raw.into_iter()
                .enumerate()
                .map(|(i, (delay, potential))| {
                    let deps = if i == 0 {
                        BTreeSet::new()
                    } else {
                        potential.into_iter().map(|d| d % i).collect()
                    };
                    (delay, deps)
                })
                .collect()
        })
    })
}

fn name(i: usize) -> String {
    format!("r{i}")
}

fn build_resources(dag: &[(u64, BTreeSet<usize>)], reverse: bool) -> Vec<Arc<dyn Resource>> {
    let mut built: Vec<Arc<MockResource>> = Vec::with_capacity(dag.len());
    for (i, (delay, deps)) in dag.iter().enumerate() {
        let mut builder = MockResource::builder(&name(i)).delay_ms(*delay);
        for &d in deps {
            builder = builder.after(&built[d]);
        }
        built.push(builder.build());
    }

    let mut resources: Vec<Arc<dyn Resource>> = built
        .into_iter()
        .map(|r| r as Arc<dyn Resource>)
        .collect();
    if reverse {
        resources.reverse();
    }
    resources
}

fn graph_of(dag: &[(u64, BTreeSet<usize>)]) -> Graph<usize> {
    let mut graph = Graph::new();
    for (i, (_, deps)) in dag.iter().enumerate() {
        graph.add(i);
        for &d in deps {
            graph.set_antecedent(i, d);
        }
    }
    graph
}

fn positions(order: &[&usize]) -> HashMap<usize, usize> {
    order.iter().enumerate().map(|(pos, &&v)| (v, pos)).collect()
}

proptest! {
    #[test]
    fn every_resource_runs_once_after_its_antecedents(
        dag in dag_strategy(12),
        parallel in any::<bool>(),
        reverse in any::<bool>(),
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .start_paused(true)
            .build()
            .unwrap();

        let handler = RecordingHandler::new();
        let context = RecordingHandler::context(&handler, parallel);
        let resources = build_resources(&dag, reverse);

        runtime
            .block_on(DeploymentManager::new().deploy(&context, &resources, CancellationToken::new()))
            .unwrap();

        for (i, (_, deps)) in dag.iter().enumerate() {
            prop_assert_eq!(handler.apply_count(&name(i)), 1);
            let after = handler.completed_index(&name(i)).unwrap();
            for &d in deps {
                let before = handler.completed_index(&name(d)).unwrap();
                prop_assert!(
                    before < after,
                    "r{} ({}) must complete before r{} ({})", d, before, i, after
                );
            }
        }
    }

    #[test]
    fn sort_orders_respect_every_edge(dag in dag_strategy(15)) {
        let graph = graph_of(&dag);

        let ascending = graph.sort(false);
        let descending = graph.sort(true);
        prop_assert_eq!(ascending.len(), dag.len());
        prop_assert_eq!(descending.len(), dag.len());

        let asc = positions(&ascending);
        let desc = positions(&descending);
        for (i, (_, deps)) in dag.iter().enumerate() {
            for &d in deps {
                // Dependencies first / dependents first.
                prop_assert!(asc[&d] < asc[&i]);
                prop_assert!(desc[&i] < desc[&d]);
            }
        }
    }

    #[test]
    fn chain_sorts_are_mirror_images(len in 1..20usize) {
        let mut graph = Graph::new();
        graph.add(0usize);
        for i in 1..len {
            graph.set_antecedent(i - 1, i);
        }

        let mut descending: Vec<usize> = graph.sort(true).into_iter().copied().collect();
        descending.reverse();
        let ascending: Vec<usize> = graph.sort(false).into_iter().copied().collect();
        prop_assert_eq!(descending, ascending);
    }

    #[test]
    fn random_dags_have_no_cycle(dag in dag_strategy(15)) {
        prop_assert!(graph_of(&dag).find_cycle().is_none());
    }
}
