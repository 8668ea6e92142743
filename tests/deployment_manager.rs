// tests/deployment_manager.rs

use std::sync::Arc;
use std::time::Duration;

use deploydag::errors::DeployError;
use deploydag::manager::DeploymentManager;
use deploydag::resource::Resource;
use deploydag_test_utils::{init_tracing, resources, with_timeout, MockResource, RecordingHandler};
use tokio_util::sync::CancellationToken;

type TestResult = Result<(), Box<dyn std::error::Error>>;

/// A..E with B→A, C→B, E→C, D→A (arrow = depends on).
fn scenario_graph() -> Vec<Arc<dyn Resource>> {
    let a = MockResource::builder("A").delay_ms(10).build();
    let b = MockResource::builder("B").delay_ms(10).after(&a).build();
    let c = MockResource::builder("C").delay_ms(10).after(&b).build();
    let d = MockResource::builder("D").delay_ms(70).after(&a).build();
    let e = MockResource::builder("E").delay_ms(10).after(&c).build();
    resources(&[&a, &b, &c, &d, &e])
}

fn assert_edges_respected(handler: &RecordingHandler) {
    for (dependent, antecedent) in [("B", "A"), ("C", "B"), ("E", "C"), ("D", "A")] {
        let before = handler.completed_index(antecedent).unwrap();
        let after = handler.completed_index(dependent).unwrap();
        assert!(
            before < after,
            "{antecedent} ({before}) should complete before {dependent} ({after})"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn parallel_run_completes_in_dependency_order() -> TestResult {
    init_tracing();
    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);

    with_timeout(DeploymentManager::new().deploy(
        &context,
        &scenario_graph(),
        CancellationToken::new(),
    ))
    .await?;

    assert_edges_respected(&handler);
    assert_eq!(handler.completion_order(), vec!["A", "B", "C", "E", "D"]);
    for key in ["A", "B", "C", "D", "E"] {
        assert_eq!(handler.apply_count(key), 1, "{key} applied once");
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sequential_run_is_a_single_depth_first_sequence() -> TestResult {
    init_tracing();
    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, false);

    with_timeout(DeploymentManager::new().deploy(
        &context,
        &scenario_graph(),
        CancellationToken::new(),
    ))
    .await?;

    assert_edges_respected(&handler);
    assert_eq!(handler.completion_order(), vec!["A", "D", "B", "C", "E"]);
    assert_eq!(handler.apply_count("A"), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn sequential_runs_never_overlap() -> TestResult {
    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, false);

    DeploymentManager::new()
        .deploy(&context, &scenario_graph(), CancellationToken::new())
        .await?;

    // Each resource starts only after the previous one completed.
    for key in ["A", "B", "C", "D", "E"] {
        let record = handler.record(key);
        assert_eq!(record.started, record.completed, "{key}");
    }
    Ok(())
}

#[tokio::test]
async fn chain_runs_from_the_deepest_dependency() -> TestResult {
    let c = MockResource::builder("C").build();
    let b = MockResource::builder("B").after(&c).build();
    let a = MockResource::builder("A").after(&b).build();

    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, false);

    DeploymentManager::new()
        .deploy(&context, &resources(&[&a, &b, &c]), CancellationToken::new())
        .await?;

    assert_eq!(handler.completion_order(), vec!["C", "B", "A"]);
    Ok(())
}

#[tokio::test]
async fn shared_antecedent_runs_once_in_both_modes() -> TestResult {
    for parallel in [true, false] {
        let base = MockResource::builder("base").build();
        let left = MockResource::builder("left").after(&base).build();
        let right = MockResource::builder("right").after(&base).build();
        let top = MockResource::builder("top").after(&left).after(&right).build();

        let handler = RecordingHandler::new();
        let context = RecordingHandler::context(&handler, parallel);

        DeploymentManager::new()
            .deploy(
                &context,
                &resources(&[&top, &left, &right, &base]),
                CancellationToken::new(),
            )
            .await?;

        assert_eq!(handler.apply_count("base"), 1, "parallel = {parallel}");
        assert_eq!(handler.completion_order().len(), 4);
    }
    Ok(())
}

#[tokio::test]
async fn missing_antecedent_fails_before_anything_runs() {
    let outsider = MockResource::builder("outsider").build();
    let a = MockResource::builder("A").build();
    let b = MockResource::builder("B").after(&a).after(&outsider).build();

    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);

    let err = DeploymentManager::new()
        .deploy(&context, &resources(&[&a, &b]), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DeployError::ResourceNotFound(msg) => assert!(msg.contains("outsider")),
        other => panic!("expected ResourceNotFound, got {other:?}"),
    }
    assert!(handler.completion_order().is_empty());
    assert_eq!(handler.apply_count("A"), 0);
}

#[tokio::test]
async fn unresolvable_handler_fails_before_anything_runs() {
    let a = MockResource::builder("A").build();
    let b = MockResource::builder("B").resource_type("database").after(&a).build();

    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);

    let err = DeploymentManager::new()
        .deploy(&context, &resources(&[&a, &b]), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::HandlerNotFound(ref t) if t == "database"));
    assert_eq!(handler.apply_count("A"), 0);
}

#[tokio::test]
async fn duplicate_keys_are_rejected() {
    let first = MockResource::builder("web").build();
    let second = MockResource::builder("WEB").build();

    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);

    let err = DeploymentManager::new()
        .deploy(&context, &resources(&[&first, &second]), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::ConfigError(_)));
}

#[tokio::test]
async fn keys_equal_under_case_folding_are_rejected() {
    // `to_lowercase` maps the trailing capital sigma to a final sigma, so
    // only a per-character fold sees these as the same key.
    let upper = MockResource::builder("ΟΔΟΣ").build();
    let lower = MockResource::builder("οδοσ").build();

    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);

    let err = DeploymentManager::new()
        .deploy(&context, &resources(&[&upper, &lower]), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::ConfigError(_)), "got {err:?}");
    assert_eq!(handler.apply_count("ΟΔΟΣ"), 0);
    assert_eq!(handler.apply_count("οδοσ"), 0);
}

#[tokio::test]
async fn cyclic_resources_fail_before_anything_runs() {
    // Antecedents resolve by key, so a stand-in "b" lets "a" point at the
    // real "b" that is built after it.
    let b_ref = MockResource::builder("b").build();
    let a = MockResource::builder("a").after(&b_ref).build();
    let b = MockResource::builder("b").after(&a).build();
    let c = MockResource::builder("c").build();

    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);

    let err = DeploymentManager::new()
        .deploy(&context, &resources(&[&a, &b, &c]), CancellationToken::new())
        .await
        .unwrap_err();

    match err {
        DeployError::DagCycle(msg) => assert!(msg.contains("'a'") || msg.contains("'b'")),
        other => panic!("expected DagCycle, got {other:?}"),
    }
    for key in ["a", "b", "c"] {
        assert_eq!(handler.apply_count(key), 0, "{key}");
    }
}

#[tokio::test(start_paused = true)]
async fn parallel_failures_are_collected_from_every_branch() {
    let base = MockResource::builder("base").build();
    let left = MockResource::builder("left").delay_ms(5).fail().after(&base).build();
    let right = MockResource::builder("right").delay_ms(20).fail().after(&base).build();
    let slow = MockResource::builder("slow").delay_ms(50).after(&base).build();

    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);

    let err = DeploymentManager::new()
        .deploy(
            &context,
            &resources(&[&base, &left, &right, &slow]),
            CancellationToken::new(),
        )
        .await
        .unwrap_err();

    let failure = match err {
        DeployError::Failed(failure) => failure,
        other => panic!("expected Failed, got {other:?}"),
    };
    let mut keys: Vec<&str> = failure.errors().iter().map(|e| e.key()).collect();
    keys.sort();
    assert_eq!(keys, vec!["left", "right"]);

    // The unrelated branch still settled.
    assert!(handler.completed_index("slow").is_some());
}

#[tokio::test(start_paused = true)]
async fn sequential_failure_stops_remaining_branches() {
    let broken = MockResource::builder("broken").fail().build();
    let later = MockResource::builder("later").build();

    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, false);

    let err = DeploymentManager::new()
        .deploy(&context, &resources(&[&broken, &later]), CancellationToken::new())
        .await
        .unwrap_err();

    let failure = match err {
        DeployError::Failed(failure) => failure,
        other => panic!("expected Failed, got {other:?}"),
    };
    assert_eq!(failure.errors().len(), 1);
    assert_eq!(failure.first().key(), "broken");
    assert_eq!(handler.apply_count("later"), 0);
}

#[tokio::test(start_paused = true)]
async fn dependents_of_a_failed_resource_do_not_run() {
    let base = MockResource::builder("base").fail().build();
    let app = MockResource::builder("app").after(&base).build();

    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);

    let err = DeploymentManager::new()
        .deploy(&context, &resources(&[&base, &app]), CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DeployError::Failed(_)));
    assert!(!err.is_cancelled());
    assert_eq!(handler.apply_count("app"), 0);
}

#[tokio::test(start_paused = true)]
async fn cancellation_is_reported_distinctly() -> TestResult {
    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);
    let cancel = CancellationToken::new();
    let resources = scenario_graph();

    let run = {
        let handler_context = context.clone();
        let cancel = cancel.clone();
        tokio::spawn(async move {
            DeploymentManager::new()
                .deploy(&handler_context, &resources, cancel)
                .await
        })
    };

    // A is done at 10ms; B and D are mid-flight at 15ms.
    tokio::time::sleep(Duration::from_millis(15)).await;
    cancel.cancel();

    let err = with_timeout(run).await?.unwrap_err();
    assert!(err.is_cancelled(), "unexpected error: {err}");
    assert_eq!(handler.completion_order(), vec!["A"]);
    assert_eq!(handler.apply_count("C"), 0);
    assert_eq!(handler.apply_count("E"), 0);
    Ok(())
}

#[tokio::test]
async fn already_cancelled_run_applies_nothing() {
    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = DeploymentManager::new()
        .deploy(&context, &scenario_graph(), cancel)
        .await
        .unwrap_err();

    assert!(err.is_cancelled());
    assert!(handler.completion_order().is_empty());
}

#[tokio::test]
async fn runs_are_independent() -> TestResult {
    let handler = RecordingHandler::new();
    let context = RecordingHandler::context(&handler, true);
    let manager = DeploymentManager::new();
    let resources = scenario_graph();

    manager
        .deploy(&context, &resources, CancellationToken::new())
        .await?;
    manager
        .deploy(&context, &resources, CancellationToken::new())
        .await?;

    assert_eq!(handler.apply_count("A"), 2);
    Ok(())
}
