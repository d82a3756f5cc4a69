//! Combinator semantics: ordering, short-circuiting, budgets, aborts,
//! delivery and introspection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use opflow::{
    delay, fail, parallel, reduce, report_operation, result, succeed_if, timeout, Config, Engine,
    FailReason, OpError, Pattern, ReportOptions, Sequence, StateName, Value,
};

fn engine() -> Engine {
    Engine::new(Config::default(), Vec::new())
}

/// A child that completes with `value` after `dur`.
fn slow_result(value: i64, dur: Duration) -> opflow::MachineSpec {
    Sequence::named("slow")
        .step(Pattern::ignore(), move |_| Ok(delay(dur)))
        .step("v", move |_| Ok(result(value)))
        .returning_binding("v")
        .build()
}

#[tokio::test]
async fn outcome_is_delivered_exactly_once() {
    let spec = result(42);
    let op = engine().operate(spec).unwrap();
    let first = op.wait().await;
    let second = op.wait().await;
    assert_eq!(first, second);
    assert_eq!(op.completed(), Some(true));
    assert_eq!(op.failed(), Some(false));
    assert!(!op.is_running());
}

#[tokio::test(start_paused = true)]
async fn parallel_presents_results_in_input_order_regardless_of_completion_order() {
    // Later children finish first; the result must still follow input order.
    let children: Vec<_> = (0..5i64)
        .map(|i| slow_result(i, Duration::from_millis(50 * (5 - i) as u64)))
        .collect();
    let op = engine().operate(parallel(children)).unwrap();
    let expected: Vec<Value> = (0..5i64).map(Value::from).collect();
    assert_eq!(op.join().await.unwrap(), Value::List(expected));
}

#[tokio::test]
async fn failing_step_short_circuits_the_rest() {
    let reached = Arc::new(AtomicBool::new(false));
    let witness = reached.clone();
    let spec = Sequence::named("short-circuit")
        .step("x", |_| Ok(result(1)))
        .step(Pattern::ignore(), |_| Ok(fail("stop")))
        .step(Pattern::ignore(), move |_| {
            witness.store(true, Ordering::SeqCst);
            Ok(result(0))
        })
        .returning_binding("x")
        .build();
    let op = engine().operate(spec).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Failed);
    assert_eq!(
        outcome.fail_reason,
        Some(FailReason::User(Value::from("stop")))
    );
    assert!(!reached.load(Ordering::SeqCst), "third step must not run");
}

#[tokio::test(start_paused = true)]
async fn generous_timeout_lets_the_delay_finish() {
    let spec = timeout(
        delay(Duration::from_millis(1000)),
        Duration::from_millis(2000),
    );
    let op = engine().operate(spec).unwrap();
    assert_eq!(op.wait().await.state, StateName::Completed);
}

#[tokio::test(start_paused = true)]
async fn timeout_over_a_sequence_budgets_each_state_not_the_whole() {
    // Two 300ms steps under a 500ms per-state budget: the controller never
    // sits in one state for 500ms, so the compound completes even though
    // the end-to-end time exceeds the budget.
    let seq = Sequence::named("stepped")
        .step(Pattern::ignore(), |_| Ok(delay(Duration::from_millis(300))))
        .step(Pattern::ignore(), |_| Ok(delay(Duration::from_millis(300))))
        .build();
    let started = tokio::time::Instant::now();
    let op = engine()
        .operate(timeout(seq, Duration::from_millis(500)))
        .unwrap();
    assert_eq!(op.wait().await.state, StateName::Completed);
    assert!(started.elapsed() >= Duration::from_millis(600));
}

#[tokio::test]
async fn empty_parallel_completes_with_null() {
    let op = engine().operate(parallel([])).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Completed);
    assert_eq!(outcome.result, Value::Null);
}

#[tokio::test]
async fn empty_reduce_completes_with_the_seed() {
    let op = engine()
        .operate(reduce(|acc, _| Ok(result(acc.clone())), 9, []))
        .unwrap();
    assert_eq!(op.join().await.unwrap(), Value::Int(9));
}

#[tokio::test(start_paused = true)]
async fn abort_terminates_a_waiting_delay() {
    let op = engine().operate(delay(Duration::from_secs(60))).unwrap();
    assert!(op.is_running());
    op.abort();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Aborted);
    assert!(matches!(op.join().await, Err(OpError::Aborted { .. })));
}

#[tokio::test(start_paused = true)]
async fn abort_reaches_the_live_child_of_a_sequence() {
    let spec = Sequence::named("long")
        .step(Pattern::ignore(), |_| Ok(delay(Duration::from_secs(60))))
        .build();
    let op = engine().operate(spec).unwrap();
    op.abort_with("operator request");
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Aborted);
    match outcome.fail_reason {
        Some(FailReason::Abort(Some(reason))) => {
            assert_eq!(reason, Value::from("operator request"));
        }
        other => panic!("expected abort reason, got {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn abort_fans_out_to_all_pending_parallel_children() {
    let spec = parallel([
        delay(Duration::from_secs(60)),
        delay(Duration::from_secs(60)),
        result(1),
    ]);
    let op = engine().operate(spec).unwrap();
    // Let the quick child land first.
    tokio::time::sleep(Duration::from_millis(10)).await;
    op.abort();
    let outcome = op.wait().await;
    // The parent collects the aborted children and fails the aggregate.
    assert_eq!(outcome.state, StateName::Failed);
    match outcome.fail_reason {
        Some(FailReason::FailedOps(reasons)) => {
            assert_eq!(reasons.len(), 2);
            assert!(reasons
                .iter()
                .all(|r| matches!(r, FailReason::Abort(_))));
        }
        other => panic!("expected failed-ops, got {other:?}"),
    }
}

#[tokio::test]
async fn nested_parallel_failure_reasons_nest_two_deep() {
    let inner = || parallel([result(1), fail("nok")]);
    let op = engine()
        .operate(parallel([inner(), inner(), inner()]))
        .unwrap();
    let outcome = op.wait().await;
    let inner_reason = FailReason::FailedOps(vec![FailReason::User(Value::from("nok"))]);
    assert_eq!(
        outcome.fail_reason,
        Some(FailReason::FailedOps(vec![
            inner_reason.clone(),
            inner_reason.clone(),
            inner_reason
        ]))
    );
}

#[tokio::test]
async fn succeed_if_false_fails_with_the_reason() {
    let op = engine().operate(succeed_if(false, "not ready")).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Failed);
    assert_eq!(
        outcome.fail_reason,
        Some(FailReason::User(Value::from("not ready")))
    );
}

#[tokio::test]
async fn step_closure_errors_reraise_on_join() {
    let spec = Sequence::named("raising")
        .step("x", |_| Ok(result(1)))
        .step("y", |env| {
            // Wrong type on purpose: "x" is an int.
            let s = env.str_("x")?;
            Ok(result(s))
        })
        .returning_binding("y")
        .build();
    let op = engine().operate(spec).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Failed);
    assert!(matches!(
        outcome.fail_reason,
        Some(FailReason::Exception(_))
    ));
    assert!(matches!(op.join().await, Err(OpError::WrongType { .. })));
}

#[tokio::test]
async fn list_patterns_destructure_parallel_results() {
    let spec = Sequence::named("destructure")
        .step(Pattern::list([Pattern::bind("a"), Pattern::bind("b")]), |_| {
            Ok(parallel([result(1), result(2)]))
        })
        .step("sum", |env| Ok(result(env.int("a")? + env.int("b")?)))
        .returning_binding("sum")
        .build();
    let op = engine().operate(spec).unwrap();
    assert_eq!(op.join().await.unwrap(), Value::Int(3));
}

#[tokio::test(start_paused = true)]
async fn report_renders_progress_and_history() {
    let spec = Sequence::named("observable")
        .step("x", |_| Ok(delay(Duration::from_millis(100))))
        .step("y", |env| {
            let _ = env;
            Ok(result(2))
        })
        .returning_binding("y")
        .build();
    let op = engine().operate(spec).unwrap();

    let running = report_operation(&op, &ReportOptions::default());
    assert!(running.contains("operation 'observable'"), "{running}");
    assert!(running.contains("state=running"), "{running}");
    assert!(running.contains("step-1 (active)"), "{running}");
    assert!(running.contains("step-2 (pending)"), "{running}");

    op.wait().await;
    let finished = report_operation(
        &op,
        &ReportOptions {
            steps: true,
            env: true,
            history: true,
        },
    );
    assert!(finished.contains("state=completed"), "{finished}");
    assert!(finished.contains("history:"), "{finished}");

    let history = op.history().unwrap();
    assert_eq!(history.first().map(|h| h.state), Some(StateName::Init));
}

#[tokio::test]
async fn engine_publishes_the_operation_lifecycle() {
    use opflow::events::EventKind;

    let engine = engine();
    let mut rx = engine.subscribe();
    let op = engine.operate(result(5)).unwrap();
    op.wait().await;

    let mut started = 0;
    let mut completed = 0;
    while let Ok(ev) = rx.try_recv() {
        match ev.kind {
            EventKind::OpStarted => started += 1,
            EventKind::OpCompleted => completed += 1,
            _ => {}
        }
    }
    assert_eq!(started, 1);
    assert_eq!(completed, 1);
}
