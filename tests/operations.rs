//! End-to-end scenarios: specifications through `operate` to outcomes.

use std::time::Duration;

use opflow::{
    delay, fail, parallel, reduce, result, succeed, timeout, Config, Engine, FailReason, OpError,
    Pattern, Sequence, StateName, Value,
};

fn engine() -> Engine {
    Engine::new(Config::default(), Vec::new())
}

#[tokio::test]
async fn sequence_of_succeed_completes_with_null() {
    let spec = Sequence::named("noop")
        .step(Pattern::ignore(), |_| Ok(succeed()))
        .build();
    let op = engine().operate(spec).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Completed);
    assert_eq!(outcome.result, Value::Null);
    assert_eq!(op.completed(), Some(true));
}

#[tokio::test]
async fn sequence_of_fail_fails_with_the_verbatim_reason() {
    let spec = Sequence::named("failing")
        .step(Pattern::ignore(), |_| Ok(fail("bad")))
        .build();
    let op = engine().operate(spec).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Failed);
    assert_eq!(
        outcome.fail_reason,
        Some(FailReason::User(Value::from("bad")))
    );
    match op.join().await {
        Err(OpError::Failed { reason }) => {
            assert_eq!(reason, FailReason::User(Value::from("bad")));
        }
        other => panic!("expected failed, got {other:?}"),
    }
}

#[tokio::test]
async fn bindings_flow_and_shadow_between_steps() {
    let spec = Sequence::named("accumulate")
        .step("x", |_| Ok(result(1)))
        .step("x", |env| Ok(result(env.int("x")? + 2)))
        .returning_binding("x")
        .build();
    let op = engine().operate(spec).unwrap();
    assert_eq!(op.join().await.unwrap(), Value::Int(3));
}

#[tokio::test(start_paused = true)]
async fn sequence_delay_completes_after_the_delay() {
    let started = tokio::time::Instant::now();
    let spec = Sequence::named("pause")
        .step(Pattern::ignore(), |_| Ok(delay(Duration::from_millis(1000))))
        .build();
    let op = engine().operate(spec).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Completed);
    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(1000), "elapsed {elapsed:?}");
    assert!(elapsed <= Duration::from_millis(1500), "elapsed {elapsed:?}");
}

#[tokio::test(start_paused = true)]
async fn tight_timeout_beats_the_delay() {
    let started = tokio::time::Instant::now();
    let spec = Sequence::named("budgeted")
        .step(Pattern::ignore(), |_| {
            Ok(timeout(
                delay(Duration::from_millis(1000)),
                Duration::from_millis(500),
            ))
        })
        .build();
    let op = engine().operate(spec).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Failed);
    assert_eq!(outcome.fail_reason, Some(FailReason::TimedOut));
    assert!(started.elapsed() <= Duration::from_millis(900));
    assert!(matches!(op.join().await, Err(OpError::TimedOut)));
}

#[tokio::test]
async fn parallel_results_arrive_in_input_order() {
    let spec = parallel([result(1), result(1), result(1)]);
    let op = engine().operate(spec).unwrap();
    assert_eq!(
        op.join().await.unwrap(),
        Value::List(vec![Value::Int(1), Value::Int(1), Value::Int(1)])
    );
}

#[tokio::test]
async fn parallel_aggregates_child_failures() {
    let spec = parallel([result(1), fail("because")]);
    let op = engine().operate(spec).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Failed);
    assert_eq!(
        outcome.fail_reason,
        Some(FailReason::FailedOps(vec![FailReason::User(Value::from(
            "because"
        ))]))
    );
}

#[tokio::test]
async fn reduce_threads_the_accumulator() {
    let spec = reduce(
        |acc, item| Ok(result(acc.as_int().unwrap_or(0) + item.as_int().unwrap_or(0))),
        0,
        [1, 2, 3].map(Value::from),
    );
    let op = engine().operate(spec).unwrap();
    assert_eq!(op.join().await.unwrap(), Value::Int(6));
}

#[tokio::test]
async fn nested_sequence_failure_propagates_two_levels() {
    let inner = Sequence::named("inner")
        .step("y", |_| Ok(fail("r")))
        .returning_binding("y")
        .build();
    let spec = Sequence::named("outer")
        .step("x", move |_| Ok(inner.clone()))
        .returning_binding("x")
        .build();
    let op = engine().operate(spec).unwrap();
    let outcome = op.wait().await;
    assert_eq!(outcome.state, StateName::Failed);
    assert_eq!(outcome.fail_reason, Some(FailReason::User(Value::from("r"))));
}
