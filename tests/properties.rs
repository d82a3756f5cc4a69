//! Property-based tests.
//!
//! The pure parts (merge algebra, capture patterns) are checked directly;
//! the runtime properties spin a paused current-thread runtime per case so
//! timers resolve instantly and deterministically.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use opflow::{
    delay, fail, merge, parallel, reduce, result, succeed_if, timeout, Config, Engine, FailReason,
    MachineSpec, Outcome, Pattern, Sequence, StateDecl, StateName, Value,
};

fn run_spec(spec: MachineSpec) -> Outcome {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .start_paused(true)
        .build()
        .expect("runtime");
    rt.block_on(async {
        let engine = Engine::new(Config::default(), Vec::new());
        let op = engine.operate(spec).expect("operate");
        op.wait().await
    })
}

/// Shape of a randomly composed specification.
#[derive(Debug, Clone)]
enum Tree {
    Result(i64),
    Fail(i64),
    Succeed(bool),
    Delay(u8),
    Timeout(Box<Tree>, u8),
    Par(Vec<Tree>),
    Seq(Vec<Tree>),
}

fn to_spec(tree: &Tree) -> MachineSpec {
    match tree {
        Tree::Result(v) => result(*v),
        Tree::Fail(v) => fail(*v),
        Tree::Succeed(flag) => succeed_if(*flag, "flagged"),
        Tree::Delay(ms) => delay(Duration::from_millis(u64::from(*ms) % 5)),
        Tree::Timeout(inner, ms) => timeout(
            to_spec(inner),
            Duration::from_millis(1 + u64::from(*ms) % 5),
        ),
        Tree::Par(children) => parallel(children.iter().map(to_spec)),
        Tree::Seq(children) => {
            let mut seq = Sequence::named("prop-seq");
            for (i, child) in children.iter().enumerate() {
                let spec = to_spec(child);
                seq = seq.step_named(format!("s{i}"), Pattern::ignore(), move |_| Ok(spec.clone()));
            }
            seq.build()
        }
    }
}

fn tree_strategy() -> impl Strategy<Value = Tree> {
    let leaf = prop_oneof![
        any::<i64>().prop_map(Tree::Result),
        any::<i64>().prop_map(Tree::Fail),
        any::<bool>().prop_map(Tree::Succeed),
        any::<u8>().prop_map(Tree::Delay),
    ];
    leaf.prop_recursive(3, 12, 3, |inner| {
        prop_oneof![
            (inner.clone(), any::<u8>()).prop_map(|(t, ms)| Tree::Timeout(Box::new(t), ms)),
            prop::collection::vec(inner.clone(), 0..3).prop_map(Tree::Par),
            prop::collection::vec(inner, 0..3).prop_map(Tree::Seq),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn every_operation_reaches_a_terminal_state(tree in tree_strategy()) {
        let outcome = run_spec(to_spec(&tree));
        prop_assert!(outcome.state.is_terminal(), "ended in {}", outcome.state);
    }

    #[test]
    fn parallel_of_results_preserves_input_order(values in prop::collection::vec(any::<i64>(), 0..8)) {
        let spec = parallel(values.iter().map(|v| result(*v)));
        let outcome = run_spec(spec);
        prop_assert_eq!(outcome.state, StateName::Completed);
        if values.is_empty() {
            prop_assert_eq!(outcome.result, Value::Null);
        } else {
            let expected: Vec<Value> = values.iter().map(|v| Value::from(*v)).collect();
            prop_assert_eq!(outcome.result, Value::List(expected));
        }
    }

    #[test]
    fn reduce_matches_the_eager_fold(
        values in prop::collection::vec(-1000i64..1000, 0..8),
        init in -1000i64..1000,
    ) {
        let spec = reduce(
            |acc, v| Ok(result(acc.as_int().unwrap_or(0) + v.as_int().unwrap_or(0))),
            init,
            values.iter().map(|v| Value::from(*v)),
        );
        let outcome = run_spec(spec);
        let expected: i64 = init + values.iter().sum::<i64>();
        prop_assert_eq!(outcome.result, Value::Int(expected));
    }

    #[test]
    fn later_steps_see_earlier_bindings(
        a in -1_000_000i64..1_000_000,
        b in -1_000_000i64..1_000_000,
    ) {
        let spec = Sequence::named("visibility")
            .step("x", move |_| Ok(result(a)))
            .step("y", move |env| Ok(result(env.int("x")? + b)))
            .returning(|env| {
                Ok(Value::List(vec![
                    env.expect("x")?.clone(),
                    env.expect("y")?.clone(),
                ]))
            })
            .build();
        let outcome = run_spec(spec);
        prop_assert_eq!(
            outcome.result,
            Value::List(vec![Value::Int(a), Value::Int(a + b)])
        );
    }

    #[test]
    fn a_failing_step_stops_the_sequence_early(failing_at in 0usize..4) {
        let total = 4usize;
        let ran = Arc::new(AtomicUsize::new(0));
        let mut seq = Sequence::named("short");
        for i in 0..total {
            let ran = ran.clone();
            seq = seq.step_named(format!("s{i}"), Pattern::ignore(), move |_| {
                ran.fetch_add(1, Ordering::SeqCst);
                if i == failing_at {
                    Ok(fail("boom"))
                } else {
                    Ok(result(0))
                }
            });
        }
        let outcome = run_spec(seq.build());
        prop_assert_eq!(outcome.state, StateName::Failed);
        prop_assert_eq!(
            outcome.fail_reason,
            Some(FailReason::User(Value::from("boom")))
        );
        // Only the steps up to and including the failing one were built.
        prop_assert_eq!(ran.load(Ordering::SeqCst), failing_at + 1);
        prop_assert!(failing_at + 1 <= total);
    }

    #[test]
    fn list_patterns_bind_every_element(values in prop::collection::vec(any::<i64>(), 0..6)) {
        let pattern = Pattern::list(
            (0..values.len()).map(|i| Pattern::bind(format!("v{i}"))),
        );
        let mut env = opflow::Env::new();
        pattern
            .apply(
                &mut env,
                Value::List(values.iter().map(|v| Value::from(*v)).collect()),
            )
            .expect("shapes match by construction");
        for (i, v) in values.iter().enumerate() {
            prop_assert_eq!(env.get(&format!("v{i}")), Some(&Value::Int(*v)));
        }
    }

    #[test]
    fn merged_transitions_are_the_deduplicated_union(
        left in prop::collection::vec(0usize..4, 0..4),
        right in prop::collection::vec(0usize..4, 0..4),
    ) {
        let pool = [
            StateName::Running,
            StateName::Completed,
            StateName::Failed,
            StateName::Aborted,
        ];
        let decl_from = |targets: &[usize]| {
            let mut decl = StateDecl::new(StateName::Init);
            for t in targets {
                decl = decl.to(pool[*t]);
            }
            MachineSpec::new().state(decl)
        };
        let merged = merge([decl_from(&left), decl_from(&right)]);
        let transitions = &merged.state_decl(StateName::Init).unwrap().transitions;
        for t in left.iter().chain(right.iter()) {
            prop_assert!(transitions.contains(&pool[*t]));
        }
        let mut seen = std::collections::HashSet::new();
        for t in transitions {
            prop_assert!(seen.insert(*t), "duplicate transition {t}");
        }
    }
}
