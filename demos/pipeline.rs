//! # Demo: pipeline
//!
//! A sequential pipeline where each step's result feeds the next.
//!
//! Shows how to:
//! - Build a [`Sequence`] with named bindings
//! - Mix immediate results, delays and fan-out inside one pipeline
//! - Observe progress with [`report_operation`] and the event bus
//!
//! ## Run
//! ```bash
//! cargo run --example pipeline
//! ```

use std::time::Duration;

use opflow::{
    delay, parallel, report_operation, result, Config, Engine, Pattern, ReportOptions, Sequence,
};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== pipeline example ===\n");

    // 1. Create an engine and tap its event bus.
    let engine = Engine::new(Config::default(), Vec::new());
    let mut events = engine.subscribe();
    tokio::spawn(async move {
        while let Ok(ev) = events.recv().await {
            if let opflow::events::EventKind::StepStarted = ev.kind {
                println!("[bus] starting {:?}", ev.step);
            }
        }
    });

    // 2. Describe the pipeline: fetch three shards, pause, then total them.
    let spec = Sequence::named("pipeline")
        .step_named("fetch-shards", "shards", |_| {
            Ok(parallel([result(10), result(20), result(12)]))
        })
        .step_named("settle", Pattern::ignore(), |_| {
            Ok(delay(Duration::from_millis(200)))
        })
        .step_named("total", "total", |env| {
            let total: i64 = env
                .list("shards")?
                .iter()
                .filter_map(|v| v.as_int())
                .sum();
            Ok(result(total))
        })
        .returning_binding("total")
        .build();

    // 3. Run it and watch the state while it settles.
    let op = engine.operate(spec)?;
    println!("{}", report_operation(&op, &ReportOptions::default()));

    // 4. Await the final value.
    let total = op.join().await?;
    println!("pipeline total: {total}");

    let finished = report_operation(
        &op,
        &ReportOptions {
            steps: true,
            env: true,
            history: true,
        },
    );
    println!("\n{finished}");
    println!("=== example completed successfully ===");
    Ok(())
}
