//! # Demo: fan_out
//!
//! Parallel fan-out with per-state budgets and a cooperative abort.
//!
//! Shows how to:
//! - Run heterogeneous children under [`parallel`]
//! - Give a slow child its own [`timeout`] budget
//! - Abort a running operation and observe the aggregate failure shape
//!
//! ## Run
//! ```bash
//! cargo run --example fan_out
//! ```

use std::time::Duration;

use opflow::{delay, parallel, result, timeout, Config, Engine, FailReason, StateName};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    println!("=== fan_out example ===\n");

    let engine = Engine::new(Config::default(), Vec::new());

    // 1. A bounded fan-out: the slow fetch gets a 300ms budget and times
    //    out; its siblings complete.
    let spec = parallel([
        result(1),
        timeout(delay(Duration::from_secs(5)), Duration::from_millis(300)),
        result(3),
    ]);
    let op = engine.operate(spec)?;
    let outcome = op.wait().await;
    println!("bounded fan-out ended in '{}'", outcome.state);
    if let Some(FailReason::FailedOps(reasons)) = &outcome.fail_reason {
        println!("child failures: {reasons:?}");
    }

    // 2. An unbounded fan-out, aborted by the caller.
    let spec = parallel([
        delay(Duration::from_secs(60)),
        delay(Duration::from_secs(60)),
    ]);
    let op = engine.operate(spec)?;
    println!("\nrunning unbounded fan-out, aborting in 250ms...");
    tokio::time::sleep(Duration::from_millis(250)).await;
    op.abort_with("operator stop");
    let outcome = op.wait().await;
    println!("aborted fan-out ended in '{}'", outcome.state);
    assert_ne!(outcome.state, StateName::Completed);

    println!("\n=== example completed successfully ===");
    Ok(())
}
