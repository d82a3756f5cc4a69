//! # opflow
//!
//! **Opflow** is a composable finite-state-machine orchestration engine.
//!
//! A unit of asynchronous work is modeled as an FSM with a fixed terminal
//! vocabulary (`completed`, `failed`, `aborted`, `timed-out`); combinators
//! build larger machines out of smaller ones while preserving that
//! vocabulary. A program constructs a pure *specification*, hands it to the
//! [`Engine`], and receives a running [`Operation`]: observable, awaitable,
//! and externally abortable.
//!
//! ## Features
//!
//! | Area              | Description                                                      | Key types / functions                         |
//! |-------------------|------------------------------------------------------------------|-----------------------------------------------|
//! | **Primitives**    | Atomic machines: immediate results, failures, delays.            | [`result`], [`succeed`], [`fail`], [`delay`]  |
//! | **Combinators**   | Compose machines: budgets, fan-out, folds.                       | [`timeout`], [`parallel`], [`reduce`]         |
//! | **Comprehension** | Sequential steps with named bindings.                            | [`Sequence`], [`Pattern`]                     |
//! | **Runtime**       | Materialize specs, await/abort operations.                       | [`Engine`], [`Operation`], [`Outcome`]        |
//! | **Framework**     | Declarative state graphs, merge algebra, custom specs.           | [`MachineSpec`], [`StateDecl`], [`merge`]     |
//! | **Observability** | Structured lifecycle events with subscriber fan-out.             | [`events::Bus`], [`Subscribe`]                |
//! | **Errors**        | Typed faults and caller-facing failures.                         | [`EngineError`], [`OpError`], [`FailReason`]  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] subscriber _(demo/reference only)_.
//!
//! ```no_run
//! use opflow::{Config, Engine, Sequence, Value, parallel, result};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = Engine::new(Config::default(), Vec::new());
//!
//!     // Each step's result becomes a binding visible to later steps.
//!     let spec = Sequence::named("gather")
//!         .step("xs", |_| Ok(parallel([result(1), result(2), result(3)])))
//!         .step("total", |env| {
//!             let total: i64 = env.list("xs")?.iter().filter_map(|v| v.as_int()).sum();
//!             Ok(result(total))
//!         })
//!         .returning_binding("total")
//!         .build();
//!
//!     let op = engine.operate(spec)?;
//!     assert_eq!(op.join().await?, Value::Int(6));
//!     Ok(())
//! }
//! ```
//!
//! ---

mod config;
mod error;
pub mod events;
mod fsm;
pub mod machine;
mod runtime;
pub mod subscribers;
mod value;

// ---- Public re-exports ----

pub use config::Config;
pub use error::{EngineError, FailReason, OpError};
pub use fsm::{
    delay, fail, parallel, reduce, result, succeed, succeed_if, timeout, Pattern, Sequence,
    StepRecord,
};
pub use machine::{merge, MachineSpec, Signal, SignalName, StateDecl, StateName};
pub use runtime::{report_operation, Engine, OpStatus, Operation, Outcome, ReportOptions};
pub use subscribers::Subscribe;
pub use value::{Env, Value};

// Optional: expose a simple built-in logging subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
