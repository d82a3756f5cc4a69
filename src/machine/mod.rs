//! # The primitive machine framework.
//!
//! Declarative specifications, the merge algebra and live instances:
//!
//! - [`MachineSpec`] / [`StateDecl`] pure, cloneable state-graph
//!   declarations with entry/exit hook chains and per-signal handlers
//! - [`merge`] the composition rule set (transition union, guarded hook
//!   chains, last-writer-wins handlers)
//! - [`Machine`] a materialized instance with a per-instance transition
//!   lock, run-to-completion signal queue, per-state timers and history
//! - [`Signal`] / [`Payload`] the events dispatched into an instance
//! - [`StateName`] / [`SignalName`] / [`Feature`] the closed vocabularies
//!
//! The combinators in [`crate::fsm`] build on this framework; user code
//! only reaches for it directly to write custom specifications.

pub mod data;
mod instance;
mod merge;
mod signal;
mod spec;
mod state;

pub use data::{ChildSnapshot, DataSnapshot, Frame, HistoryEntry, ParFrame, SeqFrame, StateData};
pub use instance::{Ctx, EventDraft, Machine};
pub use merge::merge;
pub use signal::{Payload, Signal};
pub use spec::{Handler, Hook, MachineSpec, StateDecl};
pub use state::{Feature, SignalName, StateName};
