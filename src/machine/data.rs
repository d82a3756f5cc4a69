//! # Per-machine runtime state data.
//!
//! [`StateData`] is the mutable record each machine instance carries
//! through its transitions: the user-facing `result`, the `fail_reason`
//! explaining non-success, the LIFO `op_stack` of scope frames pushed by
//! the sequential/parallel combinators, and the single-shot completion
//! slot installed by the runtime on the root machine.
//!
//! Frames reference materialized child machines, so `StateData` is cheap to
//! clone (everything heavy sits behind `Arc`s) and a specification's seed
//! data stays a pure value.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;

use crate::error::FailReason;
use crate::fsm::step::{ResultFn, StepRecord};
use crate::fsm::Pattern;
use crate::machine::instance::Machine;
use crate::machine::state::StateName;
use crate::runtime::slot::CompletionSlot;
use crate::value::{Env, Value};

/// Mutable state carried by one machine instance.
#[derive(Clone, Default)]
pub struct StateData {
    /// User-facing result once `completed`.
    pub result: Value,
    /// Opaque reason explaining non-success.
    pub fail_reason: Option<FailReason>,
    /// LIFO stack of per-scope operation frames.
    pub op_stack: Vec<Frame>,
    /// Single-shot completion slot; installed by the runtime on the root.
    pub promise: Option<Arc<CompletionSlot>>,
}

impl StateData {
    /// The top frame as a sequence frame, if that is what it is.
    pub fn seq_frame_mut(&mut self) -> Option<&mut SeqFrame> {
        match self.op_stack.last_mut() {
            Some(Frame::Seq(frame)) => Some(frame),
            _ => None,
        }
    }

    /// The top frame as a parallel frame, if that is what it is.
    pub fn par_frame_mut(&mut self) -> Option<&mut ParFrame> {
        match self.op_stack.last_mut() {
            Some(Frame::Par(frame)) => Some(frame),
            _ => None,
        }
    }

    /// Sanitized snapshot for history and reports: state-visible values
    /// only, never the promise, frames or timer handles.
    pub fn snapshot(&self) -> DataSnapshot {
        let env = match self.op_stack.last() {
            Some(Frame::Seq(frame)) => Some(frame.env.clone()),
            _ => None,
        };
        DataSnapshot {
            result: self.result.clone(),
            fail_reason: self.fail_reason.clone(),
            env,
        }
    }
}

/// A per-scope record pushed on the op-stack by a combinator.
#[derive(Clone)]
pub enum Frame {
    Seq(SeqFrame),
    Par(ParFrame),
}

/// Scope frame of a `sequence` controller.
#[derive(Clone)]
pub struct SeqFrame {
    /// Bindings visible so far, in source order, with shadowing.
    pub env: Env,
    /// Immutable ordered step records.
    pub steps: Arc<[StepRecord]>,
    /// Number of steps started so far; `steps[cursor]` is the next to run.
    pub cursor: usize,
    /// Materialized child machines to date (top is the live one).
    pub machines: Vec<Arc<Machine>>,
    /// Capture pattern of the step currently in flight.
    pub capture: Option<Pattern>,
    /// Computes the final result from the final env.
    pub overall: ResultFn,
}

/// Scope frame of a `parallel` combinator.
#[derive(Clone)]
pub struct ParFrame {
    /// All materialized children, in input order.
    pub machines: Vec<Arc<Machine>>,
    /// Indexes of children that have not yet reached a terminal state.
    pub pending: HashSet<usize>,
    /// Input-order slots for completed children.
    pub completed: Vec<Option<ChildSnapshot>>,
    /// Failed or aborted children, in completion order.
    pub failed: Vec<ChildSnapshot>,
}

/// Terminal snapshot a child reports to its parent.
#[derive(Debug, Clone)]
pub struct ChildSnapshot {
    /// Position of the child in its parent's input.
    pub index: usize,
    /// Terminal state the child reached.
    pub state: StateName,
    /// Child's final result.
    pub result: Value,
    /// Child's failure reason, if any.
    pub fail_reason: Option<FailReason>,
}

/// One recorded prior state of a machine.
#[derive(Clone)]
pub struct HistoryEntry {
    /// The state that was exited.
    pub state: StateName,
    /// When the state was exited.
    pub at: SystemTime,
    /// Sanitized data at exit time.
    pub data: DataSnapshot,
}

/// Sanitized view of [`StateData`]: safe to log and render.
#[derive(Clone)]
pub struct DataSnapshot {
    pub result: Value,
    pub fail_reason: Option<FailReason>,
    /// Env of the innermost sequence scope, if one was active.
    pub env: Option<Env>,
}
