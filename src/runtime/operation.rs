//! # The operation handle.
//!
//! An [`Operation`] bundles a running root machine with its completion
//! slot. It is the caller's window into the machine: observe status,
//! request a cooperative abort, await the outcome.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, FailReason, OpError};
use crate::machine::{Frame, HistoryEntry, Machine, Signal, StateName};
use crate::runtime::slot::{CompletionSlot, Outcome};
use crate::value::{Env, Value};

/// Handle to a running (or finished) operation.
pub struct Operation {
    machine: Arc<Machine>,
    slot: Arc<CompletionSlot>,
}

/// Consistent snapshot of an operation's current state.
#[derive(Clone)]
pub struct OpStatus {
    /// Current state name.
    pub state: StateName,
    /// Result so far (final once terminal).
    pub result: Value,
    /// Failure reason, if one has been recorded.
    pub fail_reason: Option<FailReason>,
    /// Env of the innermost active sequence scope, if any.
    pub env: Option<Env>,
    /// Step labels of the innermost active sequence scope.
    pub steps: Vec<String>,
    /// How many of those steps have been started.
    pub started_steps: usize,
}

impl Operation {
    pub(crate) fn new(machine: Arc<Machine>, slot: Arc<CompletionSlot>) -> Self {
        Self { machine, slot }
    }

    /// The operation's name, if its root spec declared one.
    pub fn name(&self) -> Option<&str> {
        self.machine.name()
    }

    /// Requests a cooperative abort.
    ///
    /// The abort signal is forwarded down the active child chain; the
    /// effect is cooperative and terminal states ignore it.
    pub fn abort(&self) {
        self.machine.send(Signal::abort());
    }

    /// Requests a cooperative abort carrying a caller reason.
    pub fn abort_with(&self, reason: impl Into<Value>) {
        self.machine.send(Signal::abort_with(reason));
    }

    /// Snapshot of the current state and state data.
    ///
    /// Consistent under the machine's transition lock.
    pub fn status(&self) -> Result<OpStatus, EngineError> {
        let (state, data) = self.machine.peek()?;
        let (env, steps, started_steps) = match data.op_stack.last() {
            Some(Frame::Seq(frame)) => (
                Some(frame.env.clone()),
                frame.steps.iter().map(|s| s.label.to_string()).collect(),
                frame.cursor,
            ),
            _ => (None, Vec::new(), 0),
        };
        Ok(OpStatus {
            state,
            result: data.result,
            fail_reason: data.fail_reason,
            env,
            steps,
            started_steps,
        })
    }

    /// `Some(true)` once `completed`, `Some(false)` once any other terminal
    /// was reached, `None` while the outcome is not yet known.
    pub fn completed(&self) -> Option<bool> {
        self.slot.get().map(Outcome::is_success)
    }

    /// Mirror of [`Operation::completed`].
    pub fn failed(&self) -> Option<bool> {
        self.slot.get().map(|o| !o.is_success())
    }

    /// True while no outcome has been delivered.
    pub fn is_running(&self) -> bool {
        !self.slot.is_set()
    }

    /// Waits for the outcome.
    pub async fn wait(&self) -> Outcome {
        self.slot.wait().await.clone()
    }

    /// Waits for the outcome, giving up after `dur`.
    pub async fn wait_timeout(&self, dur: Duration) -> Option<Outcome> {
        tokio::time::timeout(dur, self.wait()).await.ok()
    }

    /// Waits for the outcome and unwraps it.
    ///
    /// Success yields the result value. Non-success maps onto [`OpError`];
    /// a captured [`FailReason::Exception`] re-raises the original error.
    pub async fn join(&self) -> Result<Value, OpError> {
        Self::unwrap_outcome(self.wait().await)
    }

    /// [`Operation::join`] with a deadline; `None` on timeout.
    pub async fn join_timeout(&self, dur: Duration) -> Option<Result<Value, OpError>> {
        self.wait_timeout(dur).await.map(Self::unwrap_outcome)
    }

    /// Recorded prior states of the root machine, oldest first.
    pub fn history(&self) -> Result<Vec<HistoryEntry>, EngineError> {
        self.machine.history()
    }

    fn unwrap_outcome(outcome: Outcome) -> Result<Value, OpError> {
        if outcome.is_success() {
            return Ok(outcome.result);
        }
        match outcome.fail_reason {
            Some(FailReason::TimedOut) => Err(OpError::TimedOut),
            Some(FailReason::Abort(reason)) => Err(OpError::Aborted { reason }),
            Some(FailReason::Exception(err)) => Err((*err).clone()),
            Some(reason) => Err(OpError::Failed { reason }),
            None => Err(OpError::Failed {
                reason: FailReason::User(Value::Null),
            }),
        }
    }
}
