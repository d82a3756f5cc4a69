//! # Single-shot completion slot.
//!
//! [`CompletionSlot`] is a set-once cell with a wait queue: the entry hook
//! of whichever terminal state is reached first delivers the [`Outcome`],
//! and any further delivery is silently discarded. That keeps the
//! exactly-once invariant under racing terminal transitions (e.g. a timer
//! firing just as `completed` is delivered).

use std::sync::OnceLock;

use tokio::sync::Notify;

use crate::error::FailReason;
use crate::machine::StateName;
use crate::value::Value;

/// Final outcome of an operation.
#[derive(Clone, Debug, PartialEq)]
pub struct Outcome {
    /// Terminal state that was reached.
    pub state: StateName,
    /// User-facing result (meaningful when `state` is `completed`;
    /// populated best-effort on the failure side of `parallel`).
    pub result: Value,
    /// Reason for non-success, if any.
    pub fail_reason: Option<FailReason>,
}

impl Outcome {
    /// True if the operation reached `completed`.
    pub fn is_success(&self) -> bool {
        self.state == StateName::Completed
    }
}

/// Set-once cell delivering the final outcome to waiters.
#[derive(Default)]
pub struct CompletionSlot {
    cell: OnceLock<Outcome>,
    notify: Notify,
}

impl CompletionSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers the outcome. Returns `false` if the slot was already set;
    /// the late value is discarded.
    pub fn deliver(&self, outcome: Outcome) -> bool {
        let fresh = self.cell.set(outcome).is_ok();
        if fresh {
            self.notify.notify_waiters();
        }
        fresh
    }

    /// The delivered outcome, if any.
    pub fn get(&self) -> Option<&Outcome> {
        self.cell.get()
    }

    /// True once an outcome has been delivered.
    pub fn is_set(&self) -> bool {
        self.cell.get().is_some()
    }

    /// Waits until the outcome is delivered.
    pub async fn wait(&self) -> &Outcome {
        loop {
            if let Some(outcome) = self.cell.get() {
                return outcome;
            }
            // Register interest before re-checking to close the gap with a
            // concurrent deliver().
            let notified = self.notify.notified();
            if let Some(outcome) = self.cell.get() {
                return outcome;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn done(result: i64) -> Outcome {
        Outcome {
            state: StateName::Completed,
            result: Value::Int(result),
            fail_reason: None,
        }
    }

    #[tokio::test]
    async fn first_delivery_wins() {
        let slot = CompletionSlot::new();
        assert!(slot.deliver(done(1)));
        assert!(!slot.deliver(done(2)));
        assert_eq!(slot.wait().await.result, Value::Int(1));
    }

    #[tokio::test]
    async fn wait_observes_late_delivery() {
        let slot = std::sync::Arc::new(CompletionSlot::new());
        let waiter = {
            let slot = slot.clone();
            tokio::spawn(async move { slot.wait().await.result.clone() })
        };
        tokio::task::yield_now().await;
        slot.deliver(done(7));
        assert_eq!(waiter.await.unwrap(), Value::Int(7));
    }
}
