//! # One-shot cancellable timers.
//!
//! Thin glue between machines and the tokio timer wheel. A scheduled timer
//! sleeps on a spawned task and, unless cancelled first, delivers its
//! signal through [`Machine::send`] (the worker pool path). Cancellation is
//! a [`CancellationToken`]; cancelling after the fire is harmless, which is
//! all the best-effort contract requires.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::machine::{Machine, Signal};

/// Global sequence for freshly-minted timer ids.
static TIMER_SEQ: AtomicU64 = AtomicU64::new(1);

/// Mints a fresh timer id.
pub(crate) fn next_timer_id() -> u64 {
    TIMER_SEQ.fetch_add(1, AtomicOrdering::Relaxed)
}

/// Cancellable handle to a scheduled one-shot timer.
pub(crate) struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    /// Requests cancellation. A timer that already fired ignores this.
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Schedules a one-shot timer that delivers `signal` to `machine` after
/// `dur`, unless cancelled first.
pub(crate) fn schedule(machine: Arc<Machine>, dur: Duration, signal: Signal) -> TimerHandle {
    let token = CancellationToken::new();
    let guard = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = guard.cancelled() => {}
            _ = tokio::time::sleep(dur) => {
                machine.send(signal);
            }
        }
    });
    TimerHandle { token }
}
