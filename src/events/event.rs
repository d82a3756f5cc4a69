//! # Runtime events emitted by machines, timers and the engine.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Operation lifecycle**: an operation started or reached a terminal state
//! - **Machine activity**: state entries, step starts, dropped signals
//! - **Timer activity**: armed, canceled, stale fires
//! - **Fault/observability**: engine faults, subscriber overflow and panics
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! operation name, state and signal names, error messages and timer ids.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. This guarantees that events can be ordered correctly even
//! when delivered out-of-order through async channels.
//!
//! ## Event flow examples
//!
//! ### A two-step sequence completing
//! ```text
//! Engine::operate()
//!   → OpStarted
//!   → StateEntered (running) → StepStarted → StateEntered (step-completed)
//!   → StepStarted → ...
//!   → StateEntered (completed)
//!   → OpCompleted
//! ```
//!
//! ### A per-state timeout firing
//! ```text
//! StateEntered (running) → TimerArmed
//!   → [timer expires]
//!   → StateEntered (failed) → TimerCanceled
//!   → OpFailed
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::machine::{SignalName, StateName};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Operation lifecycle ===
    /// An operation was materialized and its `start` signal fired.
    OpStarted,
    /// An operation reached `completed`.
    OpCompleted,
    /// An operation reached `failed` or `timed-out`.
    OpFailed,
    /// An operation reached `aborted`.
    OpAborted,

    // === Machine activity ===
    /// A machine entered a state.
    StateEntered,
    /// A sequence controller started a step.
    StepStarted,
    /// A signal arrived with no handler and was dropped (terminal state,
    /// stale timer, or a tolerated late delivery).
    SignalDropped,

    // === Timer activity ===
    /// A per-state one-shot timer was armed.
    TimerArmed,
    /// A per-state timer was canceled on state exit (best effort).
    TimerCanceled,
    /// A timer fired after its state was exited; the fire was a no-op.
    StaleTimer,

    // === Faults and observability ===
    /// The engine faulted while driving a machine (logged, never panics the pool).
    EngineFault,
    /// A subscriber dropped an event (queue full or worker closed).
    SubscriberOverflow,
    /// A subscriber panicked during event processing.
    SubscriberPanicked,
}

/// Runtime event with optional metadata.
///
/// ## Fields
///
/// - `seq`: unique sequence number for ordering (monotonically increasing)
/// - `at`: wall-clock timestamp (may go backwards due to NTP, use for logging only)
/// - `kind`: event classification
/// - `op`, `state`, `signal`, `step`, `error`, `timer`, `timeout`: optional metadata
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp (use for logging only).
    pub at: SystemTime,
    /// The kind of event.
    pub kind: EventKind,
    /// Name of the operation's root machine, if it has one.
    pub op: Option<String>,
    /// State involved, if relevant.
    pub state: Option<StateName>,
    /// Signal involved, if relevant.
    pub signal: Option<SignalName>,
    /// Step label, for `StepStarted`.
    pub step: Option<String>,
    /// Error message, if the event represents a failure.
    pub error: Option<String>,
    /// Timer id, for timer events.
    pub timer: Option<u64>,
    /// Timer duration, for `TimerArmed`.
    pub timeout: Option<Duration>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            op: None,
            state: None,
            signal: None,
            step: None,
            error: None,
            timer: None,
            timeout: None,
        }
    }

    /// Attaches the operation name.
    pub fn with_op(mut self, name: impl Into<String>) -> Self {
        self.op = Some(name.into());
        self
    }

    /// Attaches a state name.
    pub fn with_state(mut self, state: StateName) -> Self {
        self.state = Some(state);
        self
    }

    /// Attaches a signal name.
    pub fn with_signal(mut self, signal: SignalName) -> Self {
        self.signal = Some(signal);
        self
    }

    /// Attaches a step label.
    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.step = Some(step.into());
        self
    }

    /// Attaches an error message.
    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.error = Some(msg.into());
        self
    }

    /// Attaches a timer id.
    pub fn with_timer(mut self, id: u64) -> Self {
        self.timer = Some(id);
        self
    }

    /// Attaches a timer duration.
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout = Some(d);
        self
    }

    /// Creates a subscriber overflow event.
    ///
    /// Emitted when a subscriber's queue is full and an event is dropped.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::now(EventKind::SubscriberOverflow)
            .with_error(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    ///
    /// Emitted when a subscriber panics during event processing.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::now(EventKind::SubscriberPanicked)
            .with_op(subscriber)
            .with_error(info)
    }
}
