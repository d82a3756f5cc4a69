//! # Error types used by the engine and by operations.
//!
//! This module defines two main error enums plus the failure-reason value:
//!
//! - [`EngineError`] faults raised by the orchestration machinery itself.
//! - [`OpError`] failures surfaced to the caller of an operation.
//! - [`FailReason`] the stable, externally observable reason attached to a
//!   non-success terminal state.
//!
//! Both error types provide `as_label` for logs/metrics.

use std::sync::Arc;

use thiserror::Error;

use crate::machine::{SignalName, StateName};
use crate::value::Value;

/// # Reason attached to a non-success terminal state.
///
/// The shapes are stable and externally observable:
/// - a timeout renders as `timed-out`;
/// - an aggregate failure renders as `failed-ops [...]` with the child
///   reasons in order;
/// - a user-supplied `fail(x)` carries `x` verbatim;
/// - an error raised by user code during step construction or capture is
///   carried as `exception` and re-raised by [`Operation::join`].
///
/// [`Operation::join`]: crate::Operation::join
#[derive(Clone, Debug)]
pub enum FailReason {
    /// A per-state timer expired before the state was left.
    TimedOut,
    /// One or more children of a `parallel` reached a non-success state.
    FailedOps(Vec<FailReason>),
    /// The operation was externally aborted, with an optional caller reason.
    Abort(Option<Value>),
    /// User-supplied failure value, propagated verbatim.
    User(Value),
    /// An error raised by user code, captured for re-raising on `join`.
    Exception(Arc<OpError>),
}

impl PartialEq for FailReason {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (FailReason::TimedOut, FailReason::TimedOut) => true,
            (FailReason::FailedOps(a), FailReason::FailedOps(b)) => a == b,
            (FailReason::Abort(a), FailReason::Abort(b)) => a == b,
            (FailReason::User(a), FailReason::User(b)) => a == b,
            (FailReason::Exception(a), FailReason::Exception(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl std::fmt::Display for FailReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailReason::TimedOut => write!(f, "timed-out"),
            FailReason::FailedOps(reasons) => {
                write!(f, "failed-ops [")?;
                for (i, r) in reasons.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{r}")?;
                }
                write!(f, "]")
            }
            FailReason::Abort(Some(v)) => write!(f, "aborted: {v}"),
            FailReason::Abort(None) => write!(f, "aborted"),
            FailReason::User(v) => write!(f, "{v}"),
            FailReason::Exception(e) => write!(f, "exception: {e}"),
        }
    }
}

/// # Failures surfaced to the caller of an operation.
///
/// Returned by [`Operation::join`](crate::Operation::join) and by the user
/// closures handed to [`Sequence::step`](crate::Sequence::step) and
/// [`reduce`](crate::reduce). A closure error is wrapped as
/// [`FailReason::Exception`] and re-raised when the caller joins.
#[non_exhaustive]
#[derive(Error, Debug, Clone)]
pub enum OpError {
    /// The operation reached `failed` with the given reason.
    #[error("operation failed: {reason}")]
    Failed { reason: FailReason },

    /// The operation reached `failed` because a per-state timer expired.
    #[error("operation timed out")]
    TimedOut,

    /// The operation was externally aborted.
    #[error("operation aborted")]
    Aborted { reason: Option<Value> },

    /// A step closure looked up a binding that is not in the env.
    #[error("missing binding '{name}'")]
    MissingBinding { name: String },

    /// A step closure read a binding with an unexpected type.
    #[error("binding '{name}' is {found}, expected {expected}")]
    WrongType {
        name: String,
        expected: &'static str,
        found: &'static str,
    },

    /// A capture pattern did not match the shape of a step result.
    #[error("pattern does not match result: {detail}")]
    PatternMismatch { detail: String },

    /// Free-form failure raised by user code inside a step closure.
    #[error("{message}")]
    Raised { message: String },

    /// The engine itself faulted while driving the operation.
    #[error("engine fault: {0}")]
    Engine(#[from] EngineError),
}

impl OpError {
    /// Builds a free-form error for use inside step closures.
    pub fn raised(message: impl Into<String>) -> Self {
        OpError::Raised {
            message: message.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            OpError::Failed { .. } => "op_failed",
            OpError::TimedOut => "op_timed_out",
            OpError::Aborted { .. } => "op_aborted",
            OpError::MissingBinding { .. } => "op_missing_binding",
            OpError::WrongType { .. } => "op_wrong_type",
            OpError::PatternMismatch { .. } => "op_pattern_mismatch",
            OpError::Raised { .. } => "op_raised",
            OpError::Engine(_) => "op_engine_fault",
        }
    }
}

/// # Faults in the orchestration machinery itself.
///
/// These indicate a malformed specification or an engine bug, never a
/// user-level failure. A fault inside a running machine is published at
/// error level on the event bus and drives the machine to `failed`; it
/// never crashes a pool task.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EngineError {
    /// A handler requested a transition that the current state does not declare.
    #[error("transition {from} -> {to} is not declared")]
    InvalidTransition { from: StateName, to: StateName },

    /// A signal arrived in a state with no handler for it.
    #[error("no handler for signal {signal} in state {state}")]
    UnhandledSignal { state: StateName, signal: SignalName },

    /// A signal carried a payload its handler does not accept.
    #[error("unexpected payload for signal {signal}")]
    BadPayload { signal: SignalName },

    /// The specification declares no initial state.
    #[error("specification has no initial state")]
    MissingInitialState,

    /// A state name was referenced but never declared.
    #[error("state {0} is not declared")]
    UnknownState(StateName),

    /// A handler expected a scope frame that is missing or of the wrong kind.
    #[error("scope frame missing or mismatched in state {state}")]
    FrameMismatch { state: StateName },

    /// The per-machine transition lock was poisoned by a panic.
    #[error("transition lock poisoned")]
    LockPoisoned,

    /// A signal was delivered to a machine that has already been dropped.
    #[error("machine dropped while signal in flight")]
    Detached,
}

impl EngineError {
    /// Returns a short stable label.
    pub fn as_label(&self) -> &'static str {
        match self {
            EngineError::InvalidTransition { .. } => "engine_invalid_transition",
            EngineError::UnhandledSignal { .. } => "engine_unhandled_signal",
            EngineError::BadPayload { .. } => "engine_bad_payload",
            EngineError::MissingInitialState => "engine_missing_initial_state",
            EngineError::UnknownState(_) => "engine_unknown_state",
            EngineError::FrameMismatch { .. } => "engine_frame_mismatch",
            EngineError::LockPoisoned => "engine_lock_poisoned",
            EngineError::Detached => "engine_detached",
        }
    }
}
