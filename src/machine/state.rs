//! # State and signal vocabularies.
//!
//! Every composed machine draws its states from the closed [`StateName`]
//! enum: the well-known states of the built-in combinators, the four
//! terminals, and a [`StateName::Named`] extension variant for custom
//! specifications. Signals work the same way via [`SignalName`].

use std::fmt;

/// Name of a machine state.
///
/// The four terminal states (`Completed`, `Failed`, `Aborted`, `TimedOut`)
/// are shared by every composed machine; the rest are the working states of
/// the built-in combinators. Custom specifications extend the vocabulary
/// with [`StateName::Named`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateName {
    /// Initial state of every combinator; waits for `start`.
    Init,
    /// Work in flight (delay timer armed, children running, step running).
    Running,
    /// All parallel children have terminated; deciding the outcome.
    OpsComplete,
    /// A sequence step finished; deciding whether to run the next.
    StepCompleted,
    /// A sequence step failed; propagating the reason.
    StepFailed,
    /// Terminal: the operation produced a result.
    Completed,
    /// Terminal: the operation failed (including per-state timeouts).
    Failed,
    /// Terminal: the operation was externally aborted.
    Aborted,
    /// Terminal: admitted wherever a timeout wrapper is active.
    TimedOut,
    /// Extension point for custom specifications.
    Named(&'static str),
}

impl StateName {
    /// True for the four terminal states.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            StateName::Completed | StateName::Failed | StateName::Aborted | StateName::TimedOut
        )
    }

    /// The four terminal states every composed machine admits.
    pub const TERMINALS: [StateName; 4] = [
        StateName::Completed,
        StateName::Failed,
        StateName::Aborted,
        StateName::TimedOut,
    ];

    /// Stable kebab-case name for logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            StateName::Init => "init",
            StateName::Running => "running",
            StateName::OpsComplete => "ops-complete",
            StateName::StepCompleted => "step-completed",
            StateName::StepFailed => "step-failed",
            StateName::Completed => "completed",
            StateName::Failed => "failed",
            StateName::Aborted => "aborted",
            StateName::TimedOut => "timed-out",
            StateName::Named(s) => s,
        }
    }
}

impl fmt::Display for StateName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Name of a signal dispatched into a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalName {
    /// Synthetic start delivered once by the runtime.
    Start,
    /// Cooperative cancellation request.
    Abort,
    /// A `delay` timer elapsed.
    TimerElapsed,
    /// A per-state timeout timer expired.
    TimeoutFired,
    /// A parallel child completed (payload: child snapshot).
    OpComplete,
    /// A parallel child failed or aborted (payload: child snapshot).
    OpFail,
    /// Internal: decide the success outcome of a scope.
    Complete,
    /// Internal: decide the failure outcome of a scope.
    Fail,
    /// A sequence child completed (payload: child snapshot).
    StepComplete,
    /// A sequence child failed (payload: child snapshot).
    StepFail,
    /// A sequence child aborted (payload: child snapshot).
    StepAbort,
    /// Internal: a sequence has more steps to run.
    RunNextStep,
    /// Extension point for custom specifications.
    Named(&'static str),
}

impl SignalName {
    /// Stable kebab-case name for logs and reports.
    pub fn as_str(self) -> &'static str {
        match self {
            SignalName::Start => "start",
            SignalName::Abort => "abort",
            SignalName::TimerElapsed => "timer-elapsed",
            SignalName::TimeoutFired => "timeout-fired",
            SignalName::OpComplete => "op-complete",
            SignalName::OpFail => "op-fail",
            SignalName::Complete => "complete",
            SignalName::Fail => "fail",
            SignalName::StepComplete => "step-complete",
            SignalName::StepFail => "step-fail",
            SignalName::StepAbort => "step-abort",
            SignalName::RunNextStep => "run-next-step",
            SignalName::Named(s) => s,
        }
    }

    /// Signals that may legitimately arrive after their window has closed
    /// (late timers, racing aborts). Dropping them is not a fault.
    pub(crate) fn tolerates_drop(self) -> bool {
        matches!(
            self,
            SignalName::Abort | SignalName::TimerElapsed | SignalName::TimeoutFired
        )
    }
}

impl fmt::Display for SignalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Feature flags a specification may request from the machine runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    /// Serialize all dispatch, hooks and data mutation per machine instance.
    LockTransition,
    /// Record prior (state, data snapshot) pairs on every transition.
    History,
}
