//! Signals: the events dispatched into a running machine.

use crate::error::FailReason;
use crate::machine::data::ChildSnapshot;
use crate::machine::state::SignalName;
use crate::value::Value;

/// A signal delivered to one machine instance.
///
/// Signals are processed under the machine's transition lock, one at a
/// time, in arrival order.
#[derive(Debug, Clone)]
pub struct Signal {
    pub name: SignalName,
    pub payload: Payload,
}

/// Payload carried by a signal.
#[derive(Debug, Clone, Default)]
pub enum Payload {
    #[default]
    Empty,
    /// A plain value (e.g. an abort reason).
    Value(Value),
    /// A failure reason.
    Reason(FailReason),
    /// A child's terminal snapshot (parallel / sequence wiring).
    Snapshot(ChildSnapshot),
    /// A timer id (delay / timeout fires).
    TimerId(u64),
}

impl Payload {
    pub fn value(&self) -> Option<&Value> {
        match self {
            Payload::Value(v) => Some(v),
            _ => None,
        }
    }

    pub fn snapshot(&self) -> Option<&ChildSnapshot> {
        match self {
            Payload::Snapshot(s) => Some(s),
            _ => None,
        }
    }

    pub fn timer_id(&self) -> Option<u64> {
        match self {
            Payload::TimerId(id) => Some(*id),
            _ => None,
        }
    }
}

impl Signal {
    pub fn new(name: SignalName) -> Self {
        Self {
            name,
            payload: Payload::Empty,
        }
    }

    /// The synthetic start signal fired once per operation.
    pub fn start() -> Self {
        Self::new(SignalName::Start)
    }

    /// A bare abort request.
    pub fn abort() -> Self {
        Self::new(SignalName::Abort)
    }

    /// An abort request carrying a caller-supplied reason.
    pub fn abort_with(reason: impl Into<Value>) -> Self {
        Self::new(SignalName::Abort).with_value(reason.into())
    }

    /// A timer fire carrying the timer's id.
    pub(crate) fn timer(name: SignalName, id: u64) -> Self {
        Self {
            name,
            payload: Payload::TimerId(id),
        }
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.payload = Payload::Value(value);
        self
    }

    pub fn with_reason(mut self, reason: FailReason) -> Self {
        self.payload = Payload::Reason(reason);
        self
    }

    pub fn with_snapshot(mut self, snapshot: ChildSnapshot) -> Self {
        self.payload = Payload::Snapshot(snapshot);
        self
    }
}
