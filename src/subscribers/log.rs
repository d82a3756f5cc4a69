//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [op-started] op="pipeline"
//! [state] op="pipeline" state=running
//! [step] op="pipeline" step=step-1
//! [timer-armed] op="pipeline" id=3 dur=500ms
//! [op-failed] op="pipeline" err="timed-out"
//! ```

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;
use async_trait::async_trait;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::OpStarted => {
                println!("[op-started] op={:?}", e.op);
            }
            EventKind::OpCompleted => {
                println!("[op-completed] op={:?}", e.op);
            }
            EventKind::OpFailed => {
                println!("[op-failed] op={:?} err={:?}", e.op, e.error);
            }
            EventKind::OpAborted => {
                println!("[op-aborted] op={:?} err={:?}", e.op, e.error);
            }
            EventKind::StateEntered => {
                if let Some(state) = e.state {
                    println!("[state] op={:?} state={state}", e.op);
                }
            }
            EventKind::StepStarted => {
                println!("[step] op={:?} step={:?}", e.op, e.step);
            }
            EventKind::SignalDropped => {
                println!(
                    "[signal-dropped] op={:?} state={:?} signal={:?}",
                    e.op, e.state, e.signal
                );
            }
            EventKind::TimerArmed => {
                println!(
                    "[timer-armed] op={:?} id={:?} dur={:?}",
                    e.op, e.timer, e.timeout
                );
            }
            EventKind::TimerCanceled => {
                println!("[timer-canceled] op={:?} id={:?}", e.op, e.timer);
            }
            EventKind::StaleTimer => {
                println!("[stale-timer] op={:?} id={:?}", e.op, e.timer);
            }
            EventKind::EngineFault => {
                println!("[engine-fault] op={:?} err={:?}", e.op, e.error);
            }
            EventKind::SubscriberOverflow => {
                println!("[subscriber-overflow] err={:?}", e.error);
            }
            EventKind::SubscriberPanicked => {
                println!("[subscriber-panicked] sub={:?} err={:?}", e.op, e.error);
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
