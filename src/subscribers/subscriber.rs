//! # Event subscriber trait.
//!
//! [`Subscribe`] is the extension point for consuming engine events:
//! implement it for a metrics exporter, an audit sink, or a test probe and
//! hand it to [`Engine::new`](crate::Engine::new). The
//! [`SubscriberSet`](crate::subscribers::SubscriberSet) gives every
//! subscriber its own bounded queue and worker task, so a slow or
//! panicking subscriber never stalls a running machine.
//!
//! Machines are chatty: every transition publishes `StateEntered`, and a
//! timer-heavy spec adds an armed/canceled pair per state on top. A
//! subscriber that only cares about operation outcomes should override
//! [`Subscribe::interested`] so the per-transition noise is dropped before
//! it ever occupies queue space.

use async_trait::async_trait;

use crate::events::{Event, EventKind};

/// Consumer of engine events, driven by a dedicated worker task.
///
/// Delivery is per-subscriber FIFO and happens off the publisher's path:
/// when the queue fills up, further events are dropped for this subscriber
/// only (reported as `SubscriberOverflow`), and a panic inside
/// [`on_event`](Subscribe::on_event) is caught and reported as
/// `SubscriberPanicked` without touching other subscribers.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event, in queue order.
    async fn on_event(&self, event: &Event);

    /// Short stable name used in overflow and panic reports.
    fn name(&self) -> &'static str;

    /// Pre-filter applied before an event is queued for this subscriber.
    ///
    /// Returning `false` drops the event silently, with no overflow
    /// report. The default accepts every kind.
    fn interested(&self, kind: EventKind) -> bool {
        let _ = kind;
        true
    }

    /// Capacity of this subscriber's queue.
    ///
    /// Sized for outcome-level consumers; raise it, or narrow
    /// [`interested`](Subscribe::interested), when tracking the
    /// per-transition events of busy operations.
    fn queue_capacity(&self) -> usize {
        256
    }
}
