//! # SubscriberSet: non-blocking fan-out over multiple subscribers
//!
//! [`SubscriberSet`] distributes each [`Event`](crate::events::Event) to
//! multiple subscribers **without awaiting** their processing.
//!
//! ## What it guarantees
//! - `emit_arc(..)` returns immediately.
//! - Per-subscriber FIFO (queue order).
//! - Kinds a subscriber is not [`interested`](Subscribe::interested) in are
//!   dropped before they occupy queue space.
//! - Panics inside subscribers are caught and reported (isolation).
//!
//! ## What it does **not** guarantee
//! - No global ordering across different subscribers.
//! - No retries on per-subscriber queue overflow (events are dropped for
//!   that subscriber).
//!
//! ## Diagram
//! ```text
//!    emit_arc(Arc<Event>)
//!        │                 (interest filter, then Arc-clone per subscriber)
//!        ├────────────────► [queue S1] ─► worker S1 ─► on_event()
//!        ├────────────────► [queue S2] ─► worker S2 ─► on_event()
//!        └────────────────► [queue SN] ─► worker SN ─► on_event()
//! ```

use std::sync::Arc;

use futures::FutureExt;
use tokio::{sync::mpsc, task::JoinHandle};

use crate::events::{Bus, Event, EventKind};

use super::Subscribe;

/// Per-subscriber channel with metadata
struct SubscriberChannel {
    name: &'static str,
    sender: mpsc::Sender<Arc<Event>>,
    sub: Arc<dyn Subscribe>,
}

/// Composite fan-out with per-subscriber bounded queues and worker tasks.
pub struct SubscriberSet {
    channels: Vec<SubscriberChannel>,
    workers: Vec<JoinHandle<()>>,
    bus: Bus,
}

impl SubscriberSet {
    /// Creates a new set and spawns one worker per subscriber.
    ///
    /// Must be called from within a tokio runtime. The bus is used to report
    /// overflow and subscriber panics.
    #[must_use]
    pub fn new(subs: Vec<Arc<dyn Subscribe>>, bus: Bus) -> Self {
        let mut channels = Vec::with_capacity(subs.len());
        let mut workers = Vec::with_capacity(subs.len());

        for sub in subs {
            let cap = sub.queue_capacity().max(1);
            let name = sub.name();
            let (tx, mut rx) = mpsc::channel::<Arc<Event>>(cap);
            let s = Arc::clone(&sub);
            let report = bus.clone();

            let handle = tokio::spawn(async move {
                while let Some(ev) = rx.recv().await {
                    let fut = s.on_event(ev.as_ref());
                    if let Err(panic_err) = std::panic::AssertUnwindSafe(fut).catch_unwind().await {
                        report.publish(Event::subscriber_panicked(
                            s.name(),
                            format!("{panic_err:?}"),
                        ));
                    }
                }
            });

            channels.push(SubscriberChannel {
                name,
                sender: tx,
                sub,
            });
            workers.push(handle);
        }

        Self {
            channels,
            workers,
            bus,
        }
    }

    /// Fan-out one event to all interested subscribers (non-blocking).
    ///
    /// A subscriber whose [`interested`](Subscribe::interested) filter
    /// rejects the event kind is skipped silently. If a subscriber's queue
    /// is **full** or **closed**, the event is dropped for it and a
    /// `SubscriberOverflow` event is published. Overflow events themselves
    /// are never re-reported to avoid feedback loops.
    pub fn emit_arc(&self, ev: Arc<Event>) {
        for channel in &self.channels {
            if !channel.sub.interested(ev.kind) {
                continue;
            }
            match channel.sender.try_send(Arc::clone(&ev)) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    self.report_overflow(&ev, channel.name, "queue_full");
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    self.report_overflow(&ev, channel.name, "worker_closed");
                }
            }
        }
    }

    fn report_overflow(&self, dropped: &Event, name: &'static str, reason: &'static str) {
        if matches!(
            dropped.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        ) {
            return;
        }
        self.bus.publish(Event::subscriber_overflow(name, reason));
    }

    /// Graceful shutdown: close all queues and await worker completion.
    pub async fn shutdown(self) {
        drop(self.channels);
        for h in self.workers {
            let _ = h.await;
        }
    }

    /// True if there are no subscribers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Number of subscribers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct KindTap {
        tx: mpsc::UnboundedSender<EventKind>,
    }

    #[async_trait]
    impl Subscribe for KindTap {
        async fn on_event(&self, event: &Event) {
            let _ = self.tx.send(event.kind);
        }

        fn name(&self) -> &'static str {
            "kind-tap"
        }

        fn interested(&self, kind: EventKind) -> bool {
            kind != EventKind::StateEntered
        }
    }

    #[tokio::test]
    async fn uninterested_kinds_never_reach_the_worker() {
        let bus = Bus::new(16);
        let (tx, mut rx) = mpsc::unbounded_channel();
        let set = SubscriberSet::new(vec![Arc::new(KindTap { tx })], bus);

        set.emit_arc(Arc::new(Event::now(EventKind::StateEntered)));
        set.emit_arc(Arc::new(Event::now(EventKind::OpCompleted)));

        // Per-subscriber FIFO: had the filtered event been queued, it would
        // arrive first.
        assert_eq!(rx.recv().await, Some(EventKind::OpCompleted));
    }
}
