//! # Event subscribers for the engine.
//!
//! This module provides the [`Subscribe`] trait and built-in implementations
//! for handling runtime events broadcast through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   Machine ── publish(Event) ──► Bus ──► engine listener
//!                                           │
//!                                           ▼
//!                             SubscriberSet (interest filter + bounded queues)
//!                                           │
//!                                     ┌─────┴─────┬─────────┐
//!                                     ▼           ▼         ▼
//!                                 LogWriter    Metrics   Custom ...
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use opflow::{Subscribe, events::{Event, EventKind}};
//! use async_trait::async_trait;
//!
//! struct MetricsSubscriber;
//!
//! #[async_trait]
//! impl Subscribe for MetricsSubscriber {
//!     async fn on_event(&self, event: &Event) {
//!         if let EventKind::OpFailed = event.kind {
//!             // increment failure counter
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "metrics"
//!     }
//!
//!     // Outcome-level consumer: skip per-transition noise.
//!     fn interested(&self, kind: EventKind) -> bool {
//!         matches!(
//!             kind,
//!             EventKind::OpCompleted | EventKind::OpFailed | EventKind::OpAborted
//!         )
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod set;
mod subscriber;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use set::SubscriberSet;
pub use subscriber::Subscribe;
