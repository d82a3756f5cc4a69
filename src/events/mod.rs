//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by running machines, the
//! timer glue and the engine.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Machine` (state entries, dropped signals, faults),
//!   timer glue (armed/canceled/stale), `Engine::operate` and the
//!   terminal-delivery hooks (op lifecycle), `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the engine's subscriber listener (fans out to
//!   [`Subscribe`](crate::subscribers::Subscribe) implementors) and any
//!   direct [`Bus::subscribe`] receiver.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
