//! # Engine: turns specifications into running operations.
//!
//! The [`Engine`] owns the runtime components (event bus, subscriber
//! fan-out, configuration) and materializes specifications:
//!
//! ```text
//! MachineSpec ──► Engine::operate()
//!                      │
//!                      ├──► merge(spec, terminal-delivery patch)
//!                      ├──► materialize root Machine (bus, history cap)
//!                      ├──► fire `start` synchronously
//!                      └──► Operation { machine, completion slot }
//! ```
//!
//! The terminal-delivery patch installs entry hooks on all four terminal
//! states; whichever is reached first delivers the [`Outcome`] to the
//! operation's single-shot slot and publishes the matching lifecycle
//! event. Later deliveries are discarded by the slot, which is what keeps
//! the exactly-once invariant under racing terminal transitions.
//!
//! Engines are independent: each carries its own bus and subscribers, so
//! multiple engines coexist in one process.

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::EngineError;
use crate::events::{Bus, Event, EventKind};
use crate::machine::{merge, Ctx, Machine, MachineSpec, Signal, StateDecl, StateName};
use crate::runtime::operation::Operation;
use crate::runtime::slot::{CompletionSlot, Outcome};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Materializes specifications into observable, abortable operations.
pub struct Engine {
    cfg: Config,
    bus: Bus,
    subscribers: Arc<SubscriberSet>,
}

impl Engine {
    /// Creates an engine with the given config and subscribers (maybe empty).
    ///
    /// With a non-empty subscriber list this must be called from within a
    /// tokio runtime (subscriber workers are spawned immediately).
    pub fn new(cfg: Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        let bus = Bus::new(cfg.bus_capacity);
        let subscribers = Arc::new(SubscriberSet::new(subscribers, bus.clone()));
        let engine = Self {
            cfg,
            bus,
            subscribers,
        };
        engine.subscriber_listener();
        engine
    }

    /// Instantiates `spec` and starts it.
    ///
    /// The returned operation is already `running`: the synthetic `start`
    /// signal is dispatched synchronously inside this call.
    pub fn operate(&self, spec: MachineSpec) -> Result<Operation, EngineError> {
        let slot = Arc::new(CompletionSlot::new());
        let mut merged = merge([spec, delivery()]);
        let mut seed = merged.seed.take().unwrap_or_default();
        seed.promise = Some(Arc::clone(&slot));
        merged.seed = Some(seed);

        let machine = Machine::materialize(merged, self.bus.clone(), self.cfg.history_limit)?;
        self.bus.publish(machine.op_event(EventKind::OpStarted));
        machine.dispatch(Signal::start())?;
        Ok(Operation::new(machine, slot))
    }

    /// Subscribes a raw receiver to the engine's event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// The engine's configuration.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Spawns the background task that fans bus events out to subscribers.
    fn subscriber_listener(&self) {
        if self.subscribers.is_empty() {
            return;
        }
        let mut rx = self.bus.subscribe();
        let set = Arc::clone(&self.subscribers);
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => set.emit_arc(Arc::new(ev)),
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        });
    }
}

/// Patch installing the terminal-delivery hooks on all four terminals.
fn delivery() -> MachineSpec {
    let mut patch = MachineSpec::new();
    for (terminal, kind) in [
        (StateName::Completed, EventKind::OpCompleted),
        (StateName::Failed, EventKind::OpFailed),
        (StateName::TimedOut, EventKind::OpFailed),
        (StateName::Aborted, EventKind::OpAborted),
    ] {
        patch = patch.state(StateDecl::new(terminal).on_entry(move |ctx: &mut Ctx<'_>| {
            let outcome = Outcome {
                state: ctx.state(),
                result: ctx.data().result.clone(),
                fail_reason: ctx.data().fail_reason.clone(),
            };
            let error = outcome.fail_reason.as_ref().map(|r| r.to_string());
            if let Some(slot) = ctx.data().promise.clone() {
                slot.deliver(outcome);
            }
            let mut draft = ctx.publish(kind).with_state(terminal);
            if let Some(error) = error {
                draft = draft.with_error(error);
            }
            draft.emit();
            Ok(())
        }));
    }
    patch
}
