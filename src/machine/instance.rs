//! # Materialized machine instances.
//!
//! A [`Machine`] is one live instance of a [`MachineSpec`]. All signal
//! dispatch, hook execution and state-data mutation for one instance are
//! serialized under a per-instance mutex (the `lock-transition` feature);
//! different instances (including a parent and its children) run
//! concurrently on different pool tasks.
//!
//! ## Dispatch model
//! ```text
//! Machine::send(signal)            Machine::dispatch(signal)
//!        │ (spawned task)                  │ (caller task)
//!        └────────────┬───────────────────┘
//!                     ▼
//!              transition lock
//!                     │
//!          ┌──────────┴──────────┐
//!          │ run-to-completion:  │
//!          │  handler → hooks →  │
//!          │  drained fire queue │
//!          └─────────────────────┘
//! ```
//!
//! Handlers and hooks never call `dispatch` on their own machine; they
//! enqueue follow-up signals with [`Ctx::fire`], which the dispatch loop
//! drains under the same lock. Cross-machine signals go through
//! [`Machine::send`], which spawns a worker task, decoupling lock scopes
//! and preventing unbounded stack growth.
//!
//! ## Rules
//! - A transition must be declared by the current state or it is rejected;
//!   this is what makes a stale timer fire a no-op.
//! - A signal with no handler is dropped in terminal states and for
//!   tolerated late arrivals; anything else is an engine fault: published
//!   at error level, recorded as a structured reason, and the machine moves
//!   to `failed`. Pool tasks never crash.
//! - History is recorded on exit (prior states), capped by configuration.

use std::borrow::Cow;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, Weak};
use std::time::{Duration, SystemTime};

use dashmap::DashMap;

use crate::error::{EngineError, FailReason, OpError};
use crate::events::{Bus, Event, EventKind};
use crate::machine::data::{HistoryEntry, StateData};
use crate::machine::signal::Signal;
use crate::machine::spec::{MachineSpec, StateDecl};
use crate::machine::state::{Feature, SignalName, StateName};
use crate::runtime::timers::{self, TimerHandle};

/// One live, lockable machine instance.
pub struct Machine {
    name: Option<Cow<'static, str>>,
    states: HashMap<StateName, StateDecl>,
    history_on: bool,
    history_limit: usize,
    /// Armed one-shot timers, keyed by timer id. The only mutable cell
    /// shared with timer tasks outside the transition lock.
    timeouts: DashMap<u64, TimerHandle>,
    bus: Bus,
    weak: Weak<Machine>,
    inner: Mutex<Inner>,
}

struct Inner {
    current: StateName,
    data: StateData,
    history: Vec<HistoryEntry>,
    /// Internal fire queue, drained run-to-completion under the lock.
    queue: VecDeque<Signal>,
    /// Transition counter; guards hook chains.
    epoch: u64,
    /// Timer ids armed per state, cancelled on that state's exit.
    armed: Vec<(StateName, u64)>,
}

impl Machine {
    /// Creates a live instance from a specification.
    ///
    /// The seed state data is cloned out of the spec; the spec itself stays
    /// a pure value and may be materialized again.
    pub fn materialize(
        spec: MachineSpec,
        bus: Bus,
        history_limit: usize,
    ) -> Result<Arc<Machine>, EngineError> {
        let initial = spec.initial.ok_or(EngineError::MissingInitialState)?;
        let mut states = HashMap::with_capacity(spec.states.len());
        for decl in spec.states {
            states.insert(decl.name, decl);
        }
        if !states.contains_key(&initial) {
            return Err(EngineError::UnknownState(initial));
        }
        let history_on = spec.features.contains(&Feature::History) && history_limit > 0;
        let data = spec.seed.unwrap_or_default();

        Ok(Arc::new_cyclic(|weak| Machine {
            name: spec.name,
            states,
            history_on,
            history_limit,
            timeouts: DashMap::new(),
            bus,
            weak: weak.clone(),
            inner: Mutex::new(Inner {
                current: initial,
                data,
                history: Vec::new(),
                queue: VecDeque::new(),
                epoch: 0,
                armed: Vec::new(),
            }),
        }))
    }

    /// The machine's name, if the spec declared one.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Current state name.
    pub fn state(&self) -> Result<StateName, EngineError> {
        let inner = self.inner.lock().map_err(|_| EngineError::LockPoisoned)?;
        Ok(inner.current)
    }

    /// Consistent snapshot of (current state, state data).
    pub(crate) fn peek(&self) -> Result<(StateName, StateData), EngineError> {
        let inner = self.inner.lock().map_err(|_| EngineError::LockPoisoned)?;
        Ok((inner.current, inner.data.clone()))
    }

    /// Recorded prior states, oldest first.
    pub(crate) fn history(&self) -> Result<Vec<HistoryEntry>, EngineError> {
        let inner = self.inner.lock().map_err(|_| EngineError::LockPoisoned)?;
        Ok(inner.history.clone())
    }

    /// Delivers a signal synchronously on the caller's task.
    ///
    /// Takes the transition lock, runs the handler, then drains every
    /// follow-up signal the handler and its hooks fired. Handler faults are
    /// absorbed (published + machine driven to `failed`), so an `Err` here
    /// means the lock itself is unusable.
    pub fn dispatch(&self, signal: Signal) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().map_err(|_| EngineError::LockPoisoned)?;
        inner.queue.push_back(signal);
        while let Some(signal) = inner.queue.pop_front() {
            self.step_signal(&mut inner, &signal);
        }
        Ok(())
    }

    /// Delivers a signal on a fresh worker task.
    ///
    /// This is the cross-machine path: child→parent notifications, child
    /// starts and timer fires all go through here so that no machine's lock
    /// scope nests inside another's. Failures are reported on the bus, the
    /// task never panics.
    pub fn send(self: &Arc<Self>, signal: Signal) {
        let machine = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(err) = machine.dispatch(signal) {
                machine.publish(
                    machine
                        .op_event(EventKind::EngineFault)
                        .with_error(err.to_string()),
                );
            }
        });
    }

    /// Publishes an event on the engine bus.
    pub(crate) fn publish(&self, event: Event) {
        self.bus.publish(event);
    }

    /// An event pre-tagged with this machine's name.
    pub(crate) fn op_event(&self, kind: EventKind) -> Event {
        let event = Event::now(kind);
        match &self.name {
            Some(name) => event.with_op(name.to_string()),
            None => event,
        }
    }

    fn step_signal(&self, inner: &mut Inner, signal: &Signal) {
        let current = inner.current;
        let handler = self
            .states
            .get(&current)
            .and_then(|decl| decl.handler(signal.name).cloned());

        match handler {
            Some(handler) => {
                let mut ctx = Ctx {
                    machine: self,
                    inner: &mut *inner,
                };
                if let Err(err) = (*handler)(&mut ctx, signal) {
                    self.fault(inner, err);
                }
            }
            None if current.is_terminal() || signal.name.tolerates_drop() => {
                self.publish(
                    self.op_event(EventKind::SignalDropped)
                        .with_state(current)
                        .with_signal(signal.name),
                );
            }
            None => {
                self.fault(
                    inner,
                    EngineError::UnhandledSignal {
                        state: current,
                        signal: signal.name,
                    },
                );
            }
        }
    }

    /// Absorbs an engine fault: publish at error level, record a structured
    /// reason, and drive the machine to `failed` when that transition is
    /// declared. Never propagates.
    fn fault(&self, inner: &mut Inner, err: EngineError) {
        self.publish(
            self.op_event(EventKind::EngineFault)
                .with_state(inner.current)
                .with_error(err.to_string()),
        );
        if inner.current.is_terminal() {
            return;
        }
        inner.data.fail_reason = Some(FailReason::Exception(Arc::new(OpError::Engine(err))));
        let mut ctx = Ctx {
            machine: self,
            inner: &mut *inner,
        };
        if let Err(rejected) = ctx.transition(StateName::Failed) {
            self.publish(
                self.op_event(EventKind::SignalDropped).with_error(format!(
                    "fault could not reach failed: {rejected}"
                )),
            );
        }
    }

    fn record_history(&self, inner: &mut Inner, exited: StateName) {
        if !self.history_on {
            return;
        }
        if inner.history.len() == self.history_limit {
            inner.history.remove(0);
        }
        let snapshot = inner.data.snapshot();
        inner.history.push(HistoryEntry {
            state: exited,
            at: SystemTime::now(),
            data: snapshot,
        });
    }
}

/// Handler/hook context: the machine plus exclusive access to its state.
///
/// Exists only while the transition lock is held; everything a combinator
/// does at runtime goes through this type.
pub struct Ctx<'a> {
    machine: &'a Machine,
    inner: &'a mut Inner,
}

impl Ctx<'_> {
    /// Mutable access to the machine's state data.
    pub fn data(&mut self) -> &mut StateData {
        &mut self.inner.data
    }

    /// Current state name.
    pub fn state(&self) -> StateName {
        self.inner.current
    }

    /// Weak handle to this machine, for wiring child hooks back to it.
    pub fn machine_weak(&self) -> Weak<Machine> {
        self.machine.weak.clone()
    }

    /// Strong handle to this machine.
    pub fn machine_arc(&self) -> Result<Arc<Machine>, EngineError> {
        self.machine.weak.upgrade().ok_or(EngineError::Detached)
    }

    /// Materializes a child specification on this machine's bus and
    /// history settings.
    pub fn materialize(&self, spec: MachineSpec) -> Result<Arc<Machine>, EngineError> {
        Machine::materialize(spec, self.machine.bus.clone(), self.machine.history_limit)
    }

    /// Enqueues a follow-up signal, processed before the lock is released.
    pub fn fire(&mut self, signal: Signal) {
        self.inner.queue.push_back(signal);
    }

    /// Publishes an event pre-tagged with this machine's name.
    pub fn publish(&self, kind: EventKind) -> EventDraft<'_> {
        EventDraft {
            machine: self.machine,
            event: self.machine.op_event(kind),
        }
    }

    /// Performs a transition to `to`.
    ///
    /// Validates the transition against the current state's declared
    /// successors, runs the exit chain, records history, switches state and
    /// runs the entry chain. Both chains are guarded: a hook that itself
    /// changed state short-circuits the remainder.
    pub fn transition(&mut self, to: StateName) -> Result<(), EngineError> {
        let machine = self.machine;
        let from = self.inner.current;
        let from_decl = machine
            .states
            .get(&from)
            .ok_or(EngineError::UnknownState(from))?;
        if !from_decl.transitions.contains(&to) {
            return Err(EngineError::InvalidTransition { from, to });
        }
        let to_decl = machine
            .states
            .get(&to)
            .ok_or(EngineError::UnknownState(to))?;
        let exit_chain = from_decl.on_exit.clone();
        let entry_chain = to_decl.on_entry.clone();

        let mark = self.inner.epoch;
        for hook in &exit_chain {
            (**hook)(self)?;
            if self.inner.epoch != mark {
                // An exit hook moved the machine elsewhere; this transition
                // is superseded.
                return Ok(());
            }
        }

        machine.record_history(&mut *self.inner, from);
        self.inner.epoch += 1;
        self.inner.current = to;
        machine.publish(machine.op_event(EventKind::StateEntered).with_state(to));

        let mark = self.inner.epoch;
        for hook in &entry_chain {
            (**hook)(self)?;
            if self.inner.epoch != mark {
                break;
            }
        }
        Ok(())
    }

    /// Arms a one-shot timer scoped to the current state.
    ///
    /// The timer delivers `Signal { name: signal, payload: TimerId(id) }`
    /// through the worker pool when it expires. The handle is registered in
    /// the machine's timeout map and in the per-state armed list, so
    /// [`Ctx::cancel_state_timers`] on exit cancels it best-effort.
    pub fn arm_timer(&mut self, dur: Duration, signal: SignalName) -> Result<u64, EngineError> {
        let machine = self.machine_arc()?;
        let id = timers::next_timer_id();
        let handle = timers::schedule(machine, dur, Signal::timer(signal, id));
        self.machine.timeouts.insert(id, handle);
        let state = self.inner.current;
        self.inner.armed.push((state, id));
        self.publish(EventKind::TimerArmed)
            .with_state(state)
            .with_timer(id)
            .with_timeout(dur)
            .emit();
        Ok(id)
    }

    /// True while the given timer is still armed (its state not yet exited).
    pub fn timer_armed(&self, id: u64) -> bool {
        self.machine.timeouts.contains_key(&id)
    }

    /// Cancels every timer armed by the current state.
    ///
    /// Best effort: a timer that already fired may still deliver its
    /// signal, which the armed-check and the declared-transition set turn
    /// into a no-op.
    pub fn cancel_state_timers(&mut self) {
        let state = self.inner.current;
        let armed = std::mem::take(&mut self.inner.armed);
        let (cancel, keep): (Vec<_>, Vec<_>) = armed.into_iter().partition(|(s, _)| *s == state);
        self.inner.armed = keep;
        for (_, id) in cancel {
            if let Some((_, handle)) = self.machine.timeouts.remove(&id) {
                handle.cancel();
                self.publish(EventKind::TimerCanceled)
                    .with_state(state)
                    .with_timer(id)
                    .emit();
            }
        }
    }

    /// Reports a stale timer fire (armed id no longer present).
    pub fn note_stale_timer(&self, id: u64) {
        self.publish(EventKind::StaleTimer)
            .with_state(self.inner.current)
            .with_timer(id)
            .emit();
    }
}

/// Builder-style wrapper so `Ctx::publish` reads like `Event::now().with_*()`.
pub struct EventDraft<'a> {
    machine: &'a Machine,
    event: Event,
}

impl EventDraft<'_> {
    pub fn with_state(mut self, state: StateName) -> Self {
        self.event = self.event.with_state(state);
        self
    }

    pub fn with_signal(mut self, signal: SignalName) -> Self {
        self.event = self.event.with_signal(signal);
        self
    }

    pub fn with_step(mut self, step: impl Into<String>) -> Self {
        self.event = self.event.with_step(step);
        self
    }

    pub fn with_error(mut self, msg: impl Into<String>) -> Self {
        self.event = self.event.with_error(msg);
        self
    }

    pub fn with_timer(mut self, id: u64) -> Self {
        self.event = self.event.with_timer(id);
        self
    }

    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.event = self.event.with_timeout(d);
        self
    }

    /// Publishes the drafted event.
    pub fn emit(self) {
        self.machine.publish(self.event);
    }
}
