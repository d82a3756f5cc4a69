//! # Declarative machine specifications.
//!
//! A [`MachineSpec`] is a pure value: a set of named states with declared
//! valid transitions, optional entry/exit hook chains, per-signal handlers,
//! feature flags, an initial state and seed data. Specifications are built
//! with the fluent [`StateDecl`] builder, combined with
//! [`merge`](crate::machine::merge::merge), and freely cloned and shared:
//! the same child spec may be composed many times; the runtime materializes
//! one [`Machine`](crate::machine::Machine) instance per reference.

use std::borrow::Cow;
use std::sync::Arc;

use crate::error::EngineError;
use crate::machine::data::StateData;
use crate::machine::instance::Ctx;
use crate::machine::signal::Signal;
use crate::machine::state::{Feature, SignalName, StateName};

/// Entry/exit hook run when a state is entered or exited.
///
/// Hooks declared by several merged specifications form a *guarded chain*:
/// if a hook performs a state change, the rest of the chain is skipped.
pub type Hook = Arc<dyn Fn(&mut Ctx<'_>) -> Result<(), EngineError> + Send + Sync>;

/// Per-state signal handler.
///
/// Runs under the machine's transition lock; may mutate state data, request
/// transitions and fire follow-up signals through the [`Ctx`].
pub type Handler = Arc<dyn Fn(&mut Ctx<'_>, &Signal) -> Result<(), EngineError> + Send + Sync>;

/// Declaration of one state: valid successors, hooks and handlers.
#[derive(Clone)]
pub struct StateDecl {
    pub name: StateName,
    /// Declared valid outgoing transitions.
    pub transitions: Vec<StateName>,
    /// Entry hook chain (guarded).
    pub on_entry: Vec<Hook>,
    /// Exit hook chain (guarded).
    pub on_exit: Vec<Hook>,
    /// Per-signal handlers; merging is last-writer-wins per signal.
    pub handlers: Vec<(SignalName, Handler)>,
}

impl StateDecl {
    pub fn new(name: StateName) -> Self {
        Self {
            name,
            transitions: Vec::new(),
            on_entry: Vec::new(),
            on_exit: Vec::new(),
            handlers: Vec::new(),
        }
    }

    /// Declares a valid transition out of this state.
    pub fn to(mut self, target: StateName) -> Self {
        if !self.transitions.contains(&target) {
            self.transitions.push(target);
        }
        self
    }

    /// Appends an entry hook.
    pub fn on_entry<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Ctx<'_>) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        self.on_entry.push(Arc::new(hook));
        self
    }

    /// Appends an exit hook.
    pub fn on_exit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&mut Ctx<'_>) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        self.on_exit.push(Arc::new(hook));
        self
    }

    /// Installs a handler for a signal, replacing any prior one.
    pub fn on<F>(mut self, signal: SignalName, handler: F) -> Self
    where
        F: Fn(&mut Ctx<'_>, &Signal) -> Result<(), EngineError> + Send + Sync + 'static,
    {
        self.put_handler(signal, Arc::new(handler));
        self
    }

    /// Installs an already-wrapped handler, replacing any prior one.
    pub fn on_handler(mut self, signal: SignalName, handler: Handler) -> Self {
        self.put_handler(signal, handler);
        self
    }

    fn put_handler(&mut self, signal: SignalName, handler: Handler) {
        match self.handlers.iter().position(|(s, _)| *s == signal) {
            Some(i) => self.handlers[i].1 = handler,
            None => self.handlers.push((signal, handler)),
        }
    }

    /// Looks up the handler for a signal.
    pub fn handler(&self, signal: SignalName) -> Option<&Handler> {
        self.handlers
            .iter()
            .find(|(s, _)| *s == signal)
            .map(|(_, h)| h)
    }
}

/// Pure, cloneable description of a machine.
#[derive(Clone, Default)]
pub struct MachineSpec {
    /// Optional name, surfaced in events and reports.
    pub name: Option<Cow<'static, str>>,
    /// Initial state; required to materialize.
    pub initial: Option<StateName>,
    /// Requested runtime features.
    pub features: Vec<Feature>,
    /// State declarations, in declaration order.
    pub states: Vec<StateDecl>,
    /// Seed state data for materialization.
    pub seed: Option<StateData>,
}

impl MachineSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Sets the initial state.
    pub fn initial(mut self, state: StateName) -> Self {
        self.initial = Some(state);
        self
    }

    /// Requests a runtime feature.
    pub fn feature(mut self, feature: Feature) -> Self {
        if !self.features.contains(&feature) {
            self.features.push(feature);
        }
        self
    }

    /// Adds (or extends) a state declaration.
    pub fn state(mut self, decl: StateDecl) -> Self {
        self.states.push(decl);
        self
    }

    /// Sets the seed state data.
    pub fn seed(mut self, data: StateData) -> Self {
        self.seed = Some(data);
        self
    }

    /// Names of all declared states, in declaration order.
    pub fn state_names(&self) -> impl Iterator<Item = StateName> + '_ {
        self.states.iter().map(|d| d.name)
    }

    /// Looks up a state declaration by name.
    pub fn state_decl(&self, name: StateName) -> Option<&StateDecl> {
        self.states.iter().find(|d| d.name == name)
    }
}
