//! # Sequential composition: the binding comprehension backend.
//!
//! [`Sequence`] is the builder surface for a program that runs a series of
//! specifications where each step's result becomes a named binding visible
//! to later steps:
//!
//! ```no_run
//! use opflow::{result, Sequence};
//!
//! let spec = Sequence::named("accumulate")
//!     .step("x", |_| Ok(result(1)))
//!     .step("x", |env| Ok(result(env.int("x")? + 2)))
//!     .returning_binding("x")
//!     .build();
//! ```
//!
//! `build` produces the controller machine:
//!
//! ```text
//! init ──start──► running ──step-complete──► step-completed ──run-next-step──► running
//!                    │                            │complete
//!                    │step-fail                   ▼
//!                    ▼                        completed
//!                step-failed ──fail──► failed
//! ```
//!
//! Each step's child is merged with the default machine and a wiring patch
//! that reports its terminal snapshot back to the controller from a worker
//! task (never inline, to keep lock scopes apart). A failing step
//! short-circuits the rest and the compound fails with the child's reason,
//! unmodified; errors raised by user closures during step construction or
//! capture become `exception` reasons and re-raise on `join`.

use std::borrow::Cow;
use std::sync::{Arc, Weak};

use crate::error::{EngineError, FailReason, OpError};
use crate::events::EventKind;
use crate::fsm::primitives::{abort_handler, base};
use crate::fsm::step::{Pattern, ResultFn, StepRecord};
use crate::machine::{
    merge, ChildSnapshot, Ctx, Frame, Machine, MachineSpec, SeqFrame, Signal, SignalName,
    StateDecl, StateName,
};
use crate::value::{Env, Value};

/// Builder for a sequential composition.
pub struct Sequence {
    name: Cow<'static, str>,
    steps: Vec<StepRecord>,
    env: Env,
    overall: Option<ResultFn>,
}

impl Sequence {
    /// Starts a named sequence.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
            env: Env::new(),
            overall: None,
        }
    }

    /// Seeds the initial env with a binding.
    pub fn env(mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        self.env.set(name, value);
        self
    }

    /// Adds a step: `capture ← f(env)`.
    ///
    /// `f` is evaluated against the env reflecting all previously completed
    /// steps; its error is caught and fails the compound with an
    /// `exception` reason.
    pub fn step<F>(self, capture: impl Into<Pattern>, f: F) -> Self
    where
        F: Fn(&Env) -> Result<MachineSpec, OpError> + Send + Sync + 'static,
    {
        let label = format!("step-{}", self.steps.len() + 1);
        self.step_named(label, capture, f)
    }

    /// Adds a step with an explicit debug label.
    pub fn step_named<F>(
        mut self,
        label: impl Into<Cow<'static, str>>,
        capture: impl Into<Pattern>,
        f: F,
    ) -> Self
    where
        F: Fn(&Env) -> Result<MachineSpec, OpError> + Send + Sync + 'static,
    {
        self.steps.push(StepRecord::new(label, capture, f));
        self
    }

    /// Sets the final-result closure, evaluated against the final env.
    pub fn returning<F>(mut self, f: F) -> Self
    where
        F: Fn(&Env) -> Result<Value, OpError> + Send + Sync + 'static,
    {
        self.overall = Some(Arc::new(f));
        self
    }

    /// Shorthand: the final result is the value of one binding.
    pub fn returning_binding(self, name: impl Into<Cow<'static, str>>) -> Self {
        let name = name.into();
        self.returning(move |env| env.expect(name.as_ref()).cloned())
    }

    /// Builds the controller specification.
    pub fn build(self) -> MachineSpec {
        let start_steps: Arc<[StepRecord]> = self.steps.into();
        let seed_env = self.env;
        let overall: ResultFn = self
            .overall
            .unwrap_or_else(|| Arc::new(|_: &Env| Ok(Value::Null)));

        let spec = MachineSpec::named(self.name)
            .initial(StateName::Init)
            .state(
                StateDecl::new(StateName::Init)
                    .to(StateName::Running)
                    .to(StateName::Completed)
                    .to(StateName::Failed)
                    .to(StateName::Aborted)
                    .on(SignalName::Start, move |ctx: &mut Ctx<'_>, _: &Signal| {
                        ctx.data().op_stack.push(Frame::Seq(SeqFrame {
                            env: seed_env.clone(),
                            steps: start_steps.clone(),
                            cursor: 0,
                            machines: Vec::new(),
                            capture: None,
                            overall: overall.clone(),
                        }));
                        if start_steps.is_empty() {
                            finish(ctx)
                        } else {
                            run_step(ctx)
                        }
                    })
                    .on_handler(SignalName::Abort, abort_handler()),
            )
            .state(
                StateDecl::new(StateName::Running)
                    .to(StateName::StepCompleted)
                    .to(StateName::StepFailed)
                    .to(StateName::Failed)
                    .to(StateName::Aborted)
                    .on(SignalName::StepComplete, |ctx: &mut Ctx<'_>, signal: &Signal| {
                        let snapshot = take_snapshot(signal)?;
                        let state = ctx.state();
                        let applied = {
                            let frame = ctx
                                .data()
                                .seq_frame_mut()
                                .ok_or(EngineError::FrameMismatch { state })?;
                            let pattern = frame.capture.take().unwrap_or(Pattern::Ignore);
                            pattern.apply(&mut frame.env, snapshot.result)
                        };
                        match applied {
                            Ok(()) => ctx.transition(StateName::StepCompleted),
                            Err(err) => {
                                ctx.data().fail_reason =
                                    Some(FailReason::Exception(Arc::new(err)));
                                ctx.transition(StateName::Failed)
                            }
                        }
                    })
                    .on(SignalName::StepFail, |ctx: &mut Ctx<'_>, signal: &Signal| {
                        let snapshot = take_snapshot(signal)?;
                        // Propagate the child's reason unmodified.
                        ctx.data().fail_reason = Some(
                            snapshot
                                .fail_reason
                                .unwrap_or(FailReason::User(Value::Null)),
                        );
                        ctx.transition(StateName::StepFailed)
                    })
                    .on(SignalName::StepAbort, |ctx: &mut Ctx<'_>, signal: &Signal| {
                        let snapshot = take_snapshot(signal)?;
                        let _ = pop_seq_frame(ctx)?;
                        ctx.data().fail_reason =
                            Some(snapshot.fail_reason.unwrap_or(FailReason::Abort(None)));
                        ctx.transition(StateName::Aborted)
                    })
                    .on(SignalName::Abort, |ctx: &mut Ctx<'_>, signal: &Signal| {
                        // Forward to the live child; it reports back through
                        // step-abort. With no live child, terminate directly.
                        let state = ctx.state();
                        let target: Option<Arc<Machine>> = {
                            let frame = ctx
                                .data()
                                .seq_frame_mut()
                                .ok_or(EngineError::FrameMismatch { state })?;
                            frame
                                .machines
                                .iter()
                                .rev()
                                .find(|m| {
                                    m.state().map(|s| !s.is_terminal()).unwrap_or(false)
                                })
                                .cloned()
                        };
                        match target {
                            Some(child) => {
                                child.send(Signal {
                                    name: SignalName::Abort,
                                    payload: signal.payload.clone(),
                                });
                                Ok(())
                            }
                            None => {
                                let _ = pop_seq_frame(ctx)?;
                                ctx.data().fail_reason =
                                    Some(FailReason::Abort(signal.payload.value().cloned()));
                                ctx.transition(StateName::Aborted)
                            }
                        }
                    }),
            )
            // step-completed and step-failed are settle states: the entry
            // hook fires the next signal into the same run-to-completion
            // drain, so no external signal can observe the machine here.
            .state(
                StateDecl::new(StateName::StepCompleted)
                    .to(StateName::Running)
                    .to(StateName::Completed)
                    .to(StateName::Failed)
                    .on_entry(|ctx: &mut Ctx<'_>| {
                        let state = ctx.state();
                        let more = {
                            let frame = ctx
                                .data()
                                .seq_frame_mut()
                                .ok_or(EngineError::FrameMismatch { state })?;
                            frame.cursor < frame.steps.len()
                        };
                        ctx.fire(Signal::new(if more {
                            SignalName::RunNextStep
                        } else {
                            SignalName::Complete
                        }));
                        Ok(())
                    })
                    .on(SignalName::RunNextStep, |ctx: &mut Ctx<'_>, _: &Signal| run_step(ctx))
                    .on(SignalName::Complete, |ctx: &mut Ctx<'_>, _: &Signal| finish(ctx)),
            )
            .state(
                StateDecl::new(StateName::StepFailed)
                    .to(StateName::Failed)
                    .on_entry(|ctx: &mut Ctx<'_>| {
                        ctx.fire(Signal::new(SignalName::Fail));
                        Ok(())
                    })
                    .on(SignalName::Fail, |ctx: &mut Ctx<'_>, _: &Signal| {
                        let _ = pop_seq_frame(ctx)?;
                        ctx.transition(StateName::Failed)
                    }),
            );
        merge([spec, base()])
    }
}

/// Starts the step at the frame cursor: build the child spec (catching
/// user errors), wire it to the controller, start it on a worker task.
fn run_step(ctx: &mut Ctx<'_>) -> Result<(), EngineError> {
    let state = ctx.state();
    let (step, env, index) = {
        let frame = ctx
            .data()
            .seq_frame_mut()
            .ok_or(EngineError::FrameMismatch { state })?;
        (frame.steps[frame.cursor].clone(), frame.env.clone(), frame.cursor)
    };
    ctx.publish(EventKind::StepStarted)
        .with_step(step.label.to_string())
        .emit();
    match (*step.spec_fn)(&env) {
        Err(err) => {
            ctx.data().fail_reason = Some(FailReason::Exception(Arc::new(err)));
            ctx.transition(StateName::Failed)
        }
        Ok(child_spec) => {
            let wired = merge([child_spec, wiring(index, ctx.machine_weak()), base()]);
            let child = ctx.materialize(wired)?;
            {
                let frame = ctx
                    .data()
                    .seq_frame_mut()
                    .ok_or(EngineError::FrameMismatch { state })?;
                frame.cursor += 1;
                frame.capture = Some(step.capture.clone());
                frame.machines.push(child.clone());
            }
            child.send(Signal::start());
            ctx.transition(StateName::Running)
        }
    }
}

/// Evaluates the overall-result closure against the final env and
/// terminates the controller.
fn finish(ctx: &mut Ctx<'_>) -> Result<(), EngineError> {
    let frame = pop_seq_frame(ctx)?;
    match (*frame.overall)(&frame.env) {
        Ok(value) => {
            ctx.data().result = value;
            ctx.transition(StateName::Completed)
        }
        Err(err) => {
            ctx.data().fail_reason = Some(FailReason::Exception(Arc::new(err)));
            ctx.transition(StateName::Failed)
        }
    }
}

/// Patch merged into each step child: report the terminal snapshot to the
/// controller from a worker task.
fn wiring(index: usize, parent: Weak<Machine>) -> MachineSpec {
    let mut patch = MachineSpec::new();
    for (terminal, signal) in [
        (StateName::Completed, SignalName::StepComplete),
        (StateName::Failed, SignalName::StepFail),
        (StateName::TimedOut, SignalName::StepFail),
        (StateName::Aborted, SignalName::StepAbort),
    ] {
        let parent = parent.clone();
        patch = patch.state(StateDecl::new(terminal).on_entry(move |ctx: &mut Ctx<'_>| {
            let snapshot = ChildSnapshot {
                index,
                state: ctx.state(),
                result: ctx.data().result.clone(),
                fail_reason: ctx.data().fail_reason.clone(),
            };
            if let Some(parent) = parent.upgrade() {
                parent.send(Signal::new(signal).with_snapshot(snapshot));
            }
            Ok(())
        }));
    }
    patch
}

fn take_snapshot(signal: &Signal) -> Result<ChildSnapshot, EngineError> {
    signal
        .payload
        .snapshot()
        .cloned()
        .ok_or(EngineError::BadPayload {
            signal: signal.name,
        })
}

fn pop_seq_frame(ctx: &mut Ctx<'_>) -> Result<SeqFrame, EngineError> {
    let state = ctx.state();
    if ctx.data().seq_frame_mut().is_none() {
        return Err(EngineError::FrameMismatch { state });
    }
    match ctx.data().op_stack.pop() {
        Some(Frame::Seq(frame)) => Ok(frame),
        _ => Err(EngineError::FrameMismatch { state }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::primitives::result;

    #[test]
    fn controller_declares_the_stepping_graph() {
        let spec = Sequence::named("s")
            .step("x", |_| Ok(result(1)))
            .returning_binding("x")
            .build();
        let running = spec.state_decl(StateName::Running).unwrap();
        assert!(running.transitions.contains(&StateName::StepCompleted));
        assert!(running.transitions.contains(&StateName::StepFailed));
        let stepped = spec.state_decl(StateName::StepCompleted).unwrap();
        assert!(stepped.transitions.contains(&StateName::Running));
        assert!(stepped.transitions.contains(&StateName::Completed));
        let failed = spec.state_decl(StateName::StepFailed).unwrap();
        assert_eq!(failed.transitions, vec![StateName::Failed]);
    }
}
