//! # Parallel composition (map over specifications).
//!
//! [`parallel`] runs every child specification concurrently and presents
//! their results in input order:
//!
//! ```text
//! init ──start──► running ──all children done──► ops-complete ──► completed
//!                    │                                │               failed
//!                    └── abort → forwarded to all     └── any child
//!                        still-pending children           failed/aborted
//! ```
//!
//! On `start` every child is merged with the default machine and a wiring
//! patch that reports its terminal snapshot back to the parent
//! (`op-complete` / `op-fail`), then **all** children are materialized
//! before any of them is started; a child never observes a half-built
//! sibling set. Each child starts on its own worker task; completion order
//! is non-deterministic, but the final `result` preserves input order.
//!
//! An empty child list short-circuits from `init` straight to `completed`
//! with a null result.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use crate::error::{EngineError, FailReason};
use crate::fsm::primitives::{abort_handler, base};
use crate::machine::{
    merge, ChildSnapshot, Ctx, Frame, Machine, MachineSpec, ParFrame, Signal, SignalName,
    StateDecl, StateName,
};
use crate::value::Value;

/// Runs `children` concurrently; completes with their results in input
/// order, or fails with a `failed-ops` aggregate of the child reasons.
pub fn parallel(children: impl IntoIterator<Item = MachineSpec>) -> MachineSpec {
    let children: Arc<[MachineSpec]> = children.into_iter().collect::<Vec<_>>().into();
    let spec = MachineSpec::named("parallel")
        .initial(StateName::Init)
        .state(
            StateDecl::new(StateName::Init)
                .to(StateName::Running)
                .to(StateName::Completed)
                .to(StateName::Aborted)
                .on(SignalName::Start, move |ctx: &mut Ctx<'_>, _: &Signal| {
                    start_children(ctx, &children)
                })
                .on_handler(SignalName::Abort, abort_handler()),
        )
        .state(
            StateDecl::new(StateName::Running)
                .to(StateName::OpsComplete)
                .on_entry(|ctx: &mut Ctx<'_>| {
                    let state = ctx.state();
                    let machines: Vec<Arc<Machine>> = ctx
                        .data()
                        .par_frame_mut()
                        .ok_or(EngineError::FrameMismatch { state })?
                        .machines
                        .clone();
                    for machine in machines {
                        machine.send(Signal::start());
                    }
                    Ok(())
                })
                .on(SignalName::OpComplete, |ctx: &mut Ctx<'_>, signal: &Signal| {
                    let snapshot = take_snapshot(signal)?;
                    let state = ctx.state();
                    let done = {
                        let frame = ctx
                            .data()
                            .par_frame_mut()
                            .ok_or(EngineError::FrameMismatch { state })?;
                        frame.pending.remove(&snapshot.index);
                        let index = snapshot.index;
                        frame.completed[index] = Some(snapshot);
                        frame.pending.is_empty()
                    };
                    if done {
                        ctx.transition(StateName::OpsComplete)
                    } else {
                        Ok(())
                    }
                })
                .on(SignalName::OpFail, |ctx: &mut Ctx<'_>, signal: &Signal| {
                    let snapshot = take_snapshot(signal)?;
                    let state = ctx.state();
                    let done = {
                        let frame = ctx
                            .data()
                            .par_frame_mut()
                            .ok_or(EngineError::FrameMismatch { state })?;
                        frame.pending.remove(&snapshot.index);
                        frame.failed.push(snapshot);
                        frame.pending.is_empty()
                    };
                    if done {
                        ctx.transition(StateName::OpsComplete)
                    } else {
                        Ok(())
                    }
                })
                .on(SignalName::Abort, |ctx: &mut Ctx<'_>, signal: &Signal| {
                    // Forward to every still-pending child and stay put; the
                    // children report back through op-fail.
                    let state = ctx.state();
                    let targets: Vec<Arc<Machine>> = {
                        let frame = ctx
                            .data()
                            .par_frame_mut()
                            .ok_or(EngineError::FrameMismatch { state })?;
                        frame
                            .pending
                            .iter()
                            .map(|i| frame.machines[*i].clone())
                            .collect()
                    };
                    let forward = Signal {
                        name: SignalName::Abort,
                        payload: signal.payload.clone(),
                    };
                    for target in targets {
                        target.send(forward.clone());
                    }
                    Ok(())
                }),
        )
        // ops-complete is a settle state: its entry hook fires the outcome
        // signal into the same run-to-completion drain, so no external
        // signal can observe the machine here.
        .state(
            StateDecl::new(StateName::OpsComplete)
                .to(StateName::Completed)
                .to(StateName::Failed)
                .on_entry(|ctx: &mut Ctx<'_>| {
                    let state = ctx.state();
                    let has_failures = {
                        let frame = ctx
                            .data()
                            .par_frame_mut()
                            .ok_or(EngineError::FrameMismatch { state })?;
                        !frame.failed.is_empty()
                    };
                    ctx.fire(Signal::new(if has_failures {
                        SignalName::Fail
                    } else {
                        SignalName::Complete
                    }));
                    Ok(())
                })
                .on(SignalName::Complete, |ctx: &mut Ctx<'_>, _: &Signal| {
                    let frame = pop_par_frame(ctx)?;
                    let results: Vec<Value> = frame
                        .completed
                        .into_iter()
                        .flatten()
                        .map(|s| s.result)
                        .collect();
                    ctx.data().result = Value::List(results);
                    ctx.transition(StateName::Completed)
                })
                .on(SignalName::Fail, |ctx: &mut Ctx<'_>, _: &Signal| {
                    let frame = pop_par_frame(ctx)?;
                    let reasons: Vec<FailReason> = frame
                        .failed
                        .iter()
                        .map(|s| {
                            s.fail_reason
                                .clone()
                                .unwrap_or(FailReason::User(Value::Null))
                        })
                        .collect();
                    // Results of the children that did complete; order is
                    // not part of the contract on the failure side.
                    let partial: Vec<Value> = frame
                        .completed
                        .into_iter()
                        .flatten()
                        .map(|s| s.result)
                        .collect();
                    ctx.data().result = Value::List(partial);
                    ctx.data().fail_reason = Some(FailReason::FailedOps(reasons));
                    ctx.transition(StateName::Failed)
                }),
        );
    merge([spec, base()])
}

fn start_children(ctx: &mut Ctx<'_>, children: &[MachineSpec]) -> Result<(), EngineError> {
    if children.is_empty() {
        return ctx.transition(StateName::Completed);
    }
    let parent = ctx.machine_weak();
    let mut machines = Vec::with_capacity(children.len());
    for (index, child) in children.iter().enumerate() {
        let wired = merge([child.clone(), wiring(index, parent.clone()), base()]);
        machines.push(ctx.materialize(wired)?);
    }
    let pending: HashSet<usize> = (0..children.len()).collect();
    let completed = vec![None; children.len()];
    ctx.data().op_stack.push(Frame::Par(ParFrame {
        machines,
        pending,
        completed,
        failed: Vec::new(),
    }));
    ctx.transition(StateName::Running)
}

/// Patch merged into each child: report the terminal snapshot to the
/// parent from a worker task.
fn wiring(index: usize, parent: Weak<Machine>) -> MachineSpec {
    let mut patch = MachineSpec::new();
    for (terminal, signal) in [
        (StateName::Completed, SignalName::OpComplete),
        (StateName::Failed, SignalName::OpFail),
        (StateName::TimedOut, SignalName::OpFail),
        (StateName::Aborted, SignalName::OpFail),
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

fn pop_par_frame(ctx: &mut Ctx<'_>) -> Result<ParFrame, EngineError> {
    let state = ctx.state();
    if ctx.data().par_frame_mut().is_none() {
        return Err(EngineError::FrameMismatch { state });
    }
    match ctx.data().op_stack.pop() {
        Some(Frame::Par(frame)) => Ok(frame),
        _ => Err(EngineError::FrameMismatch { state }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::primitives::result;

    #[test]
    fn parallel_declares_the_collection_graph() {
        let spec = parallel([result(1), result(2)]);
        let init = spec.state_decl(StateName::Init).unwrap();
        assert!(init.transitions.contains(&StateName::Running));
        // The empty-input short circuit needs init → completed.
        assert!(init.transitions.contains(&StateName::Completed));
        let running = spec.state_decl(StateName::Running).unwrap();
        assert!(running.handler(SignalName::OpComplete).is_some());
        assert!(running.handler(SignalName::OpFail).is_some());
        assert!(running.handler(SignalName::Abort).is_some());
    }
}
