//! # Primitive specifications.
//!
//! The atomic one- and two-state machines everything else composes:
//! [`result`], [`succeed`]/[`succeed_if`], [`fail`] and [`delay`]. All of
//! them share [`base`]: the four terminal states plus the
//! `lock-transition` and `history` features, and all of them respect
//! `abort` by entering `aborted`.

use std::sync::Arc;
use std::time::Duration;

use crate::error::{EngineError, FailReason};
use crate::machine::{
    merge, Ctx, Feature, Handler, MachineSpec, Signal, SignalName, StateDecl, StateName,
};
use crate::value::Value;

/// The default machine every combinator merges in: terminal vocabulary and
/// runtime features.
pub(crate) fn base() -> MachineSpec {
    MachineSpec::new()
        .feature(Feature::LockTransition)
        .feature(Feature::History)
        .state(StateDecl::new(StateName::Completed))
        .state(StateDecl::new(StateName::Failed))
        .state(StateDecl::new(StateName::Aborted))
        .state(StateDecl::new(StateName::TimedOut))
}

/// Shared abort handler: record the caller's reason, enter `aborted`.
pub(crate) fn abort_handler() -> Handler {
    Arc::new(|ctx: &mut Ctx<'_>, signal: &Signal| {
        ctx.data().fail_reason = Some(FailReason::Abort(signal.payload.value().cloned()));
        ctx.transition(StateName::Aborted)
    })
}

/// A machine that immediately completes with `value`.
pub fn result(value: impl Into<Value>) -> MachineSpec {
    let value = value.into();
    let spec = MachineSpec::named("result").initial(StateName::Init).state(
        StateDecl::new(StateName::Init)
            .to(StateName::Completed)
            .to(StateName::Aborted)
            .on(SignalName::Start, move |ctx: &mut Ctx<'_>, _: &Signal| {
                ctx.data().result = value.clone();
                ctx.transition(StateName::Completed)
            })
            .on_handler(SignalName::Abort, abort_handler()),
    );
    merge([spec, base()])
}

/// A machine that immediately completes (with a null result).
pub fn succeed() -> MachineSpec {
    succeed_if(true, None::<Value>)
}

/// Completes when `flag` is true, otherwise fails with `reason`.
pub fn succeed_if(flag: bool, reason: impl Into<Value>) -> MachineSpec {
    let reason = reason.into();
    let spec = MachineSpec::named("succeed").initial(StateName::Init).state(
        StateDecl::new(StateName::Init)
            .to(StateName::Completed)
            .to(StateName::Failed)
            .to(StateName::Aborted)
            .on(SignalName::Start, move |ctx: &mut Ctx<'_>, _: &Signal| {
                if flag {
                    ctx.transition(StateName::Completed)
                } else {
                    ctx.data().fail_reason = Some(FailReason::User(reason.clone()));
                    ctx.transition(StateName::Failed)
                }
            })
            .on_handler(SignalName::Abort, abort_handler()),
    );
    merge([spec, base()])
}

/// A machine that immediately fails with `reason`, propagated verbatim.
pub fn fail(reason: impl Into<Value>) -> MachineSpec {
    let reason = reason.into();
    let spec = MachineSpec::named("fail").initial(StateName::Init).state(
        StateDecl::new(StateName::Init)
            .to(StateName::Failed)
            .to(StateName::Aborted)
            .on(SignalName::Start, move |ctx: &mut Ctx<'_>, _: &Signal| {
                ctx.data().fail_reason = Some(FailReason::User(reason.clone()));
                ctx.transition(StateName::Failed)
            })
            .on_handler(SignalName::Abort, abort_handler()),
    );
    merge([spec, base()])
}

/// A machine that completes after `dur` has elapsed.
///
/// The timer is armed on entry to `running` and cancelled best-effort on
/// exit; a fire that lost the race with an abort is dropped.
pub fn delay(dur: Duration) -> MachineSpec {
    let spec = MachineSpec::named("delay")
        .initial(StateName::Init)
        .state(
            StateDecl::new(StateName::Init)
                .to(StateName::Running)
                .to(StateName::Aborted)
                .on(SignalName::Start, |ctx: &mut Ctx<'_>, _: &Signal| {
                    ctx.transition(StateName::Running)
                })
                .on_handler(SignalName::Abort, abort_handler()),
        )
        .state(
            StateDecl::new(StateName::Running)
                .to(StateName::Completed)
                .to(StateName::Aborted)
                .on_entry(move |ctx: &mut Ctx<'_>| {
                    ctx.arm_timer(dur, SignalName::TimerElapsed)?;
                    Ok(())
                })
                .on_exit(|ctx: &mut Ctx<'_>| {
                    ctx.cancel_state_timers();
                    Ok(())
                })
                .on(SignalName::TimerElapsed, |ctx: &mut Ctx<'_>, signal: &Signal| {
                    match signal.payload.timer_id() {
                        Some(id) if ctx.timer_armed(id) => ctx.transition(StateName::Completed),
                        Some(id) => {
                            ctx.note_stale_timer(id);
                            Ok(())
                        }
                        None => Err(EngineError::BadPayload {
                            signal: signal.name,
                        }),
                    }
                })
                .on_handler(SignalName::Abort, abort_handler()),
        );
    merge([spec, base()])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitives_declare_the_terminal_vocabulary() {
        for spec in [result(1), succeed(), fail("x"), delay(Duration::from_millis(1))] {
            for terminal in StateName::TERMINALS {
                assert!(
                    spec.state_decl(terminal).is_some(),
                    "{terminal} missing from {:?}",
                    spec.name
                );
            }
            assert_eq!(spec.initial, Some(StateName::Init));
            assert!(spec.features.contains(&Feature::LockTransition));
        }
    }

    #[test]
    fn fail_only_declares_failure_paths_out_of_init() {
        let spec = fail("boom");
        let init = spec.state_decl(StateName::Init).unwrap();
        assert_eq!(init.transitions, vec![StateName::Failed, StateName::Aborted]);
    }
}
