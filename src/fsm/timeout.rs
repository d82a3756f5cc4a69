//! # Per-state timeout wrapper.
//!
//! [`timeout`] merges an entry/exit hook pair onto every non-terminal
//! state of the wrapped specification:
//!
//! - **entry**: arm a one-shot timer under a freshly-minted id; if it
//!   fires while the state is still current, the machine moves to `failed`
//!   with a `timed-out` reason;
//! - **exit**: cancel and forget the timer, best effort. A timer that
//!   already fired delivers a stale signal, which the armed-id check turns
//!   into a no-op.
//!
//! The budget is *per state*, not per operation: any transition clears it
//! and entering the next state rearms it. This composes with `sequence`,
//! where each step gets its own budget; callers wanting an end-to-end
//! budget wrap the outer sequence itself.

use std::time::Duration;

use crate::error::{EngineError, FailReason};
use crate::machine::{merge, Ctx, MachineSpec, Signal, SignalName, StateDecl, StateName};

/// Wraps `child` so that staying in any one state longer than `dur` fails
/// the operation with a `timed-out` reason.
pub fn timeout(child: MachineSpec, dur: Duration) -> MachineSpec {
    let mut patch = MachineSpec::new();
    let guarded: Vec<StateName> = child.state_names().filter(|s| !s.is_terminal()).collect();
    for state in guarded {
        patch = patch.state(
            StateDecl::new(state)
                .to(StateName::Failed)
                .on_entry(move |ctx: &mut Ctx<'_>| {
                    ctx.arm_timer(dur, SignalName::TimeoutFired)?;
                    Ok(())
                })
                .on_exit(|ctx: &mut Ctx<'_>| {
                    ctx.cancel_state_timers();
                    Ok(())
                })
                .on(SignalName::TimeoutFired, |ctx: &mut Ctx<'_>, signal: &Signal| {
                    match signal.payload.timer_id() {
                        Some(id) if ctx.timer_armed(id) => {
                            ctx.data().fail_reason = Some(FailReason::TimedOut);
                            ctx.transition(StateName::Failed)
                        }
                        Some(id) => {
                            ctx.note_stale_timer(id);
                            Ok(())
                        }
                        None => Err(EngineError::BadPayload {
                            signal: signal.name,
                        }),
                    }
                }),
        );
    }
    merge([child, patch])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fsm::primitives::delay;

    #[test]
    fn every_nonterminal_state_gains_a_failed_transition() {
        let wrapped = timeout(delay(Duration::from_millis(10)), Duration::from_millis(5));
        for state in [StateName::Init, StateName::Running] {
            let decl = wrapped.state_decl(state).unwrap();
            assert!(decl.transitions.contains(&StateName::Failed), "{state}");
            assert!(decl.handler(SignalName::TimeoutFired).is_some(), "{state}");
        }
        for terminal in StateName::TERMINALS {
            let decl = wrapped.state_decl(terminal).unwrap();
            assert!(decl.handler(SignalName::TimeoutFired).is_none(), "{terminal}");
        }
    }

    #[test]
    fn wrapped_hooks_run_before_the_timer_hooks() {
        let wrapped = timeout(delay(Duration::from_millis(10)), Duration::from_millis(5));
        let running = wrapped.state_decl(StateName::Running).unwrap();
        // delay's own arm hook first, then the wrapper's.
        assert_eq!(running.on_entry.len(), 2);
        assert_eq!(running.on_exit.len(), 2);
    }
}
