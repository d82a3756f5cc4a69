//! # The specification merge algebra.
//!
//! Merging combines several specifications for the same abstract machine:
//!
//! - **Transitions**: union across all inputs.
//! - **Features**: concatenation, de-duplicated.
//! - **Entry/exit hooks**: concatenated into a *guarded chain*: at
//!   runtime, a hook that performs a state change short-circuits the rest
//!   of the chain. This lets a wrapper (e.g. `timeout`) add a hook without
//!   clobbering the wrapped machine's hook while still letting the wrapped
//!   machine win when it actively transitions.
//! - **Handlers**: last writer wins per (state, signal).
//! - **Name / initial state / seed data**: first non-null wins in
//!   declaration order.
//!
//! Merging never observes specification identity, so the same spec value
//! may participate in many merges.

use crate::machine::spec::{MachineSpec, StateDecl};

/// Merges specifications in declaration order.
pub fn merge<I>(specs: I) -> MachineSpec
where
    I: IntoIterator<Item = MachineSpec>,
{
    let mut out = MachineSpec::new();
    for spec in specs {
        if out.name.is_none() {
            out.name = spec.name;
        }
        if out.initial.is_none() {
            out.initial = spec.initial;
        }
        if out.seed.is_none() {
            out.seed = spec.seed;
        }
        for feature in spec.features {
            if !out.features.contains(&feature) {
                out.features.push(feature);
            }
        }
        for decl in spec.states {
            merge_state(&mut out.states, decl);
        }
    }
    out
}

fn merge_state(states: &mut Vec<StateDecl>, incoming: StateDecl) {
    let Some(position) = states.iter().position(|d| d.name == incoming.name) else {
        states.push(incoming);
        return;
    };
    let existing = &mut states[position];
    for target in incoming.transitions {
        if !existing.transitions.contains(&target) {
            existing.transitions.push(target);
        }
    }
    existing.on_entry.extend(incoming.on_entry);
    existing.on_exit.extend(incoming.on_exit);
    for (signal, handler) in incoming.handlers {
        match existing.handlers.iter().position(|(s, _)| *s == signal) {
            Some(i) => existing.handlers[i].1 = handler,
            None => existing.handlers.push((signal, handler)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::machine::instance::Ctx;
    use crate::machine::signal::Signal;
    use crate::machine::state::{Feature, SignalName, StateName};

    #[test]
    fn transitions_union_without_duplicates() {
        let a = MachineSpec::new().state(
            StateDecl::new(StateName::Init)
                .to(StateName::Running)
                .to(StateName::Aborted),
        );
        let b = MachineSpec::new().state(
            StateDecl::new(StateName::Init)
                .to(StateName::Running)
                .to(StateName::Failed),
        );
        let merged = merge([a, b]);
        let decl = merged.state_decl(StateName::Init).unwrap();
        assert_eq!(
            decl.transitions,
            vec![StateName::Running, StateName::Aborted, StateName::Failed]
        );
    }

    #[test]
    fn first_non_null_name_and_initial_win() {
        let a = MachineSpec::new().initial(StateName::Init);
        let b = MachineSpec::named("later").initial(StateName::Running);
        let merged = merge([a, b]);
        assert_eq!(merged.initial, Some(StateName::Init));
        assert_eq!(merged.name.as_deref(), Some("later"));
    }

    #[test]
    fn features_deduplicate() {
        let a = MachineSpec::new()
            .feature(Feature::LockTransition)
            .feature(Feature::History);
        let b = MachineSpec::new().feature(Feature::LockTransition);
        let merged = merge([a, b]);
        assert_eq!(
            merged.features,
            vec![Feature::LockTransition, Feature::History]
        );
    }

    #[test]
    fn hooks_concatenate_and_last_handler_wins() {
        let a = MachineSpec::new().state(
            StateDecl::new(StateName::Init)
                .on_entry(|_: &mut Ctx<'_>| Ok(()))
                .on(SignalName::Start, |_: &mut Ctx<'_>, _: &Signal| Ok(())),
        );
        let b = MachineSpec::new().state(
            StateDecl::new(StateName::Init)
                .on_entry(|_: &mut Ctx<'_>| Ok(()))
                .on(SignalName::Start, |_: &mut Ctx<'_>, _: &Signal| Ok(())),
        );
        let merged = merge([a, b]);
        let decl = merged.state_decl(StateName::Init).unwrap();
        assert_eq!(decl.on_entry.len(), 2);
        assert_eq!(decl.handlers.len(), 1);
    }

    #[test]
    fn disjoint_states_are_both_kept() {
        let a = MachineSpec::new().state(StateDecl::new(StateName::Init));
        let b = MachineSpec::new().state(StateDecl::new(StateName::Completed));
        let merged = merge([a, b]);
        assert_eq!(merged.states.len(), 2);
    }
}
