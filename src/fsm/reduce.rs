//! # Fold over a sequence of inputs.
//!
//! [`reduce`] is re-expressed as a [`Sequence`] threading a reserved
//! accumulator binding: step *i* reads the accumulator, invokes
//! `f(acc, items[i])` to obtain the step's child specification, and on
//! success rebinds the accumulator to that child's result. The compound's
//! final result is the accumulator after the last step, or `init` when
//! `items` is empty.

use std::sync::Arc;

use crate::error::OpError;
use crate::fsm::sequence::Sequence;
use crate::fsm::step::Pattern;
use crate::machine::MachineSpec;
use crate::value::Value;

/// Reserved per-scope accumulator binding. The `%` prefix keeps it out of
/// the user namespace.
const ACC: &str = "%acc";

/// Folds `items` with `f`, starting from `init`.
///
/// `f` receives the current accumulator and one item and returns the
/// specification whose result becomes the next accumulator.
pub fn reduce<F>(
    f: F,
    init: impl Into<Value>,
    items: impl IntoIterator<Item = Value>,
) -> MachineSpec
where
    F: Fn(&Value, &Value) -> Result<MachineSpec, OpError> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    let mut seq = Sequence::named("reduce").env(ACC, init);
    for (index, item) in items.into_iter().enumerate() {
        let f = Arc::clone(&f);
        seq = seq.step_named(
            format!("reduce-{index}"),
            Pattern::bind(ACC),
            move |env| (*f)(env.expect(ACC)?, &item),
        );
    }
    seq.returning_binding(ACC).build()
}
