//! # The specification algebra.
//!
//! Constructors for the primitive machines and the higher-order
//! combinators that compose them while preserving the terminal vocabulary:
//!
//! | Constructor | Behavior |
//! |---|---|
//! | [`result`] | completes immediately with a value |
//! | [`succeed`] / [`succeed_if`] | completes or fails on a flag |
//! | [`fail`] | fails immediately with a verbatim reason |
//! | [`delay`] | completes after a duration |
//! | [`timeout`] | per-state budget over a wrapped spec |
//! | [`parallel`] | map over specs, results in input order |
//! | [`Sequence`] | binding comprehension over steps |
//! | [`reduce`] | fold threading an accumulator binding |
//!
//! Every constructor returns a pure [`MachineSpec`](crate::MachineSpec);
//! nothing runs until [`Engine::operate`](crate::Engine::operate).

mod parallel;
pub(crate) mod primitives;
mod reduce;
mod sequence;
pub mod step;
mod timeout;

pub use parallel::parallel;
pub use primitives::{delay, fail, result, succeed, succeed_if};
pub use reduce::reduce;
pub use sequence::Sequence;
pub use step::{Pattern, StepRecord};
pub use timeout::timeout;
