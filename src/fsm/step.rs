//! # Capture patterns and step records.
//!
//! A [`Pattern`] is a typed destructuring descriptor compiled from the
//! left-hand side of a sequence binding: it is the writer half of the
//! comprehension contract (env, result → env'), and its bound names are
//! the symbols visible to later steps. A [`StepRecord`] pairs a pattern
//! with the closure that builds the step's child specification from the
//! env, plus a debug label.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::error::OpError;
use crate::machine::MachineSpec;
use crate::value::{Env, Value};

/// Builds a step's child specification from the current env.
pub type SpecFn = Arc<dyn Fn(&Env) -> Result<MachineSpec, OpError> + Send + Sync>;

/// Computes a sequence's final result from its final env.
pub type ResultFn = Arc<dyn Fn(&Env) -> Result<Value, OpError> + Send + Sync>;

/// Destructuring descriptor for a step's result.
#[derive(Clone, Debug, PartialEq)]
pub enum Pattern {
    /// Discard the result.
    Ignore,
    /// Bind the whole result to one name.
    Bind(Cow<'static, str>),
    /// Destructure a list result element-wise.
    List(Vec<Pattern>),
}

impl Pattern {
    /// Binds the whole result to `name`.
    pub fn bind(name: impl Into<Cow<'static, str>>) -> Self {
        Pattern::Bind(name.into())
    }

    /// Discards the result.
    pub fn ignore() -> Self {
        Pattern::Ignore
    }

    /// Destructures a list result.
    pub fn list(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        Pattern::List(patterns.into_iter().collect())
    }

    /// Writes the result into the env according to this pattern.
    ///
    /// Rebinding a name shadows the prior value. A shape mismatch (list
    /// pattern against a non-list, or a length mismatch) fails.
    pub fn apply(&self, env: &mut Env, value: Value) -> Result<(), OpError> {
        match self {
            Pattern::Ignore => Ok(()),
            Pattern::Bind(name) => {
                env.set(name.clone(), value);
                Ok(())
            }
            Pattern::List(patterns) => match value {
                Value::List(items) if items.len() == patterns.len() => {
                    for (pattern, item) in patterns.iter().zip(items) {
                        pattern.apply(env, item)?;
                    }
                    Ok(())
                }
                Value::List(items) => Err(OpError::PatternMismatch {
                    detail: format!(
                        "list pattern of {} elements against list of {}",
                        patterns.len(),
                        items.len()
                    ),
                }),
                other => Err(OpError::PatternMismatch {
                    detail: format!("list pattern against {}", other.type_label()),
                }),
            },
        }
    }

    /// Names this pattern makes visible to later steps, in source order.
    pub fn names(&self) -> Vec<Cow<'static, str>> {
        let mut out = Vec::new();
        self.collect_names(&mut out);
        out
    }

    fn collect_names(&self, out: &mut Vec<Cow<'static, str>>) {
        match self {
            Pattern::Ignore => {}
            Pattern::Bind(name) => out.push(name.clone()),
            Pattern::List(patterns) => {
                for pattern in patterns {
                    pattern.collect_names(out);
                }
            }
        }
    }
}

impl From<&'static str> for Pattern {
    fn from(name: &'static str) -> Self {
        Pattern::bind(name)
    }
}

/// One binding of a sequence: capture pattern, spec builder, debug label.
#[derive(Clone)]
pub struct StepRecord {
    /// Debug name shown in events and reports.
    pub label: Cow<'static, str>,
    /// Writer half of the comprehension: binds the child's result.
    pub capture: Pattern,
    /// Builds the child specification from the env; may fail.
    pub spec_fn: SpecFn,
}

impl StepRecord {
    pub fn new<F>(
        label: impl Into<Cow<'static, str>>,
        capture: impl Into<Pattern>,
        spec_fn: F,
    ) -> Self
    where
        F: Fn(&Env) -> Result<MachineSpec, OpError> + Send + Sync + 'static,
    {
        Self {
            label: label.into(),
            capture: capture.into(),
            spec_fn: Arc::new(spec_fn),
        }
    }
}

impl fmt::Debug for StepRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepRecord")
            .field("label", &self.label)
            .field("capture", &self.capture)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_shadows_prior_binding() {
        let mut env = Env::new();
        env.set("x", 1);
        Pattern::bind("x").apply(&mut env, Value::Int(9)).unwrap();
        assert_eq!(env.get("x"), Some(&Value::Int(9)));
    }

    #[test]
    fn list_pattern_destructures_elementwise() {
        let mut env = Env::new();
        let pattern = Pattern::list([Pattern::bind("a"), Pattern::ignore(), Pattern::bind("b")]);
        pattern
            .apply(
                &mut env,
                Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            )
            .unwrap();
        assert_eq!(env.get("a"), Some(&Value::Int(1)));
        assert_eq!(env.get("b"), Some(&Value::Int(3)));
        assert!(env.get("_").is_none());
    }

    #[test]
    fn list_pattern_rejects_shape_mismatch() {
        let mut env = Env::new();
        let pattern = Pattern::list([Pattern::bind("a")]);
        assert!(matches!(
            pattern.apply(&mut env, Value::Int(1)),
            Err(OpError::PatternMismatch { .. })
        ));
        assert!(matches!(
            pattern.apply(&mut env, Value::List(vec![])),
            Err(OpError::PatternMismatch { .. })
        ));
    }

    #[test]
    fn names_are_collected_in_source_order() {
        let pattern = Pattern::list([Pattern::bind("a"), Pattern::list([Pattern::bind("b")])]);
        let names = pattern.names();
        assert_eq!(names, vec![Cow::from("a"), Cow::from("b")]);
    }
}
