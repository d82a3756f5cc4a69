//! # Dynamic values and binding environments.
//!
//! Operations carry their results and environment bindings as [`Value`]s, a
//! small owned dynamic type. A [`Sequence`](crate::Sequence) threads an
//! [`Env`] through its steps: each step's capture pattern writes bindings
//! into the env, and later step closures read them back with the typed
//! accessors (`int`, `str_`, `list`).

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::OpError;

/// Owned dynamic value used for results, env bindings, and fail reasons.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum Value {
    /// Absence of a value; the result of an operation that produced nothing.
    #[default]
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    /// Returns the integer payload, if this is an `Int`.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns the string payload, if this is a `Str`.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the list payload, if this is a `List`.
    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Short type label for diagnostics.
    pub fn type_label(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Map(_) => "map",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{k}: {v}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n.into())
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

/// Name → value bindings visible to the steps of a sequence.
///
/// Backed by an ordered map so reports render bindings deterministically.
/// Rebinding a name shadows the prior value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Env {
    bindings: BTreeMap<Cow<'static, str>, Value>,
}

impl Env {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a binding.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings.get(name)
    }

    /// Looks up a binding, failing with [`OpError::MissingBinding`] if absent.
    pub fn expect(&self, name: &str) -> Result<&Value, OpError> {
        self.get(name).ok_or_else(|| OpError::MissingBinding {
            name: name.to_string(),
        })
    }

    /// Reads an integer binding.
    pub fn int(&self, name: &str) -> Result<i64, OpError> {
        let v = self.expect(name)?;
        v.as_int().ok_or_else(|| OpError::WrongType {
            name: name.to_string(),
            expected: "int",
            found: v.type_label(),
        })
    }

    /// Reads a string binding.
    pub fn str_(&self, name: &str) -> Result<&str, OpError> {
        let v = self.expect(name)?;
        v.as_str().ok_or_else(|| OpError::WrongType {
            name: name.to_string(),
            expected: "str",
            found: v.type_label(),
        })
    }

    /// Reads a list binding.
    pub fn list(&self, name: &str) -> Result<&[Value], OpError> {
        let v = self.expect(name)?;
        v.as_list().ok_or_else(|| OpError::WrongType {
            name: name.to_string(),
            expected: "list",
            found: v.type_label(),
        })
    }

    /// Inserts a binding, shadowing any prior value under the same name.
    pub fn set(&mut self, name: impl Into<Cow<'static, str>>, value: impl Into<Value>) {
        self.bindings.insert(name.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.bindings.iter().map(|(k, v)| (k.as_ref(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_shadows_on_rebind() {
        let mut env = Env::new();
        env.set("x", 1);
        env.set("x", 2);
        assert_eq!(env.get("x"), Some(&Value::Int(2)));
        assert_eq!(env.len(), 1);
    }

    #[test]
    fn typed_getters_reject_mismatches() {
        let mut env = Env::new();
        env.set("name", "alice");
        assert_eq!(env.str_("name").unwrap(), "alice");
        assert!(matches!(
            env.int("name"),
            Err(OpError::WrongType { expected: "int", .. })
        ));
        assert!(matches!(
            env.int("missing"),
            Err(OpError::MissingBinding { .. })
        ));
    }

    #[test]
    fn value_renders_compactly() {
        let v = Value::List(vec![Value::Int(1), Value::Str("a".into()), Value::Null]);
        assert_eq!(v.to_string(), r#"[1, "a", null]"#);
    }
}
