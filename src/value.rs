// ABOUTME: The runtime value universe shared by the environment and evaluator

use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock};

use crate::ast::Stmt;
use crate::env::Env;
use crate::error::RuntimeError;

/// A value reachable from script code or passed across the host boundary.
///
/// Sequences, maps, user functions and host values are `Arc`-wrapped rather
/// than `Rc`-wrapped because an `Env` (and everything reachable through it)
/// must be `Send + Sync`: `Execute` can be called from many threads against
/// the same root environment while another thread calls `Interrupt`.
#[derive(Clone)]
pub enum Value {
    Invalid,
    Nil,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Str(Arc<str>),
    Seq(Arc<RwLock<Vec<Value>>>),
    Map(Arc<RwLock<Vec<(Value, Value)>>>),
    Func(Arc<UserFunc>),
    HostFunc(Arc<HostFunc>),
    Host(Arc<HostValue>),
}

pub struct UserFunc {
    pub name: Option<String>,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub closure: Env,
}

pub type HostFn = dyn Fn(&[Value]) -> Result<Value, RuntimeError> + Send + Sync;

pub struct HostFunc {
    pub name: String,
    pub arity: Option<usize>,
    pub func: Box<HostFn>,
}

/// An opaque host object exposed to scripts via `Env::define_type`.
///
/// `type_name` drives member/index dispatch in the evaluator; `payload`
/// carries the actual host data, downcastable via `Any` on the host side.
pub struct HostValue {
    pub type_name: String,
    pub payload: Box<dyn Any + Send + Sync>,
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Invalid => "invalid",
            Value::Nil => "nil",
            Value::Bool(_) => "bool",
            Value::Int32(_) => "int32",
            Value::Int64(_) => "int64",
            Value::Float32(_) => "float32",
            Value::Float64(_) => "float64",
            Value::Str(_) => "string",
            Value::Seq(_) => "array",
            Value::Map(_) => "map",
            Value::Func(_) | Value::HostFunc(_) => "func",
            Value::Host(_) => "host",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Invalid | Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int32(n) => *n != 0,
            Value::Int64(n) => *n != 0,
            Value::Float32(n) => *n != 0.0,
            Value::Float64(n) => *n != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::Seq(s) => !s.read().unwrap().is_empty(),
            Value::Map(m) => !m.read().unwrap().is_empty(),
            Value::Func(_) | Value::HostFunc(_) | Value::Host(_) => true,
        }
    }

    pub fn str(s: impl Into<Arc<str>>) -> Value {
        Value::Str(s.into())
    }

    pub fn seq(items: Vec<Value>) -> Value {
        Value::Seq(Arc::new(RwLock::new(items)))
    }

    pub fn map(pairs: Vec<(Value, Value)>) -> Value {
        Value::Map(Arc::new(RwLock::new(pairs)))
    }

    /// Numeric promotion rank used to pick a common type for `+`/comparisons:
    /// int32 < int64 < float32 < float64.
    pub fn numeric_rank(&self) -> Option<u8> {
        match self {
            Value::Int32(_) => Some(0),
            Value::Int64(_) => Some(1),
            Value::Float32(_) => Some(2),
            Value::Float64(_) => Some(3),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int32(n) => Some(*n as f64),
            Value::Int64(n) => Some(*n as f64),
            Value::Float32(n) => Some(*n as f64),
            Value::Float64(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Invalid => write!(f, "<invalid>"),
            Value::Nil => write!(f, "nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int32(n) => write!(f, "{}", n),
            Value::Int64(n) => write!(f, "{}", n),
            Value::Float32(n) => write!(f, "{}", n),
            Value::Float64(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Seq(s) => {
                let items = s.read().unwrap();
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                let pairs = m.read().unwrap();
                write!(f, "{{")?;
                for (i, (k, v)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Func(func) => write!(f, "<func {}>", func.name.as_deref().unwrap_or("anonymous")),
            Value::HostFunc(func) => write!(f, "<host func {}>", func.name),
            Value::Host(h) => write!(f, "<host {}>", h.type_name),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Invalid, Value::Invalid) => true,
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (a, b) if a.numeric_rank().is_some() && b.numeric_rank().is_some() => {
                a.as_f64() == b.as_f64()
            }
            (Value::Seq(a), Value::Seq(b)) => *a.read().unwrap() == *b.read().unwrap(),
            (Value::Map(a), Value::Map(b)) => *a.read().unwrap() == *b.read().unwrap(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name() {
        assert_eq!(Value::Int32(1).type_name(), "int32");
        assert_eq!(Value::str("hi").type_name(), "string");
        assert_eq!(Value::Nil.type_name(), "nil");
    }

    #[test]
    fn test_truthiness() {
        assert!(!Value::Nil.is_truthy());
        assert!(!Value::Int32(0).is_truthy());
        assert!(Value::Int32(1).is_truthy());
        assert!(!Value::str("").is_truthy());
        assert!(Value::str("x").is_truthy());
    }

    #[test]
    fn test_numeric_equality_across_ranks() {
        assert_eq!(Value::Int32(2), Value::Float64(2.0));
        assert_ne!(Value::Int32(2), Value::Float64(2.5));
    }

    #[test]
    fn test_display_formats_sequence() {
        let v = Value::seq(vec![Value::Int32(1), Value::str("a")]);
        assert_eq!(format!("{}", v), "[1, a]");
    }

    #[test]
    fn test_value_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Value>();
    }
}
