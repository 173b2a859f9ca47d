use std::fmt;
use std::sync::Arc;
use serde::ser::{Error as _, Serialize, SerializeMap, Serializer};
use super::error::Error;
use super::promise::{Complete, Promise, Status};

/// Anything a promise can be fulfilled or rejected with.
#[derive(Clone)]
pub enum Value {
    Data(serde_json::Value),
    List(Vec<Value>),
    Outcome(Box<Outcome>),
    Promise(Promise),
    Foreign(Arc<dyn Thenable>),
    Error(Arc<anyhow::Error>),
}

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Fulfilled(Value),
    Rejected(Value),
}

/// An object from outside this engine that follows the `then` convention.
///
/// Implementations may misbehave: call both callbacks, call them more
/// than once, or fail after calling one. Only the first completion is
/// honored.
pub trait Thenable: Send + Sync + 'static {
    /// Reads the `then` member.
    fn lookup(&self) -> Result<Member, Value> {
        Ok(Member::Callable)
    }

    /// Invokes `then` with this object as the receiver.
    fn call(&self, resolve: Complete, reject: Complete) -> Result<(), Value>;
}

/// What reading a `then` member produced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Member {
    Callable,
    NotCallable,
}

pub(crate) enum Kind {
    Plain,
    Foreign(Arc<dyn Thenable>),
    Native(Promise),
}

impl Value {
    pub fn null() -> Self {
        Value::Data(serde_json::Value::Null)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Data(serde_json::Value::Null))
    }

    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Value::Data(data) => Some(data),
            _                 => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(list) => Some(list),
            _                 => None,
        }
    }

    pub fn as_promise(&self) -> Option<&Promise> {
        match self {
            Value::Promise(promise) => Some(promise),
            _                       => None,
        }
    }

    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        match self {
            Value::Error(e) => e.downcast_ref::<E>(),
            _               => None,
        }
    }

    pub(crate) fn kind(&self) -> Result<Kind, Value> {
        match self {
            Value::Promise(promise) => Ok(Kind::Native(promise.clone())),
            Value::Foreign(object)  => match object.lookup()? {
                Member::Callable    => Ok(Kind::Foreign(object.clone())),
                Member::NotCallable => Ok(Kind::Plain),
            },
            Value::Data(_) | Value::List(_) | Value::Outcome(_) | Value::Error(_) => Ok(Kind::Plain),
        }
    }
}

impl Outcome {
    pub fn status(&self) -> Status {
        match self {
            Outcome::Fulfilled(_) => Status::Fulfilled,
            Outcome::Rejected(_)  => Status::Rejected,
        }
    }

    pub fn into_result(self) -> Result<Value, Value> {
        match self {
            Outcome::Fulfilled(value) => Ok(value),
            Outcome::Rejected(reason) => Err(reason),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Data(a),    Value::Data(b))    => a == b,
            (Value::List(a),    Value::List(b))    => a == b,
            (Value::Outcome(a), Value::Outcome(b)) => a == b,
            (Value::Promise(a), Value::Promise(b)) => a.ptr_eq(b),
            (Value::Foreign(a), Value::Foreign(b)) => {
                Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
            }
            (Value::Error(a),   Value::Error(b))   => {
                Arc::ptr_eq(a, b) || a.to_string() == b.to_string()
            }
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Data(data)       => write!(f, "{data}"),
            Value::List(list)       => f.debug_list().entries(list).finish(),
            Value::Outcome(outcome) => fmt::Debug::fmt(outcome, f),
            Value::Promise(promise) => fmt::Debug::fmt(promise, f),
            Value::Foreign(_)       => f.write_str("Thenable"),
            Value::Error(e)         => write!(f, "Error({e:#})"),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Data(data)       => data.serialize(serializer),
            Value::List(list)       => list.serialize(serializer),
            Value::Outcome(outcome) => outcome.serialize(serializer),
            Value::Error(e)         => serializer.serialize_str(&format!("{e:#}")),
            Value::Promise(_) | Value::Foreign(_) => {
                Err(S::Error::custom(Error::NotSerializable))
            }
        }
    }
}

impl Serialize for Outcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        match self {
            Outcome::Fulfilled(value) => {
                map.serialize_entry("status", "fulfilled")?;
                map.serialize_entry("value", value)?;
            }
            Outcome::Rejected(reason) => {
                map.serialize_entry("status", "rejected")?;
                map.serialize_entry("reason", reason)?;
            }
        }
        map.end()
    }
}

impl From<serde_json::Value> for Value {
    fn from(data: serde_json::Value) -> Self {
        Value::Data(data)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Data(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Data(s.into())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Data(b.into())
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Data(n.into())
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Data(n.into())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Data(n.into())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Data(n.into())
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::null()
    }
}

impl From<Vec<Value>> for Value {
    fn from(list: Vec<Value>) -> Self {
        Value::List(list)
    }
}

impl From<Outcome> for Value {
    fn from(outcome: Outcome) -> Self {
        Value::Outcome(Box::new(outcome))
    }
}

impl From<Promise> for Value {
    fn from(promise: Promise) -> Self {
        Value::Promise(promise)
    }
}

impl From<Arc<dyn Thenable>> for Value {
    fn from(object: Arc<dyn Thenable>) -> Self {
        Value::Foreign(object)
    }
}

impl From<anyhow::Error> for Value {
    fn from(e: anyhow::Error) -> Self {
        Value::Error(Arc::new(e))
    }
}

impl From<Error> for Value {
    fn from(e: Error) -> Self {
        Value::Error(Arc::new(e.into()))
    }
}
