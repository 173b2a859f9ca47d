use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use thiserror::Error;
use super::value::Value;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("chaining cycle detected for promise #{0}")]
    Cycle(u64),
    #[error("panicked: {0}")]
    Panic(String),
    #[error("value cannot be serialized")]
    NotSerializable,
}

/// Runs user code, turning a panic into a rejection reason.
pub(crate) fn guard<T, F>(f: F) -> Result<T, Value>
where
    F: FnOnce() -> Result<T, Value>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(panic) => Err(Error::Panic(message(panic)).into()),
    }
}

fn message(panic: Box<dyn Any + Send>) -> String {
    match panic.downcast::<String>() {
        Ok(s)      => *s,
        Err(panic) => match panic.downcast::<&'static str>() {
            Ok(s)  => (*s).to_owned(),
            Err(_) => "unknown panic".to_owned(),
        },
    }
}
