use std::fmt;
use std::sync::Arc;
use crate::rt::{Scheduler, Task};
use super::promise::{Complete, Promise};
use super::value::Value;

/// Creates promises bound to one scheduler.
#[derive(Clone)]
pub struct Engine {
    scheduler: Arc<dyn Scheduler>,
}

/// A promise together with its completion functions, for producers that
/// settle it from outside an executor.
#[derive(Clone, Debug)]
pub struct Deferred {
    pub promise: Promise,
    pub resolve: Complete,
    pub reject:  Complete,
}

impl Engine {
    pub fn new<S: Scheduler>(scheduler: S) -> Self {
        Self { scheduler: Arc::new(scheduler) }
    }

    /// Runs `executor` immediately. An `Err` or a panic rejects the promise.
    pub fn promise<E>(&self, executor: E) -> Promise
    where
        E: FnOnce(Complete, Complete) -> Result<(), Value>,
    {
        Promise::construct(self.clone(), executor)
    }

    pub fn resolve(&self, value: impl Into<Value>) -> Promise {
        let value = value.into();
        self.promise(move |resolve, _| {
            resolve.call(value);
            Ok(())
        })
    }

    pub fn reject(&self, reason: impl Into<Value>) -> Promise {
        let reason = reason.into();
        self.promise(move |_, reject| {
            reject.call(reason);
            Ok(())
        })
    }

    pub fn deferred(&self) -> Deferred {
        let promise = Promise::pending(self.clone());
        let (resolve, reject) = promise.completions();
        Deferred { promise, resolve, reject }
    }

    pub(crate) fn run_later(&self, task: Task) {
        self.scheduler.run_later(task);
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Engine")
    }
}

impl Deferred {
    pub fn settle(&self, result: Result<Value, Value>) {
        match result {
            Ok(value)   => self.resolve.call(value),
            Err(reason) => self.reject.call(reason),
        }
    }
}
