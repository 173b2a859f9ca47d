use crate::vm::{Deferred, Engine, Promise, Value};

/// Completion callback handed to a node-style operation.
pub struct Callback {
    deferred: Deferred,
}

/// Adapts `op(input, callback(err, data))` style producers.
pub trait Operation: Send + Sync + 'static {
    fn start(&self, input: Value, callback: Callback);
}

impl Callback {
    /// `err` rejects when present, otherwise `data` fulfills.
    pub fn call(self, err: Option<Value>, data: Value) {
        match err {
            Some(err) => self.deferred.reject.call(err),
            None      => self.deferred.resolve.call(data),
        }
    }
}

/// Starts `op` and returns a promise for the value it reports.
pub fn adapt<F>(engine: &Engine, op: F) -> Promise
where
    F: FnOnce(Callback),
{
    let deferred = engine.deferred();
    let promise  = deferred.promise.clone();
    op(Callback { deferred });
    promise
}

pub fn invoke<O: Operation>(engine: &Engine, op: &O, input: Value) -> Promise {
    adapt(engine, |callback| op.start(input, callback))
}
