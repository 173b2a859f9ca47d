use std::sync::Arc;
use parking_lot::Mutex;
use super::engine::Engine;
use super::promise::{Complete, Handler, Promise};
use super::resolve::resolve;
use super::value::{Outcome, Value};

/// A promise raced against a gate that `abort` rejects.
///
/// Aborting only settles `promise`; the wrapped work keeps running.
#[derive(Clone, Debug)]
pub struct Abortable {
    pub promise: Promise,
    pub abort:   Complete,
}

struct Tally {
    slots: Vec<Option<Value>>,
    times: usize,
}

impl Engine {
    /// Fulfills with every input's value in input order, or rejects with
    /// the first rejection.
    pub fn all<I>(&self, values: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        let engine = self.clone();
        self.promise(move |resolve, reject| {
            if values.is_empty() {
                resolve.call(Value::List(Vec::new()));
                return Ok(());
            }

            let tally = Arc::new(Mutex::new(Tally::new(values.len())));

            for (index, value) in values.into_iter().enumerate() {
                let on_value = collect(&tally, index, &resolve, |value| value);
                follow(&engine, value, on_value, reject.clone());
            }

            Ok(())
        })
    }

    /// Settles like whichever input settles first.
    pub fn race<I>(&self, values: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        let engine = self.clone();
        self.promise(move |resolve, reject| {
            for value in values {
                follow(&engine, value, resolve.clone(), reject.clone());
            }
            Ok(())
        })
    }

    /// Fulfills with an outcome record per input once all have settled.
    pub fn all_settled<I>(&self, values: I) -> Promise
    where
        I: IntoIterator<Item = Value>,
    {
        let values = values.into_iter().collect::<Vec<_>>();
        let engine = self.clone();
        self.promise(move |resolve, _| {
            if values.is_empty() {
                resolve.call(Value::List(Vec::new()));
                return Ok(());
            }

            let tally = Arc::new(Mutex::new(Tally::new(values.len())));

            for (index, value) in values.into_iter().enumerate() {
                let on_value  = collect(&tally, index, &resolve, |v| Outcome::Fulfilled(v).into());
                let on_reason = collect(&tally, index, &resolve, |r| Outcome::Rejected(r).into());
                follow(&engine, value, on_value, on_reason);
            }

            Ok(())
        })
    }

    pub fn abortable(&self, value: impl Into<Value>) -> Abortable {
        let gate    = self.deferred();
        let promise = self.race([Value::Promise(gate.promise), value.into()]);
        Abortable {
            promise: promise,
            abort:   gate.reject,
        }
    }
}

impl Tally {
    fn new(len: usize) -> Self {
        Self {
            slots: vec![None; len],
            times: 0,
        }
    }

    /// Stores one result; returns the full list once every slot is filled.
    ///
    /// Each index is recorded at most once, as every input is followed
    /// through a promise.
    fn record(&mut self, index: usize, value: Value) -> Option<Vec<Value>> {
        self.slots[index] = Some(value);
        self.times += 1;

        match self.times == self.slots.len() {
            true  => self.slots.iter_mut().map(Option::take).collect(),
            false => None,
        }
    }
}

fn collect<F>(tally: &Arc<Mutex<Tally>>, index: usize, resolve: &Complete, wrap: F) -> Complete
where
    F: Fn(Value) -> Value + Send + Sync + 'static,
{
    let tally   = tally.clone();
    let resolve = resolve.clone();
    Complete::new(move |value| {
        let done = tally.lock().record(index, wrap(value));
        if let Some(results) = done {
            resolve.call(Value::List(results));
        }
    })
}

/// Subscribes to one combinator input. Plain values complete at once;
/// foreign thenables are resolved into a promise first, so a `then` that
/// completes twice or fails late still settles the input only once.
fn follow(engine: &Engine, value: Value, on_value: Complete, on_reason: Complete) {
    let promise = match value {
        Value::Promise(promise) => promise,
        Value::Foreign(_)       => {
            let promise = Promise::pending(engine.clone());
            resolve(&promise, value);
            promise
        }
        value                   => return on_value.call(value),
    };
    promise.then(Some(Handler::forward(on_value)), Some(Handler::forward(on_reason)));
}
