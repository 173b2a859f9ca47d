use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use parking_lot::Mutex;
use tracing::trace;
use crate::rt::{oneshot, Rx};
use super::cell::{Cell, Reaction};
use super::engine::Engine;
use super::error::guard;
use super::resolve::resolve;
use super::value::{Outcome, Value};

static NEXT: AtomicU64 = AtomicU64::new(0);

/// Handle to a value that will exist later.
#[derive(Clone)]
pub struct Promise {
    inner: Arc<Inner>,
}

struct Inner {
    id:     u64,
    cell:   Mutex<Cell>,
    engine: Engine,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Status {
    Pending,
    Fulfilled,
    Rejected,
}

/// One of the two completion functions of a promise.
///
/// Calls after the promise has settled are ignored.
#[derive(Clone)]
pub struct Complete(Arc<dyn Fn(Value) + Send + Sync>);

/// A reaction callback. Returning `Err` rejects the derived promise.
pub struct Handler(Box<dyn FnOnce(Value) -> Result<Value, Value> + Send>);

impl Promise {
    pub(crate) fn pending(engine: Engine) -> Self {
        let id = NEXT.fetch_add(1, Ordering::Relaxed);
        Self {
            inner: Arc::new(Inner {
                id:     id,
                cell:   Mutex::new(Cell::new()),
                engine: engine,
            }),
        }
    }

    pub(crate) fn construct<E>(engine: Engine, executor: E) -> Self
    where
        E: FnOnce(Complete, Complete) -> Result<(), Value>,
    {
        let promise = Self::pending(engine);
        let (resolve, reject) = promise.completions();

        if let Err(reason) = guard(|| executor(resolve, reject.clone())) {
            reject.call(reason);
        }

        promise
    }

    pub(crate) fn completions(&self) -> (Complete, Complete) {
        let this    = self.clone();
        let resolve = Complete::new(move |value| this.adopt(value));
        let this    = self.clone();
        let reject  = Complete::new(move |reason| this.settle(Outcome::Rejected(reason)));
        (resolve, reject)
    }

    pub fn id(&self) -> u64 {
        self.inner.id
    }

    pub fn status(&self) -> Status {
        self.inner.cell.lock().status()
    }

    pub fn engine(&self) -> &Engine {
        &self.inner.engine
    }

    pub fn ptr_eq(&self, other: &Promise) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn then(&self, on_fulfilled: Option<Handler>, on_rejected: Option<Handler>) -> Promise {
        let on_fulfilled = on_fulfilled.unwrap_or_else(Handler::identity);
        let on_rejected  = on_rejected.unwrap_or_else(Handler::rethrow);

        let next = Promise::pending(self.inner.engine.clone());
        self.subscribe(next.reaction(on_fulfilled), next.reaction(on_rejected));
        next
    }

    pub fn map<F>(&self, on_fulfilled: F) -> Promise
    where
        F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
    {
        self.then(Some(Handler::new(on_fulfilled)), None)
    }

    pub fn catch<F>(&self, on_rejected: F) -> Promise
    where
        F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
    {
        self.then(None, Some(Handler::new(on_rejected)))
    }

    /// Runs `on_settled` on either path and passes the original outcome
    /// through, after waiting on any promise `on_settled` returns.
    pub fn finally<F>(&self, on_settled: F) -> Promise
    where
        F: FnOnce() -> Result<Value, Value> + Send + 'static,
    {
        let hook   = Arc::new(Mutex::new(Some(on_settled)));
        let engine = self.inner.engine.clone();

        let on_fulfilled = {
            let hook   = hook.clone();
            let engine = engine.clone();
            Handler::new(move |value| {
                let waited = run(&hook)?;
                Ok(engine.resolve(waited).map(move |_| Ok(value)).into())
            })
        };

        let on_rejected = Handler::new(move |reason| {
            let waited = run(&hook)?;
            Ok(engine.resolve(waited).map(move |_| Err(reason)).into())
        });

        self.then(Some(on_fulfilled), Some(on_rejected))
    }

    /// Returns a receiver completed with this promise's outcome.
    pub fn settled(&self) -> Rx {
        let (tx, rx) = oneshot();
        let tx = Arc::new(Mutex::new(Some(tx)));
        let ok = tx.clone();

        self.subscribe(
            Box::new(move |value| {
                if let Some(tx) = ok.lock().take() {
                    tx.send(Ok(value));
                }
            }),
            Box::new(move |reason| {
                if let Some(tx) = tx.lock().take() {
                    tx.send(Err(reason));
                }
            }),
        );

        rx
    }

    /// Success completion: a promise is followed rather than stored.
    fn adopt(&self, value: Value) {
        match value {
            Value::Promise(source) => {
                let (resolve, reject) = self.completions();
                source.then(Some(Handler::forward(resolve)), Some(Handler::forward(reject)));
            }
            value => self.settle(Outcome::Fulfilled(value)),
        }
    }

    /// Reactions are handed to the scheduler before the cell lock is
    /// released, so a reaction registered on another thread right after
    /// settlement is always queued behind them.
    pub(crate) fn settle(&self, outcome: Outcome) {
        let status   = outcome.status();
        let mut cell = self.inner.cell.lock();

        let (queue, value) = match cell.settle(outcome) {
            Some(drained) => drained,
            None          => {
                drop(cell);
                trace!(promise = self.id(), ?status, "ignored completion");
                return;
            }
        };

        trace!(promise = self.id(), ?status, reactions = queue.len(), "settled");

        for reaction in queue {
            self.schedule(reaction, value.clone());
        }
    }

    fn subscribe(&self, on_fulfilled: Reaction, on_rejected: Reaction) {
        let mut cell = self.inner.cell.lock();
        if let Some((reaction, value)) = cell.subscribe(on_fulfilled, on_rejected) {
            self.schedule(reaction, value);
        }
    }

    fn schedule(&self, reaction: Reaction, value: Value) {
        self.inner.engine.run_later(Box::new(move || reaction(value)));
    }

    /// Builds a reaction that settles `self` from a handler's result.
    fn reaction(&self, handler: Handler) -> Reaction {
        let next = self.clone();
        Box::new(move |value| match guard(|| handler.call(value)) {
            Ok(candidate) => resolve(&next, candidate),
            Err(reason)   => next.settle(Outcome::Rejected(reason)),
        })
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Promise(#{} {:?})", self.id(), self.status())
    }
}

impl Complete {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn call(&self, value: impl Into<Value>) {
        (self.0)(value.into())
    }
}

impl fmt::Debug for Complete {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Complete")
    }
}

impl Handler {
    pub fn new<F>(f: F) -> Self
    where
        F: FnOnce(Value) -> Result<Value, Value> + Send + 'static,
    {
        Self(Box::new(f))
    }

    pub(crate) fn forward(complete: Complete) -> Self {
        Self::new(move |value| {
            complete.call(value);
            Ok(Value::null())
        })
    }

    fn identity() -> Self {
        Self::new(Ok)
    }

    fn rethrow() -> Self {
        Self::new(Err)
    }

    fn call(self, value: Value) -> Result<Value, Value> {
        (self.0)(value)
    }
}

fn run<F>(hook: &Mutex<Option<F>>) -> Result<Value, Value>
where
    F: FnOnce() -> Result<Value, Value>,
{
    let hook = hook.lock().take();
    match hook {
        Some(f) => f(),
        None    => Ok(Value::null()),
    }
}
