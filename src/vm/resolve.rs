use std::sync::Arc;
use parking_lot::Mutex;
use tracing::{trace, warn};
use super::error::{guard, Error};
use super::promise::{Complete, Handler, Promise};
use super::value::{Kind, Outcome, Value};

/// Bookkeeping for one `then` invocation on a candidate.
struct Step {
    called:   bool,
    inline:   bool,
    deferred: Option<Value>,
}

/// Settles `target` from `candidate`, assimilating promises and thenables.
///
/// A thenable that completes synchronously from inside its own `then`
/// hands its value back to this loop instead of recursing, so chains of
/// nested thenables run in constant stack depth.
pub(crate) fn resolve(target: &Promise, candidate: Value) {
    let mut next = Some(candidate);
    while let Some(candidate) = next.take() {
        next = step(target, candidate);
    }
}

fn step(target: &Promise, candidate: Value) -> Option<Value> {
    if let Value::Promise(promise) = &candidate {
        if promise.ptr_eq(target) {
            target.settle(Outcome::Rejected(Error::Cycle(target.id()).into()));
            return None;
        }
    }

    let kind = match guard(|| candidate.kind()) {
        Ok(kind)    => kind,
        Err(reason) => {
            target.settle(Outcome::Rejected(reason));
            return None;
        }
    };

    match kind {
        Kind::Plain => {
            target.settle(Outcome::Fulfilled(candidate));
            None
        }
        Kind::Native(promise) => invoke(target, move |resolve, reject| {
            promise.then(Some(Handler::forward(resolve)), Some(Handler::forward(reject)));
            Ok(())
        }),
        Kind::Foreign(object) => invoke(target, move |resolve, reject| {
            object.call(resolve, reject)
        }),
    }
}

fn invoke<F>(target: &Promise, then: F) -> Option<Value>
where
    F: FnOnce(Complete, Complete) -> Result<(), Value>,
{
    let step = Arc::new(Mutex::new(Step {
        called:   false,
        inline:   true,
        deferred: None,
    }));

    let on_value = {
        let step   = step.clone();
        let target = target.clone();
        Complete::new(move |value| {
            let mut state = step.lock();
            if state.called {
                warn!(promise = target.id(), "thenable completed more than once");
                return;
            }
            state.called = true;

            if state.inline {
                state.deferred = Some(value);
                return;
            }
            drop(state);

            resolve(&target, value);
        })
    };

    let on_reason = {
        let step   = step.clone();
        let target = target.clone();
        Complete::new(move |reason| {
            let mut state = step.lock();
            if state.called {
                warn!(promise = target.id(), "thenable completed more than once");
                return;
            }
            state.called = true;
            drop(state);

            target.settle(Outcome::Rejected(reason));
        })
    };

    let result = guard(|| then(on_value, on_reason));

    let mut state = step.lock();
    state.inline = false;

    if let Err(reason) = result {
        if state.called {
            trace!(promise = target.id(), "ignored failure after thenable completed");
        } else {
            state.called = true;
            drop(state);
            target.settle(Outcome::Rejected(reason));
            return None;
        }
    }

    state.deferred.take()
}
