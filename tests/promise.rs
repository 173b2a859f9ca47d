use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use serde_json::json;
use pledge::{Engine, Error, Handler, Outcome, Promise, Queue, Status, Value};
use pledge::rt::{Feed, Scheduler, Task};
use common::{Log, Watcher};
mod common;

#[test]
fn executor_runs_synchronously() {
    let (engine, queue) = common::engine();
    let log = Log::default();

    let inner = log.clone();
    let promise = engine.promise(move |resolve, _| {
        inner.push("executor");
        resolve.call(1);
        Ok(())
    });
    log.push("after");

    assert_eq!(log.entries(), ["executor", "after"]);
    assert_eq!(promise.status(), Status::Fulfilled);
    assert_eq!(queue.len(), 0);
}

#[test]
fn executor_error_rejects() {
    let (engine, queue) = common::engine();

    let promise = engine.promise(|_, _| Err(Value::from("boom")));
    let seen = Watcher::watch(&promise);
    queue.flush();

    assert_eq!(seen.reason(), Some(Value::from("boom")));
}

#[test]
fn executor_error_after_resolve_is_ignored() {
    let (engine, queue) = common::engine();

    let promise = engine.promise(|resolve, _| {
        resolve.call(1);
        Err(Value::from("late"))
    });
    let seen = Watcher::watch(&promise);
    queue.flush();

    assert_eq!(seen.value(), Some(Value::from(1)));
}

#[test]
fn executor_panic_rejects() {
    let (engine, queue) = common::engine();

    let promise = engine.promise(|_, _| panic!("executor exploded"));
    let seen = Watcher::watch(&promise);
    queue.flush();

    let reason = seen.reason().expect("rejected");
    assert_eq!(
        reason.downcast_ref::<Error>(),
        Some(&Error::Panic("executor exploded".to_owned())),
    );
}

#[test]
fn completion_is_idempotent() {
    let (engine, queue) = common::engine();
    let deferred = engine.deferred();

    deferred.resolve.call(1);
    deferred.resolve.call(2);
    deferred.reject.call("nope");

    let seen = Watcher::watch(&deferred.promise);
    queue.flush();

    assert_eq!(seen.outcomes(), [Outcome::Fulfilled(1.into())]);
}

#[test]
fn reject_then_resolve_keeps_rejection() {
    let (engine, queue) = common::engine();
    let deferred = engine.deferred();

    deferred.reject.call("first");
    deferred.resolve.call(1);

    let seen = Watcher::watch(&deferred.promise);
    queue.flush();

    assert_eq!(seen.outcomes(), [Outcome::Rejected("first".into())]);
}

#[test]
fn reaction_runs_once_and_later() {
    let (engine, queue) = common::engine();
    let calls = Arc::new(Mutex::new(Vec::new()));

    let seen = calls.clone();
    engine.resolve(42).map(move |v| {
        seen.lock().push(v);
        Ok(Value::null())
    });

    assert!(calls.lock().is_empty());
    assert_eq!(queue.len(), 1);

    queue.flush();
    assert_eq!(*calls.lock(), [Value::from(42)]);
}

#[test]
fn reaction_on_pending_waits_for_settlement() {
    let (engine, queue) = common::engine();
    let deferred = engine.deferred();
    let seen = Watcher::watch(&deferred.promise.map(|v| Ok(v)));

    queue.flush();
    assert_eq!(seen.outcome(), None);

    deferred.resolve.call("done");
    assert_eq!(seen.outcome(), None);

    queue.flush();
    assert_eq!(seen.value(), Some("done".into()));
}

#[test]
fn reactions_fire_in_registration_order() {
    let (engine, queue) = common::engine();
    let deferred = engine.deferred();
    let log = Log::default();

    for name in ["a", "b", "c"] {
        let log = log.clone();
        deferred.promise.map(move |_| {
            log.push(name);
            Ok(Value::null())
        });
    }

    deferred.resolve.call(());
    queue.flush();

    assert_eq!(log.entries(), ["a", "b", "c"]);
}

/// Parks the first submitted task until released, then queues it.
struct Stall {
    feed:    Feed,
    first:   AtomicBool,
    entered: Sender<()>,
    release: Receiver<()>,
}

impl Scheduler for Stall {
    fn run_later(&self, task: Task) {
        if self.first.swap(false, Ordering::SeqCst) {
            let _ = self.entered.send(());
            let _ = self.release.recv();
        }
        self.feed.run_later(task);
    }
}

#[test]
fn reactions_keep_registration_order_across_threads() {
    common::init();

    let queue = Queue::new();
    let (entered, parked) = unbounded();
    let (unpark, release) = unbounded();
    let engine = Engine::new(Stall {
        feed:    queue.feed(),
        first:   AtomicBool::new(true),
        entered: entered,
        release: release,
    });

    let deferred = engine.deferred();
    let log = Log::default();

    let first = log.clone();
    deferred.promise.map(move |_| {
        first.push("A");
        Ok(Value::null())
    });

    let resolve  = deferred.resolve.clone();
    let settling = thread::spawn(move || resolve.call(()));
    parked.recv_timeout(Duration::from_secs(5)).expect("settlement reached the scheduler");

    let promise  = deferred.promise.clone();
    let second   = log.clone();
    let late     = thread::spawn(move || {
        promise.map(move |_| {
            second.push("B");
            Ok(Value::null())
        });
    });

    thread::sleep(Duration::from_millis(50));
    unpark.send(()).expect("scheduler is parked");

    settling.join().expect("settling thread");
    late.join().expect("registering thread");
    queue.flush();

    assert_eq!(log.entries(), ["A", "B"]);
}

#[test]
fn missing_handlers_pass_through() {
    let (engine, queue) = common::engine();

    let fulfilled = Watcher::watch(&engine.resolve(5).then(None, None));
    let rejected  = Watcher::watch(&engine.reject("r").map(|_| Ok("unreachable".into())));
    queue.flush();

    assert_eq!(fulfilled.value(), Some(5.into()));
    assert_eq!(rejected.reason(), Some("r".into()));
}

#[test]
fn rejection_handler_recovers() {
    let (engine, queue) = common::engine();

    let promise = engine.reject("r").then(None, Some(Handler::new(|r| {
        assert_eq!(r, Value::from("r"));
        Ok("recovered".into())
    })));
    let seen = Watcher::watch(&promise);
    queue.flush();

    assert_eq!(seen.value(), Some("recovered".into()));
}

#[test]
fn handler_error_rejects_derived() {
    let (engine, queue) = common::engine();

    let promise = engine.resolve(1).map(|_| {
        Err(anyhow::anyhow!("handler failed").into())
    });
    let seen = Watcher::watch(&promise);
    queue.flush();

    let reason = seen.reason().expect("rejected");
    assert_eq!(serde_json::to_value(&reason).unwrap(), json!("handler failed"));
}

#[test]
fn handler_panic_rejects_derived() {
    let (engine, queue) = common::engine();

    let promise = engine.resolve(1).map(|_| panic!("handler exploded"));
    let seen = Watcher::watch(&promise);
    queue.flush();

    let reason = seen.reason().expect("rejected");
    assert!(matches!(reason.downcast_ref::<Error>(), Some(Error::Panic(_))));
}

#[test]
fn catch_handles_rejection() {
    let (engine, queue) = common::engine();

    let promise = engine.resolve(1)
        .map(|_| Err("bad".into()))
        .map(|_| Ok("skipped".into()))
        .catch(|r| Ok(Value::List(vec!["caught".into(), r])));
    let seen = Watcher::watch(&promise);
    queue.flush();

    assert_eq!(seen.value(), Some(Value::List(vec!["caught".into(), "bad".into()])));
}

#[test]
fn returned_promise_is_adopted() {
    let (engine, queue) = common::engine();
    let deferred = engine.deferred();

    let inner = deferred.promise.clone();
    let seen = Watcher::watch(&engine.resolve(1).map(move |_| Ok(inner.into())));
    queue.flush();
    assert_eq!(seen.outcome(), None);

    deferred.reject.call("inner failed");
    queue.flush();
    assert_eq!(seen.reason(), Some("inner failed".into()));
}

#[test]
fn resolving_with_promise_unwraps_it() {
    let (engine, queue) = common::engine();

    let inner   = engine.resolve(7);
    let promise = engine.resolve(inner.clone());
    assert!(!promise.ptr_eq(&inner));
    assert_eq!(promise.status(), Status::Pending);

    let seen = Watcher::watch(&promise);
    queue.flush();

    assert_eq!(seen.value(), Some(7.into()));
}

#[test]
fn self_reference_rejects() {
    let (engine, queue) = common::engine();
    let slot: Arc<Mutex<Option<Promise>>> = Arc::default();

    let inner = slot.clone();
    let promise = engine.resolve(1).map(move |_| {
        let this = inner.lock().clone().expect("slot filled");
        Ok(this.into())
    });
    *slot.lock() = Some(promise.clone());

    let seen = Watcher::watch(&promise);
    queue.flush();

    let reason = seen.reason().expect("rejected");
    assert_eq!(reason.downcast_ref::<Error>(), Some(&Error::Cycle(promise.id())));

    slot.lock().take();
}

#[test]
fn finally_preserves_value() {
    let (engine, queue) = common::engine();
    let log = Log::default();

    let inner = log.clone();
    let promise = engine.resolve("kept").finally(move || {
        inner.push("finally");
        Ok("ignored".into())
    });
    let seen = Watcher::watch(&promise);
    queue.flush();

    assert_eq!(log.entries(), ["finally"]);
    assert_eq!(seen.value(), Some("kept".into()));
}

#[test]
fn finally_preserves_reason() {
    let (engine, queue) = common::engine();

    let promise = engine.reject("original").finally(|| Ok(Value::null()));
    let seen = Watcher::watch(&promise);
    queue.flush();

    assert_eq!(seen.reason(), Some("original".into()));
}

#[test]
fn finally_waits_for_returned_promise() {
    let (engine, queue) = common::engine();
    let gate = engine.deferred();

    let waited = gate.promise.clone();
    let promise = engine.resolve("kept").finally(move || Ok(waited.into()));
    let seen = Watcher::watch(&promise);
    queue.flush();
    assert_eq!(seen.outcome(), None);

    gate.resolve.call("gate value");
    queue.flush();
    assert_eq!(seen.value(), Some("kept".into()));
}

#[test]
fn finally_error_replaces_outcome() {
    let (engine, queue) = common::engine();

    let promise = engine.resolve("kept").finally(|| Err("cleanup failed".into()));
    let seen = Watcher::watch(&promise);
    queue.flush();

    assert_eq!(seen.reason(), Some("cleanup failed".into()));
}

#[test]
fn finally_waits_on_rejection_path() {
    let (engine, queue) = common::engine();
    let gate = engine.deferred();

    let waited = gate.promise.clone();
    let promise = engine.reject("original").finally(move || Ok(waited.into()));
    let seen = Watcher::watch(&promise);
    queue.flush();
    assert_eq!(seen.outcome(), None);

    gate.resolve.call("gate value");
    queue.flush();
    assert_eq!(seen.reason(), Some("original".into()));
}

#[test]
fn finally_rejected_promise_replaces_outcome() {
    let (engine, queue) = common::engine();

    let inner = engine.clone();
    let promise = engine.resolve("kept").finally(move || Ok(inner.reject("cleanup").into()));
    let seen = Watcher::watch(&promise);
    queue.flush();

    assert_eq!(seen.reason(), Some("cleanup".into()));
}

#[test]
fn deferred_settle_from_result() {
    let (engine, queue) = common::engine();

    let ok  = engine.deferred();
    let err = engine.deferred();
    ok.settle(Ok(1.into()));
    err.settle(Err("e".into()));

    assert_eq!(ok.promise.status(), Status::Fulfilled);
    assert_eq!(err.promise.status(), Status::Rejected);

    let seen = Watcher::watch(&err.promise);
    queue.flush();
    assert_eq!(seen.reason(), Some("e".into()));
}

#[test]
fn settled_receiver_reports_outcome() {
    let (engine, queue) = common::engine();

    let mut rx = engine.resolve(3).settled();
    assert!(rx.try_recv().unwrap().is_none());

    queue.flush();
    assert_eq!(rx.try_recv().unwrap(), Some(Ok(Value::from(3))));
}

#[test]
fn dropped_queue_releases_pending_reactions() {
    let (engine, queue) = common::engine();

    let mut rx = engine.resolve(3).settled();
    assert_eq!(queue.len(), 1);

    drop(queue);
    assert!(rx.try_recv().is_err());

    drop(engine);
}
