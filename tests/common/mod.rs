#![allow(dead_code)]

use std::sync::Arc;
use parking_lot::Mutex;
use pledge::{Complete, Engine, Outcome, Promise, Queue, Thenable, Value};
use pledge::rt::{Feed, Scheduler};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, registry};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};

pub fn init() {
    let mut filter = EnvFilter::from_default_env();
    filter = filter.add_directive(LevelFilter::WARN.into());
    let print = fmt::layer().compact();
    let _ = registry().with(filter).with(print).try_init();
}

pub fn engine() -> (Engine, Queue) {
    init();
    let queue = Queue::new();
    (Engine::new(queue.feed()), queue)
}

/// Records the outcome of a promise once the scheduler delivers it.
#[derive(Clone, Default)]
pub struct Watcher(Arc<Mutex<Vec<Outcome>>>);

impl Watcher {
    pub fn watch(promise: &Promise) -> Self {
        let seen = Self::default();
        let (ok, err) = (seen.clone(), seen.clone());
        promise.then(
            Some(pledge::Handler::new(move |v| { ok.push(Outcome::Fulfilled(v)); Ok(Value::null()) })),
            Some(pledge::Handler::new(move |r| { err.push(Outcome::Rejected(r)); Ok(Value::null()) })),
        );
        seen
    }

    pub fn push(&self, outcome: Outcome) {
        self.0.lock().push(outcome);
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.0.lock().clone()
    }

    pub fn outcome(&self) -> Option<Outcome> {
        let outcomes = self.outcomes();
        assert!(outcomes.len() <= 1, "settled more than once: {outcomes:?}");
        outcomes.into_iter().next()
    }

    pub fn value(&self) -> Option<Value> {
        match self.outcome() {
            Some(Outcome::Fulfilled(v)) => Some(v),
            _                           => None,
        }
    }

    pub fn reason(&self) -> Option<Value> {
        match self.outcome() {
            Some(Outcome::Rejected(r)) => Some(r),
            _                          => None,
        }
    }
}

/// Ordered log shared by callbacks under test.
#[derive(Clone, Default)]
pub struct Log(Arc<Mutex<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.lock().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }
}

/// Runs `f` after `turns` scheduler turns.
pub fn after<F>(queue: &Queue, turns: usize, f: F)
where
    F: FnOnce() + Send + 'static,
{
    delay(&queue.feed(), turns, f)
}

fn delay<F>(feed: &Feed, turns: usize, f: F)
where
    F: FnOnce() + Send + 'static,
{
    match turns {
        0 => f(),
        n => {
            let next = feed.clone();
            feed.run_later(Box::new(move || delay(&next, n - 1, f)));
        }
    }
}

type Script = dyn Fn(Complete, Complete) -> Result<(), Value> + Send + Sync;

/// A foreign thenable whose `then` runs a script.
pub struct Scripted(Box<Script>);

impl Scripted {
    pub fn new<F>(f: F) -> Value
    where
        F: Fn(Complete, Complete) -> Result<(), Value> + Send + Sync + 'static,
    {
        let object: Arc<dyn Thenable> = Arc::new(Self(Box::new(f)));
        object.into()
    }
}

impl Thenable for Scripted {
    fn call(&self, resolve: Complete, reject: Complete) -> Result<(), Value> {
        (self.0)(resolve, reject)
    }
}
