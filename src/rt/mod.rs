pub use channel::oneshot;
pub use channel::Rx;
pub use channel::Tx;
pub use machine::Guard;
pub use machine::Handle;
pub use machine::Machine;
pub use queue::Feed;
pub use queue::Queue;
#[cfg(feature = "tokio")]
pub use spawn::Spawner;

mod channel;
mod machine;
mod queue;
#[cfg(feature = "tokio")]
mod spawn;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks strictly after the current synchronous execution unwinds,
/// in the order they were submitted.
///
/// `run_later` must never run the task before returning: promises submit
/// reactions while holding their cell lock.
pub trait Scheduler: Send + Sync + 'static {
    fn run_later(&self, task: Task);
}
