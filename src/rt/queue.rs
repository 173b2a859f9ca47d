use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::trace;
use super::{Scheduler, Task};

/// Scheduler drained by hand, for deterministic tests and embedding in
/// an existing loop.
///
/// The queue owns the receiving end and engines hold a [`Feed`]; dropping
/// the queue drops every task still buffered in it.
pub struct Queue {
    sender:   Sender<Task>,
    receiver: Receiver<Task>,
}

/// Submitting half of a [`Queue`].
#[derive(Clone)]
pub struct Feed {
    sender: Sender<Task>,
}

impl Queue {
    pub fn new() -> Self {
        let (sender, receiver) = unbounded();
        Self { sender, receiver }
    }

    pub fn feed(&self) -> Feed {
        Feed {
            sender: self.sender.clone(),
        }
    }

    /// Runs the oldest task, if any.
    pub fn tick(&self) -> bool {
        match self.receiver.try_recv() {
            Ok(task) => {
                task();
                true
            }
            Err(_) => false,
        }
    }

    /// Runs tasks until none are left, including ones queued meanwhile.
    pub fn flush(&self) -> usize {
        let mut count = 0;
        while self.tick() {
            count += 1;
        }
        trace!(tasks = count, "flushed");
        count
    }

    pub fn len(&self) -> usize {
        self.receiver.len()
    }

    pub fn is_empty(&self) -> bool {
        self.receiver.is_empty()
    }
}

impl Default for Queue {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for Feed {
    fn run_later(&self, task: Task) {
        match self.sender.send(task) {
            Ok(()) => (),
            Err(_) => trace!("queue dropped, task discarded"),
        }
    }
}
