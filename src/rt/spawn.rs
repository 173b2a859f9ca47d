use anyhow::Result;
use tokio::runtime;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tracing::{debug, warn};
use super::{Scheduler, Task};

/// Scheduler backed by a tokio runtime. A single spawned task drains the
/// queue, so submission order is kept.
#[derive(Clone)]
pub struct Spawner {
    sender: UnboundedSender<Task>,
}

impl Spawner {
    pub fn new(handle: &runtime::Handle) -> Self {
        let (sender, mut receiver) = unbounded_channel::<Task>();

        handle.spawn(async move {
            while let Some(task) = receiver.recv().await {
                task();
            }
            debug!("spawner finished");
        });

        Self { sender }
    }

    /// Uses the runtime of the calling context.
    pub fn current() -> Result<Self> {
        Ok(Self::new(&runtime::Handle::try_current()?))
    }
}

impl Scheduler for Spawner {
    fn run_later(&self, task: Task) {
        if self.sender.send(task).is_err() {
            warn!("spawner stopped, task dropped");
        }
    }
}
