use std::thread::{Builder, JoinHandle};
use anyhow::{anyhow, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use tracing::{debug, error, warn};
use super::{Scheduler, Task};

/// Event loop on a dedicated thread.
pub struct Machine {
    name: String,
}

#[derive(Clone)]
pub struct Handle {
    sender: Sender<Command>,
}

/// Stops and joins the loop when dropped. Tasks queued before the drop
/// still run.
pub struct Guard {
    handle: Handle,
    thread: Option<JoinHandle<()>>,
}

struct Thread {
    receiver: Receiver<Command>,
}

enum Command {
    Run(Task),
    Stop,
}

impl Machine {
    pub fn new(name: &str) -> Self {
        let name = name.to_owned();
        Self { name }
    }

    pub fn exec(self) -> Result<(Handle, Guard)> {
        let (sender, receiver) = unbounded();

        let handle = Handle { sender };
        let thread = Thread { receiver };

        let thread = Builder::new().name(self.name).spawn(move || {
            let count = thread.exec();
            debug!(tasks = count, "machine finished");
        })?;

        let guard  = Guard {
            handle: handle.clone(),
            thread: Some(thread),
        };

        Ok((handle, guard))
    }
}

impl Default for Machine {
    fn default() -> Self {
        Self::new("pledge")
    }
}

impl Handle {
    pub fn run(&self, task: Task) -> Result<()> {
        self.send(Command::Run(task))
    }

    fn send(&self, cmd: Command) -> Result<()> {
        match self.sender.send(cmd) {
            Ok(()) => Ok(()),
            Err(_) => Err(anyhow!("machine terminated")),
        }
    }
}

impl Scheduler for Handle {
    fn run_later(&self, task: Task) {
        if let Err(e) = self.run(task) {
            warn!("task dropped: {e}");
        }
    }
}

impl Thread {
    fn exec(self) -> usize {
        let mut count = 0;

        loop {
            match self.receiver.recv() {
                Ok(Command::Run(task))     => task(),
                Ok(Command::Stop) | Err(_) => break,
            }
            count += 1;
        }

        count
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        if let Some(handle) = self.thread.take() {
            let _ = self.handle.send(Command::Stop);
            match handle.join() {
                Ok(()) => (),
                Err(e) => error!("join error: {e:?}"),
            }
        }
    }
}
