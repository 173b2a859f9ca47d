pub use vm::{Abortable, Complete, Deferred, Engine, Error, Handler};
pub use vm::{Member, Outcome, Promise, Status, Thenable, Value};
pub use rt::{Machine, Queue, Scheduler};

pub mod ex;
pub mod rt;
pub mod vm;
