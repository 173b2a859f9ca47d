pub use combine::Abortable;
pub use engine::Deferred;
pub use engine::Engine;
pub use error::Error;
pub use promise::Complete;
pub use promise::Handler;
pub use promise::Promise;
pub use promise::Status;
pub use value::Member;
pub use value::Outcome;
pub use value::Thenable;
pub use value::Value;

mod cell;
mod combine;
mod engine;
mod error;
mod promise;
mod resolve;
mod value;
