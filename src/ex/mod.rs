pub use node::Callback;

pub mod node;
