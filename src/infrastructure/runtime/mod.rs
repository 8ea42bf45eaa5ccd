//! Local agent runtimes

pub mod in_memory;

pub use in_memory::{InMemoryRuntime, Operation};
