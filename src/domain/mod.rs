//! Domain layer
//!
//! Models, the outbound runtime port, and the error taxonomy. Nothing here
//! performs I/O.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{DomainError, DomainResult, RuntimeError};
