//! Azure AI Foundry agents runtime
//!
//! REST client for threads, messages, runs and agents, plus request
//! authentication.

pub mod client;
pub mod credentials;
pub mod types;

pub use client::{FoundryClient, FoundryClientConfig};
pub use credentials::{Credential, FOUNDRY_RESOURCE};
