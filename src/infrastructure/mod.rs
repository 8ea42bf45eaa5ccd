//! Adapters for the outside world
//!
//! - `foundry`: HTTP runtime for Azure AI Foundry agents
//! - `runtime`: in-process runtime for tests and offline demos
//! - `config`: hierarchical configuration loading
//! - `logging`: tracing subscriber setup

pub mod config;
pub mod foundry;
pub mod logging;
pub mod runtime;
