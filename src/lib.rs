//! CBR Agents - multi-agent chat dispatcher
//!
//! Routes driving-exam questions to assistants hosted on Azure AI Foundry:
//! a keyword classifier picks the specialist, a session tracker maps each
//! conversation to one remote thread, and the invoker runs the agent with
//! polling, retries and a canned offline reply when the runtime is absent
//! or failing.
//!
//! # Architecture
//!
//! - **Domain Layer** (`domain`): models, errors and the `AgentRuntime` port
//! - **Service Layer** (`services`): classifier, tracker, invoker, orchestrator
//! - **Infrastructure Layer** (`infrastructure`): Foundry client, in-memory runtime, config, logging
//! - **API Layer** (`api`): axum HTTP endpoints
//! - **CLI Layer** (`cli`): command-line interface

pub mod api;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

pub use domain::errors::{DomainError, DomainResult, RuntimeError};
pub use domain::models::{
    AgentRole, ChatRequest, Config, IntentLabel, OrchestrationResult, StatusReport,
};
pub use domain::ports::AgentRuntime;
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use services::{AppContext, IntentClassifier, Orchestrator};
