//! Application services
//!
//! - `intent_classifier`: keyword routing table
//! - `session_tracker`: session → thread mapping
//! - `retry`: bounded fixed-backoff retries
//! - `agent_invoker`: run a remote agent and collect its reply
//! - `orchestrator`: end-to-end message handling
//! - `context`: startup wiring and shutdown cleanup

pub mod agent_invoker;
pub mod context;
pub mod intent_classifier;
pub mod orchestrator;
pub mod retry;
pub mod session_tracker;

pub use agent_invoker::{AgentInvoker, InvokerSettings};
pub use context::AppContext;
pub use intent_classifier::IntentClassifier;
pub use orchestrator::{Backend, Orchestrator, OrchestratorSettings};
pub use retry::{RetryOutcome, RetryPolicy};
pub use session_tracker::SessionTracker;
