use async_trait::async_trait;

use super::errors::RuntimeError;
use super::models::{AgentDefinition, Message, RemoteAgent, Run};

/// Remote agent runtime interface
///
/// The hosted runtime owns agents, threads, messages and runs; this trait
/// exposes the handful of operations the dispatcher needs. Implementations
/// must be cheap to share behind an `Arc`.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Create an empty conversation thread
    ///
    /// # Returns
    /// * `Ok(thread_id)` on success
    async fn create_thread(&self) -> Result<String, RuntimeError>;

    /// Delete a thread and its messages
    async fn delete_thread(&self, thread_id: &str) -> Result<(), RuntimeError>;

    /// Append a user message to a thread
    ///
    /// # Returns
    /// * `Ok(message_id)` on success
    async fn post_message(&self, thread_id: &str, content: &str) -> Result<String, RuntimeError>;

    /// Start a run of `agent_id` against the thread
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run, RuntimeError>;

    /// Fetch the current state of a run
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, RuntimeError>;

    /// List all messages on a thread, in any order
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, RuntimeError>;

    /// Look up agent metadata
    async fn get_agent(&self, agent_id: &str) -> Result<RemoteAgent, RuntimeError>;

    /// Create an agent and return its metadata
    async fn create_agent(&self, definition: &AgentDefinition)
        -> Result<RemoteAgent, RuntimeError>;

    /// Delete an agent
    async fn delete_agent(&self, agent_id: &str) -> Result<(), RuntimeError>;
}
