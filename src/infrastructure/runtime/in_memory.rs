//! In-process agent runtime
//!
//! Deterministic stand-in for the hosted runtime: every completed run appends
//! an assistant message echoing the latest user message. Failures, run states
//! and latency can be scripted, and every call is counted.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;
use tokio::sync::Mutex;

use crate::domain::errors::RuntimeError;
use crate::domain::models::{
    AgentDefinition, Message, MessageRole, RemoteAgent, Run, RunStatus,
};
use crate::domain::ports::AgentRuntime;

/// Runtime operations that can be scripted to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    CreateThread,
    PostMessage,
    CreateRun,
    GetRun,
    ListMessages,
    GetAgent,
}

#[derive(Debug)]
struct RunState {
    run: Run,
    /// Remaining statuses; the last one sticks
    script: VecDeque<RunStatus>,
    replied: bool,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    threads: HashMap<String, Vec<Message>>,
    runs: HashMap<String, RunState>,
    agents: HashMap<String, RemoteAgent>,
    failures: HashMap<Operation, VecDeque<RuntimeError>>,
    run_scripts: VecDeque<Vec<RunStatus>>,
    calls: HashMap<Operation, u32>,
    deleted_threads: Vec<String>,
    deleted_agents: Vec<String>,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{:04}", self.next_id)
    }

    fn record(&mut self, op: Operation) -> Result<(), RuntimeError> {
        *self.calls.entry(op).or_insert(0) += 1;
        match self.failures.get_mut(&op).and_then(VecDeque::pop_front) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn thread_mut(&mut self, thread_id: &str) -> Result<&mut Vec<Message>, RuntimeError> {
        self.threads
            .get_mut(thread_id)
            .ok_or_else(|| RuntimeError::NotFound(format!("thread {thread_id}")))
    }
}

/// In-memory [`AgentRuntime`]
#[derive(Debug, Default)]
pub struct InMemoryRuntime {
    state: Mutex<State>,
    create_thread_latency: Option<Duration>,
}

impl InMemoryRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime that already knows the given agents (`id`, `name`)
    pub fn with_agents(agents: &[(&str, &str)]) -> Self {
        let state = State {
            agents: agents
                .iter()
                .map(|(id, name)| {
                    (
                        (*id).to_string(),
                        RemoteAgent {
                            id: (*id).to_string(),
                            name: Some((*name).to_string()),
                            model: "gpt-4o".to_string(),
                            description: None,
                        },
                    )
                })
                .collect(),
            ..State::default()
        };
        Self {
            state: Mutex::new(state),
            create_thread_latency: None,
        }
    }

    /// Delay every `create_thread` call, widening race windows in tests
    #[must_use]
    pub const fn with_create_thread_latency(mut self, latency: Duration) -> Self {
        self.create_thread_latency = Some(latency);
        self
    }

    /// Make the next `times` calls of `op` fail with `error`
    pub async fn fail_next(&self, op: Operation, times: usize, error: RuntimeError) {
        let mut state = self.state.lock().await;
        let queue = state.failures.entry(op).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// Statuses reported by `get_run` for the next created run; the last status repeats
    pub async fn script_next_run(&self, statuses: Vec<RunStatus>) {
        self.state.lock().await.run_scripts.push_back(statuses);
    }

    /// Number of calls made to `op`
    pub async fn call_count(&self, op: Operation) -> u32 {
        self.state
            .lock()
            .await
            .calls
            .get(&op)
            .copied()
            .unwrap_or(0)
    }

    /// Number of live threads
    pub async fn thread_count(&self) -> usize {
        self.state.lock().await.threads.len()
    }

    /// Threads deleted so far
    pub async fn deleted_threads(&self) -> Vec<String> {
        self.state.lock().await.deleted_threads.clone()
    }

    /// Agents deleted so far
    pub async fn deleted_agents(&self) -> Vec<String> {
        self.state.lock().await.deleted_agents.clone()
    }

    fn reply_for(agent_id: &str, messages: &[Message]) -> String {
        let question = messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map_or("", |m| m.content.as_str());
        format!("[{agent_id}] {question}")
    }
}

#[async_trait]
impl AgentRuntime for InMemoryRuntime {
    async fn create_thread(&self) -> Result<String, RuntimeError> {
        if let Some(latency) = self.create_thread_latency {
            tokio::time::sleep(latency).await;
        }
        let mut state = self.state.lock().await;
        state.record(Operation::CreateThread)?;
        let id = state.next_id("thread");
        state.threads.insert(id.clone(), Vec::new());
        Ok(id)
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().await;
        state
            .threads
            .remove(thread_id)
            .ok_or_else(|| RuntimeError::NotFound(format!("thread {thread_id}")))?;
        state.deleted_threads.push(thread_id.to_string());
        Ok(())
    }

    async fn post_message(&self, thread_id: &str, content: &str) -> Result<String, RuntimeError> {
        let mut state = self.state.lock().await;
        state.record(Operation::PostMessage)?;
        let id = state.next_id("msg");
        let thread = state.thread_mut(thread_id)?;
        // Never before the previous entry, so listings stay chronological
        let created_at = thread.last().map_or_else(Utc::now, |m| {
            Utc::now().max(m.created_at + ChronoDuration::milliseconds(1))
        });
        thread.push(Message {
            id: id.clone(),
            role: MessageRole::User,
            content: content.to_string(),
            created_at,
            run_id: None,
        });
        Ok(id)
    }

    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run, RuntimeError> {
        let mut state = self.state.lock().await;
        state.record(Operation::CreateRun)?;
        state.thread_mut(thread_id)?;
        let id = state.next_id("run");
        let script: VecDeque<RunStatus> = state
            .run_scripts
            .pop_front()
            .unwrap_or_else(|| vec![RunStatus::Completed])
            .into();
        let run = Run {
            id: id.clone(),
            thread_id: thread_id.to_string(),
            agent_id: agent_id.to_string(),
            status: RunStatus::Queued,
            last_error: None,
        };
        state.runs.insert(
            id,
            RunState {
                run: run.clone(),
                script,
                replied: false,
            },
        );
        Ok(run)
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, RuntimeError> {
        let mut state = self.state.lock().await;
        state.record(Operation::GetRun)?;
        let reply_id = state.next_id("msg");

        let run_state = state
            .runs
            .get_mut(run_id)
            .filter(|r| r.run.thread_id == thread_id)
            .ok_or_else(|| RuntimeError::NotFound(format!("run {run_id}")))?;

        let status = if run_state.script.len() > 1 {
            run_state.script.pop_front()
        } else {
            run_state.script.front().copied()
        }
        .unwrap_or(RunStatus::Completed);

        run_state.run.status = status;
        if status == RunStatus::Failed {
            run_state.run.last_error = Some("server_error: scripted failure".to_string());
        }
        let needs_reply = status == RunStatus::Completed && !run_state.replied;
        run_state.replied |= needs_reply;
        let run = run_state.run.clone();

        if needs_reply {
            let thread = state.thread_mut(thread_id)?;
            let content = Self::reply_for(&run.agent_id, thread);
            // Strictly after the user message it answers
            let created_at = thread
                .last()
                .map_or_else(Utc::now, |m| m.created_at + ChronoDuration::milliseconds(1));
            thread.push(Message {
                id: reply_id,
                role: MessageRole::Assistant,
                content,
                created_at,
                run_id: Some(run.id.clone()),
            });
        }

        Ok(run)
    }

    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, RuntimeError> {
        let mut state = self.state.lock().await;
        state.record(Operation::ListMessages)?;
        Ok(state.thread_mut(thread_id)?.clone())
    }

    async fn get_agent(&self, agent_id: &str) -> Result<RemoteAgent, RuntimeError> {
        let mut state = self.state.lock().await;
        state.record(Operation::GetAgent)?;
        state
            .agents
            .get(agent_id)
            .cloned()
            .ok_or_else(|| RuntimeError::NotFound(format!("agent {agent_id}")))
    }

    async fn create_agent(
        &self,
        definition: &AgentDefinition,
    ) -> Result<RemoteAgent, RuntimeError> {
        let mut state = self.state.lock().await;
        let id = state.next_id("asst");
        let agent = RemoteAgent {
            id: id.clone(),
            name: Some(definition.name.clone()),
            model: definition.model.clone(),
            description: definition.description.clone(),
        };
        state.agents.insert(id, agent.clone());
        Ok(agent)
    }

    async fn delete_agent(&self, agent_id: &str) -> Result<(), RuntimeError> {
        let mut state = self.state.lock().await;
        state
            .agents
            .remove(agent_id)
            .ok_or_else(|| RuntimeError::NotFound(format!("agent {agent_id}")))?;
        state.deleted_agents.push(agent_id.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_completed_run_echoes_user_message() {
        let runtime = InMemoryRuntime::new();
        let thread = runtime.create_thread().await.unwrap();
        runtime.post_message(&thread, "Hallo").await.unwrap();
        let run = runtime.create_run(&thread, "asst_1").await.unwrap();
        assert_eq!(run.status, RunStatus::Queued);

        let run = runtime.get_run(&thread, &run.id).await.unwrap();
        assert_eq!(run.status, RunStatus::Completed);

        let messages = runtime.list_messages(&thread).await.unwrap();
        assert!(messages[0].run_id.is_none());
        let reply = Message::reply_to_run(&messages, &run.id).unwrap();
        assert_eq!(reply.content, "[asst_1] Hallo");
    }

    #[tokio::test]
    async fn test_scripted_statuses_stick_on_last() {
        let runtime = InMemoryRuntime::new();
        runtime
            .script_next_run(vec![RunStatus::InProgress, RunStatus::Failed])
            .await;
        let thread = runtime.create_thread().await.unwrap();
        let run = runtime.create_run(&thread, "asst_1").await.unwrap();

        let first = runtime.get_run(&thread, &run.id).await.unwrap();
        let second = runtime.get_run(&thread, &run.id).await.unwrap();
        let third = runtime.get_run(&thread, &run.id).await.unwrap();
        assert_eq!(first.status, RunStatus::InProgress);
        assert_eq!(second.status, RunStatus::Failed);
        assert_eq!(third.status, RunStatus::Failed);
        assert!(third.last_error.is_some());
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed() {
        let runtime = InMemoryRuntime::new();
        runtime
            .fail_next(Operation::CreateThread, 2, RuntimeError::RateLimited)
            .await;

        assert!(runtime.create_thread().await.is_err());
        assert!(runtime.create_thread().await.is_err());
        assert!(runtime.create_thread().await.is_ok());
        assert_eq!(runtime.call_count(Operation::CreateThread).await, 3);
        assert_eq!(runtime.thread_count().await, 1);
    }

    #[tokio::test]
    async fn test_unknown_agent_is_not_found() {
        let runtime = InMemoryRuntime::with_agents(&[("asst_search", "Search")]);
        assert_eq!(
            runtime.get_agent("asst_search").await.unwrap().name.as_deref(),
            Some("Search")
        );
        assert!(matches!(
            runtime.get_agent("asst_missing").await,
            Err(RuntimeError::NotFound(_))
        ));
    }
}
