//! Remote agent invocation with polling, retries and fallback.
//!
//! One attempt posts the user message, starts a run, polls it until it
//! reaches a terminal state, and reads the assistant message that run wrote.
//! Attempts are wrapped in a [`RetryPolicy`]; when every attempt fails, or
//! a permanent error occurs, the invoker returns the canned
//! [`MOCK_RESPONSE`] instead of an error.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, instrument, warn};

use super::retry::RetryPolicy;
use super::session_tracker::SessionTracker;
use crate::domain::errors::RuntimeError;
use crate::domain::models::{
    Config, InvocationOutcome, InvocationResult, Message, Run, RunStatus, MOCK_RESPONSE,
    MOCK_THREAD,
};
use crate::domain::ports::AgentRuntime;

/// Polling and retry knobs for [`AgentInvoker`]
#[derive(Debug, Clone)]
pub struct InvokerSettings {
    pub retry: RetryPolicy,
    pub poll_interval: Duration,
    /// Wall-clock limit for a single run
    pub run_timeout: Duration,
    /// Replace the session's thread before each retry
    pub fresh_thread_on_retry: bool,
}

impl InvokerSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            retry: RetryPolicy::from_config(&config.retry),
            poll_interval: Duration::from_millis(config.polling.interval_ms),
            run_timeout: Duration::from_secs(config.polling.timeout_secs),
            fresh_thread_on_retry: config.retry.fresh_thread_on_retry,
        }
    }
}

impl Default for InvokerSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Thread the next attempt runs on, and the thread already holding the
/// user message
#[derive(Debug)]
struct Cursor {
    thread_id: String,
    posted_on: Option<String>,
}

/// Reply produced by one successful attempt
#[derive(Debug)]
struct Reply {
    text: String,
    run_id: String,
}

/// Sends messages to remote agents and waits for their replies
pub struct AgentInvoker {
    runtime: Arc<dyn AgentRuntime>,
    tracker: Arc<SessionTracker>,
    settings: InvokerSettings,
}

impl AgentInvoker {
    pub fn new(
        runtime: Arc<dyn AgentRuntime>,
        tracker: Arc<SessionTracker>,
        settings: InvokerSettings,
    ) -> Self {
        Self {
            runtime,
            tracker,
            settings,
        }
    }

    pub const fn settings(&self) -> &InvokerSettings {
        &self.settings
    }

    /// Invoke `agent_id` on a fixed thread; retries reuse the same thread
    ///
    /// The user message is posted once; retries start a new run on it.
    /// Never fails: exhausted retries and permanent errors produce an
    /// [`InvocationOutcome::Fallback`] result.
    #[instrument(skip(self, message), fields(chars = message.chars().count()))]
    pub async fn invoke(&self, agent_id: &str, thread_id: &str, message: &str) -> InvocationResult {
        let started = Instant::now();
        let cursor = Mutex::new(Cursor {
            thread_id: thread_id.to_string(),
            posted_on: None,
        });
        let outcome = self
            .settings
            .retry
            .execute(|_| self.attempt(agent_id, &cursor, message))
            .await;

        self.finish(
            agent_id,
            thread_id.to_string(),
            outcome.result,
            outcome.attempts,
            started,
        )
    }

    /// Invoke `agent_id` on the thread belonging to `session_id`
    ///
    /// Before each retry the session gets a fresh thread when
    /// `fresh_thread_on_retry` is set. The returned `thread_id` is the
    /// thread used by the final attempt.
    #[instrument(skip(self, message), fields(chars = message.chars().count()))]
    pub async fn invoke_in_session(
        &self,
        agent_id: &str,
        session_id: &str,
        message: &str,
    ) -> InvocationResult {
        self.run_in_session(agent_id, session_id, message, None)
            .await
    }

    /// Like [`invoke_in_session`](Self::invoke_in_session) for a message
    /// already posted to `posted_on`
    ///
    /// While the session stays on that thread only a new run is started;
    /// after a switch to a fresh thread the message is posted there.
    #[instrument(skip(self, message), fields(chars = message.chars().count()))]
    pub async fn follow_up_in_session(
        &self,
        agent_id: &str,
        session_id: &str,
        posted_on: &str,
        message: &str,
    ) -> InvocationResult {
        self.run_in_session(agent_id, session_id, message, Some(posted_on.to_string()))
            .await
    }

    async fn run_in_session(
        &self,
        agent_id: &str,
        session_id: &str,
        message: &str,
        posted_on: Option<String>,
    ) -> InvocationResult {
        let started = Instant::now();
        let initial = match self.tracker.get_or_create_thread(session_id).await {
            Ok(thread_id) => thread_id,
            Err(e) => {
                return Self::fallback(agent_id, MOCK_THREAD.to_string(), 0, started, e.to_string());
            }
        };

        let cursor = Mutex::new(Cursor {
            thread_id: initial,
            posted_on,
        });
        let outcome = self
            .settings
            .retry
            .execute(|attempt| {
                let cursor = &cursor;
                async move {
                    if attempt > 1 && self.settings.fresh_thread_on_retry {
                        match self.tracker.reset_thread(session_id).await {
                            Ok(fresh) => cursor.lock().await.thread_id = fresh,
                            Err(e) => warn!(
                                session_id,
                                error = %e,
                                "Could not replace thread, retrying on the current one"
                            ),
                        }
                    }
                    self.attempt(agent_id, cursor, message).await
                }
            })
            .await;

        let thread_id = cursor.into_inner().thread_id;
        self.finish(agent_id, thread_id, outcome.result, outcome.attempts, started)
    }

    fn finish(
        &self,
        agent_id: &str,
        thread_id: String,
        result: Result<Reply, RuntimeError>,
        attempts: u32,
        started: Instant,
    ) -> InvocationResult {
        match result {
            Ok(reply) => {
                let elapsed = started.elapsed();
                info!(
                    agent_id,
                    thread_id = %thread_id,
                    run_id = %reply.run_id,
                    attempts,
                    elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "Agent replied"
                );
                InvocationResult {
                    text: reply.text,
                    agent_id: agent_id.to_string(),
                    thread_id,
                    run_id: Some(reply.run_id),
                    attempts,
                    elapsed,
                    outcome: InvocationOutcome::Completed,
                }
            }
            Err(e) => {
                warn!(
                    agent_id,
                    thread_id = %thread_id,
                    attempts,
                    max_attempts = self.settings.retry.max_attempts(),
                    error = %e,
                    "Agent invocation failed, using fallback reply"
                );
                Self::fallback(agent_id, thread_id, attempts, started, e.to_string())
            }
        }
    }

    fn fallback(
        agent_id: &str,
        thread_id: String,
        attempts: u32,
        started: Instant,
        reason: String,
    ) -> InvocationResult {
        InvocationResult {
            text: MOCK_RESPONSE.to_string(),
            agent_id: agent_id.to_string(),
            thread_id,
            run_id: None,
            attempts,
            elapsed: started.elapsed(),
            outcome: InvocationOutcome::Fallback { reason },
        }
    }

    /// One post → run → poll → read cycle; the post is skipped when the
    /// cursor's thread already holds the message
    async fn attempt(
        &self,
        agent_id: &str,
        cursor: &Mutex<Cursor>,
        message: &str,
    ) -> Result<Reply, RuntimeError> {
        let thread_id = {
            let mut cursor = cursor.lock().await;
            if cursor.posted_on.as_deref() != Some(cursor.thread_id.as_str()) {
                self.runtime.post_message(&cursor.thread_id, message).await?;
                cursor.posted_on = Some(cursor.thread_id.clone());
            }
            cursor.thread_id.clone()
        };

        let run = self.runtime.create_run(&thread_id, agent_id).await?;
        debug!(run_id = %run.id, thread_id, "Run started");

        let run = self.wait_for_run(run).await?;
        if run.status != RunStatus::Completed {
            return Err(RuntimeError::RunFailed {
                status: run.status,
                detail: run.last_error,
            });
        }

        let messages = self.runtime.list_messages(&thread_id).await?;
        let text = Message::reply_to_run(&messages, &run.id)
            .map(|m| m.content.trim())
            .filter(|text| !text.is_empty())
            .ok_or(RuntimeError::EmptyReply)?
            .to_string();

        Ok(Reply {
            text,
            run_id: run.id,
        })
    }

    /// Poll until the run is terminal or the run timeout passes
    async fn wait_for_run(&self, mut run: Run) -> Result<Run, RuntimeError> {
        let deadline = Instant::now() + self.settings.run_timeout;
        let mut polls = 0u32;

        while !run.status.is_terminal() {
            if Instant::now() >= deadline {
                return Err(RuntimeError::Timeout(format!(
                    "run {} still {} after {}s",
                    run.id,
                    run.status,
                    self.settings.run_timeout.as_secs()
                )));
            }
            sleep(self.settings.poll_interval).await;
            polls += 1;

            match self.runtime.get_run(&run.thread_id, &run.id).await {
                Ok(latest) => run = latest,
                Err(e) if e.is_transient() => {
                    warn!(run_id = %run.id, error = %e, "Transient error while polling run");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(run_id = %run.id, status = %run.status, polls, "Run finished");
        Ok(run)
    }
}
