//! Request orchestration
//!
//! Validates a chat message, classifies it, resolves the session thread,
//! optionally asks the orchestrator agent for a routing acknowledgement,
//! invokes the specialist, and folds every remote failure into an
//! [`OrchestrationResult`].

use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{info, instrument, warn};

use super::agent_invoker::AgentInvoker;
use super::intent_classifier::IntentClassifier;
use super::session_tracker::SessionTracker;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    is_remote_id, AgentDescriptor, AgentHealth, AgentRole, ChatRequest, Config, IntentLabel,
    Message, NewSession, OrchestrationResult, RuntimeMode, Session, StatusReport, MOCK_THREAD,
};
use crate::domain::ports::AgentRuntime;

/// Orchestrator behaviour switches
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Longest accepted message, in characters
    pub max_message_chars: usize,
    /// Ask the orchestrator agent for a routing acknowledgement first
    pub dual_response: bool,
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_message_chars: config.server.max_message_chars,
            dual_response: config.routing.dual_response,
        }
    }
}

/// Remote side of the orchestrator; absent in offline mode
pub struct Backend {
    pub runtime: Arc<dyn AgentRuntime>,
    pub tracker: Arc<SessionTracker>,
    pub invoker: Arc<AgentInvoker>,
}

/// Routes chat messages to the right agent
pub struct Orchestrator {
    classifier: IntentClassifier,
    agents: BTreeMap<AgentRole, AgentDescriptor>,
    backend: Option<Backend>,
    settings: OrchestratorSettings,
}

impl Orchestrator {
    /// Create an orchestrator; `backend` of `None` answers every message in mock mode
    pub fn new(
        classifier: IntentClassifier,
        agents: Vec<AgentDescriptor>,
        backend: Option<Backend>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            classifier,
            agents: agents.into_iter().map(|a| (a.role, a)).collect(),
            backend,
            settings,
        }
    }

    pub const fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub const fn backend(&self) -> Option<&Backend> {
        self.backend.as_ref()
    }

    pub const fn mode(&self) -> RuntimeMode {
        if self.backend.is_some() {
            RuntimeMode::Online
        } else {
            RuntimeMode::Offline
        }
    }

    /// Configured remote id for `role`
    pub fn agent_id(&self, role: AgentRole) -> Option<&str> {
        self.agents.get(&role).and_then(AgentDescriptor::configured_id)
    }

    /// Reject empty and oversized messages before any remote call
    pub fn validate(&self, message: &str) -> DomainResult<()> {
        if message.trim().is_empty() {
            return Err(DomainError::InvalidInput(
                "message must not be empty".to_string(),
            ));
        }
        let chars = message.chars().count();
        if chars > self.settings.max_message_chars {
            return Err(DomainError::InvalidInput(format!(
                "message is {chars} characters long, the limit is {}",
                self.settings.max_message_chars
            )));
        }
        Ok(())
    }

    /// Handle one chat message
    ///
    /// # Errors
    /// Only `DomainError::InvalidInput`; remote failures are reported
    /// inside the result
    #[instrument(skip(self, request), fields(session_id = request.session_id.as_deref(), agent = ?request.agent), err)]
    pub async fn handle(&self, request: ChatRequest) -> DomainResult<OrchestrationResult> {
        let started = Instant::now();
        self.validate(&request.message)?;

        let session_id = request
            .session_id
            .filter(|id| !id.trim().is_empty())
            .unwrap_or_else(Session::generate_id);

        let (target, intent) = match request.agent {
            Some(role) => (role, None),
            None => {
                let classification = self.classifier.classify(&request.message);
                info!(
                    intent = %classification.label,
                    matched = classification.matched.as_deref().unwrap_or("-"),
                    "Message classified"
                );
                (classification.label.target_role(), Some(classification.label))
            }
        };

        let result = self
            .dispatch(&request.message, session_id, target, intent)
            .await
            .with_elapsed(started.elapsed());

        info!(
            success = result.success,
            degraded = result.degraded,
            agent_used = %result.agent_used,
            response_time_ms = result.response_time_ms,
            "Message handled"
        );
        Ok(result)
    }

    async fn dispatch(
        &self,
        message: &str,
        session_id: String,
        target: AgentRole,
        intent: Option<IntentLabel>,
    ) -> OrchestrationResult {
        let Some(backend) = &self.backend else {
            return OrchestrationResult::mock(intent, session_id, MOCK_THREAD.to_string(), None);
        };

        let Some(agent_id) = self.agent_id(target) else {
            let missing = DomainError::ConfigurationMissing(format!("no agent id for {target}"));
            warn!(%target, "Target agent not configured, answering in mock mode");
            return OrchestrationResult::mock(
                intent,
                session_id,
                MOCK_THREAD.to_string(),
                Some(missing.to_string()),
            );
        };

        if let Err(e) = backend.tracker.get_or_create_thread(&session_id).await {
            return OrchestrationResult::failed(intent, session_id, e.to_string());
        }

        // Thread already holding the user message after a routing reply
        let mut posted_on = None;
        let routing_response = match self.routing_agent(target) {
            Some(orchestrator_id) => {
                let routing = backend
                    .invoker
                    .invoke_in_session(orchestrator_id, &session_id, message)
                    .await;
                if routing.is_completed() {
                    posted_on = Some(routing.thread_id);
                    Some(routing.text)
                } else {
                    warn!(
                        reason = routing.fallback_reason().unwrap_or_default(),
                        "Routing acknowledgement unavailable, continuing with specialist"
                    );
                    None
                }
            }
            None => None,
        };

        let invocation = match &posted_on {
            Some(thread_id) => {
                backend
                    .invoker
                    .follow_up_in_session(agent_id, &session_id, thread_id, message)
                    .await
            }
            None => {
                backend
                    .invoker
                    .invoke_in_session(agent_id, &session_id, message)
                    .await
            }
        };

        let result = if invocation.is_completed() {
            OrchestrationResult::completed(
                target,
                intent,
                session_id,
                invocation.thread_id,
                invocation.text,
            )
        } else {
            let reason = invocation.fallback_reason().map(str::to_string);
            OrchestrationResult::mock(intent, session_id, invocation.thread_id, reason)
        };
        result.with_routing_response(routing_response)
    }

    /// Orchestrator agent id when a routing acknowledgement should precede `target`
    fn routing_agent(&self, target: AgentRole) -> Option<&str> {
        if !self.settings.dual_response || target == AgentRole::Orchestrator {
            return None;
        }
        self.agent_id(AgentRole::Orchestrator)
    }

    /// Reachability of every configured agent
    #[instrument(skip(self))]
    pub async fn status(&self) -> StatusReport {
        let Some(backend) = &self.backend else {
            return StatusReport {
                status: RuntimeMode::Offline,
                agents: AgentRole::ALL
                    .into_iter()
                    .map(|role| (role, AgentHealth::Offline))
                    .collect(),
                active_sessions: 0,
            };
        };

        let mut agents = BTreeMap::new();
        for role in AgentRole::ALL {
            let health = match self.agent_id(role) {
                None => AgentHealth::NotConfigured {
                    message: DomainError::ConfigurationMissing(format!("no agent id for {role}"))
                        .to_string(),
                },
                Some(id) => match backend.runtime.get_agent(id).await {
                    Ok(agent) => AgentHealth::Online {
                        id: agent.id,
                        name: agent.name,
                        model: agent.model,
                    },
                    Err(e) => {
                        warn!(%role, agent_id = id, error = %e, "Agent lookup failed");
                        AgentHealth::Error {
                            id: id.to_string(),
                            error: e.to_string(),
                        }
                    }
                },
            };
            agents.insert(role, health);
        }

        let any_online = agents
            .values()
            .any(|health| matches!(health, AgentHealth::Online { .. }));

        StatusReport {
            status: if any_online {
                RuntimeMode::Online
            } else {
                RuntimeMode::Offline
            },
            agents,
            active_sessions: backend.tracker.len().await,
        }
    }

    /// Messages of a thread in chronological order; empty in offline mode
    ///
    /// # Errors
    /// `DomainError::InvalidInput` for ids that are not runtime-shaped,
    /// `DomainError::Runtime` when the runtime cannot list the thread
    #[instrument(skip(self), err)]
    pub async fn history(&self, thread_id: &str) -> DomainResult<Vec<Message>> {
        if !is_remote_id(thread_id) {
            return Err(DomainError::InvalidInput(format!(
                "malformed thread id {thread_id:?}"
            )));
        }
        let Some(backend) = &self.backend else {
            return Ok(Vec::new());
        };
        let mut messages = backend.runtime.list_messages(thread_id).await?;
        messages.sort_by_key(|m| m.created_at);
        Ok(messages)
    }

    /// Tracked sessions, most recently used first; empty in offline mode
    pub async fn sessions(&self) -> Vec<Session> {
        match &self.backend {
            Some(backend) => backend.tracker.list().await,
            None => Vec::new(),
        }
    }

    /// Forget a session and delete its remote thread
    ///
    /// # Errors
    /// `DomainError::SessionNotFound` for unknown sessions. A failed thread
    /// deletion is logged only.
    #[instrument(skip(self), err)]
    pub async fn delete_session(&self, session_id: &str) -> DomainResult<Session> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| DomainError::SessionNotFound(session_id.to_string()))?;
        let session = backend
            .tracker
            .remove(session_id)
            .await
            .ok_or_else(|| DomainError::SessionNotFound(session_id.to_string()))?;
        Self::discard_thread(backend, &session.thread_id).await;
        Ok(session)
    }

    /// Keep the session but move it to an empty thread
    ///
    /// # Errors
    /// `DomainError::SessionNotFound` for unknown sessions,
    /// `DomainError::RemoteUnavailable` when no new thread can be created
    #[instrument(skip(self), err)]
    pub async fn clear_session(&self, session_id: &str) -> DomainResult<NewSession> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| DomainError::SessionNotFound(session_id.to_string()))?;
        let previous = backend
            .tracker
            .get(session_id)
            .await
            .ok_or_else(|| DomainError::SessionNotFound(session_id.to_string()))?;
        let thread_id = backend.tracker.reset_thread(session_id).await?;
        Self::discard_thread(backend, &previous.thread_id).await;
        Ok(NewSession {
            session_id: session_id.to_string(),
            thread_id,
        })
    }

    async fn discard_thread(backend: &Backend, thread_id: &str) {
        if let Err(e) = backend.runtime.delete_thread(thread_id).await {
            warn!(thread_id, error = %e, "Could not delete thread");
        }
    }

    /// Open a session and create its thread right away
    ///
    /// # Errors
    /// `DomainError::RemoteUnavailable` when the thread cannot be created
    #[instrument(skip(self), err)]
    pub async fn new_session(&self) -> DomainResult<NewSession> {
        let session_id = Session::generate_id();
        let thread_id = match &self.backend {
            Some(backend) => backend.tracker.get_or_create_thread(&session_id).await?,
            None => MOCK_THREAD.to_string(),
        };
        Ok(NewSession {
            session_id,
            thread_id,
        })
    }
}
