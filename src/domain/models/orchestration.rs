//! Request and result types flowing through the orchestrator.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use super::agent::{AgentHealth, AgentRole};
use super::intent::IntentLabel;

/// Canned reply used whenever the remote runtime cannot answer
pub const MOCK_RESPONSE: &str = "De assistent werkt op dit moment in offline-modus en kan je vraag \
niet doorsturen naar een specialist. Probeer het later opnieuw of kijk op cbr.nl voor actuele \
informatie over examens, kosten en reserveren.";

/// `agent_used` value for mock replies
pub const MOCK_AGENT: &str = "mock";

/// `thread_id` value for replies that never reached a thread
pub const MOCK_THREAD: &str = "mock-thread";

/// Inbound chat message
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,

    /// Continue an existing conversation; generated when absent
    #[serde(default)]
    pub session_id: Option<String>,

    /// Skip classification and address this agent directly
    #[serde(default, alias = "agent_type")]
    pub agent: Option<AgentRole>,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    #[must_use]
    pub fn with_session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    #[must_use]
    pub const fn with_agent(mut self, agent: AgentRole) -> Self {
        self.agent = Some(agent);
        self
    }
}

/// How an invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The agent produced a reply
    Completed,
    /// Every attempt failed, or a permanent error stopped retrying; text is [`MOCK_RESPONSE`]
    Fallback { reason: String },
}

/// Result of one agent invocation, including retries
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationResult {
    /// Reply text, or the canned fallback
    pub text: String,
    pub agent_id: String,
    /// Thread used by the final attempt
    pub thread_id: String,
    pub run_id: Option<String>,
    /// Attempts made, including the successful one
    pub attempts: u32,
    pub elapsed: Duration,
    pub outcome: InvocationOutcome,
}

impl InvocationResult {
    pub const fn is_completed(&self) -> bool {
        matches!(self.outcome, InvocationOutcome::Completed)
    }

    /// Failure reason for fallback results
    pub fn fallback_reason(&self) -> Option<&str> {
        match &self.outcome {
            InvocationOutcome::Completed => None,
            InvocationOutcome::Fallback { reason } => Some(reason),
        }
    }
}

/// Structured reply returned to the caller for every handled message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestrationResult {
    pub success: bool,
    pub response: String,
    /// `orchestrator`, `search`, `booking`, or `mock`
    pub agent_used: String,
    /// Classified intent, absent when an agent was addressed directly
    #[serde(skip_serializing_if = "Option::is_none")]
    pub intent: Option<IntentLabel>,
    pub session_id: String,
    pub thread_id: String,
    /// Orchestrator acknowledgement preceding the specialist answer
    #[serde(skip_serializing_if = "Option::is_none")]
    pub routing_response: Option<String>,
    /// Failure or degradation reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// True when `response` is the canned offline reply
    pub degraded: bool,
    pub response_time_ms: u64,
}

impl OrchestrationResult {
    /// Reply produced by a live agent
    pub fn completed(
        role: AgentRole,
        intent: Option<IntentLabel>,
        session_id: String,
        thread_id: String,
        response: String,
    ) -> Self {
        Self {
            success: true,
            response,
            agent_used: role.to_string(),
            intent,
            session_id,
            thread_id,
            routing_response: None,
            error: None,
            degraded: false,
            response_time_ms: 0,
        }
    }

    /// Canned reply; still a successful exchange from the caller's point of view
    pub fn mock(
        intent: Option<IntentLabel>,
        session_id: String,
        thread_id: String,
        reason: Option<String>,
    ) -> Self {
        Self {
            success: true,
            response: MOCK_RESPONSE.to_string(),
            agent_used: MOCK_AGENT.to_string(),
            intent,
            session_id,
            thread_id,
            routing_response: None,
            error: reason,
            degraded: true,
            response_time_ms: 0,
        }
    }

    /// Failed exchange; carries the canned reply so the chat stays usable
    pub fn failed(intent: Option<IntentLabel>, session_id: String, error: String) -> Self {
        Self {
            success: false,
            error: Some(error),
            ..Self::mock(intent, session_id, MOCK_THREAD.to_string(), None)
        }
    }

    #[must_use]
    pub fn with_routing_response(mut self, routing_response: Option<String>) -> Self {
        self.routing_response = routing_response;
        self
    }

    #[must_use]
    pub fn with_elapsed(mut self, elapsed: Duration) -> Self {
        self.response_time_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self
    }
}

/// A freshly opened conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    pub session_id: String,
    pub thread_id: String,
}

/// Overall reachability of the agent runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeMode {
    Online,
    Offline,
}

/// Body of the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: RuntimeMode,
    pub agents: BTreeMap<AgentRole, AgentHealth>,
    pub active_sessions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failed_result_keeps_canned_reply() {
        let result = OrchestrationResult::failed(
            Some(IntentLabel::Booking),
            "s1".to_string(),
            "thread creation failed".to_string(),
        );
        assert!(!result.success);
        assert!(result.degraded);
        assert_eq!(result.response, MOCK_RESPONSE);
        assert_eq!(result.agent_used, MOCK_AGENT);
        assert_eq!(result.thread_id, MOCK_THREAD);
        assert_eq!(result.error.as_deref(), Some("thread creation failed"));
    }

    #[test]
    fn test_result_json_shape() {
        let result = OrchestrationResult::completed(
            AgentRole::Search,
            Some(IntentLabel::Pricing),
            "s1".to_string(),
            "thread_1".to_string(),
            "Het theorie-examen kost...".to_string(),
        )
        .with_elapsed(Duration::from_millis(1500));

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["success"], true);
        assert_eq!(json["agent_used"], "search");
        assert_eq!(json["intent"], "pricing");
        assert_eq!(json["thread_id"], "thread_1");
        assert_eq!(json["response_time_ms"], 1500);
        assert!(json.get("error").is_none());
        assert!(json.get("routing_response").is_none());
    }

    #[test]
    fn test_chat_request_defaults() {
        let request: ChatRequest = serde_json::from_str(r#"{"message": "hoi"}"#).unwrap();
        assert_eq!(request.message, "hoi");
        assert!(request.session_id.is_none());
        assert!(request.agent.is_none());

        let request: ChatRequest =
            serde_json::from_str(r#"{"message": "hoi", "agent": "booking"}"#).unwrap();
        assert_eq!(request.agent, Some(AgentRole::Booking));
    }
}
