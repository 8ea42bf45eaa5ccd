use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Logical role of a hosted agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRole {
    /// Front-door agent that acknowledges and routes
    Orchestrator,
    /// General information specialist (theory, costs, documents, web search)
    #[serde(alias = "theory", alias = "agent1")]
    Search,
    /// Exam booking specialist
    #[serde(alias = "practical", alias = "agent2")]
    Booking,
}

impl AgentRole {
    /// All roles in display order
    pub const ALL: [Self; 3] = [Self::Orchestrator, Self::Search, Self::Booking];

    /// Returns the role as its wire string
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Orchestrator => "orchestrator",
            Self::Search => "search",
            Self::Booking => "booking",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentRole {
    type Err = anyhow::Error;

    /// Accepts the role names plus the aliases used by older deployments
    /// (`agent1`/`theory` for search, `agent2`/`practical` for booking).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "orchestrator" => Ok(Self::Orchestrator),
            "search" | "theory" | "agent1" => Ok(Self::Search),
            "booking" | "practical" | "agent2" => Ok(Self::Booking),
            _ => Err(anyhow::anyhow!(
                "Invalid agent: {s}. Use 'orchestrator', 'search', or 'booking'"
            )),
        }
    }
}

/// Static description of a configured agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDescriptor {
    /// Logical role
    pub role: AgentRole,

    /// Remote agent id, `None` when not configured
    pub remote_id: Option<String>,

    /// Display name
    pub name: String,

    /// Model deployment the agent runs on
    pub model: Option<String>,

    /// Human-readable description
    pub description: Option<String>,
}

impl AgentDescriptor {
    /// Remote id if it is configured and non-blank
    pub fn configured_id(&self) -> Option<&str> {
        self.remote_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Agent metadata as reported by the remote runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteAgent {
    pub id: String,
    pub name: Option<String>,
    pub model: String,
    pub description: Option<String>,
}

/// Tool attached to a provisioned agent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolSpec {
    /// Live web search grounding through a Bing connection
    BingGrounding { connection_id: String },
    /// Retrieval over pre-indexed vector stores
    FileSearch { vector_store_ids: Vec<String> },
}

/// Everything needed to create an agent remotely
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentDefinition {
    pub name: String,
    pub model: String,
    pub instructions: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tools: Vec<ToolSpec>,
}

/// Reachability of one agent, as shown by the status endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AgentHealth {
    /// Agent resolved on the runtime
    Online {
        id: String,
        name: Option<String>,
        model: String,
    },
    /// No runtime is configured, requests are answered in mock mode
    Offline,
    /// Agent id missing from configuration
    NotConfigured { message: String },
    /// Lookup failed
    Error { id: String, error: String },
}

impl AgentHealth {
    /// Short status keyword
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Online { .. } => "online",
            Self::Offline => "offline",
            Self::NotConfigured { .. } => "not_configured",
            Self::Error { .. } => "error",
        }
    }
}
