use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::agent::{AgentDefinition, AgentDescriptor, AgentRole, ToolSpec};
use super::intent::{default_keyword_rules, KeywordRule};

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Remote agent runtime connection
    #[serde(default)]
    pub foundry: FoundryConfig,

    /// Hosted agent ids and metadata
    #[serde(default)]
    pub agents: AgentsConfig,

    /// Intent routing configuration
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Retry policy configuration
    #[serde(default)]
    pub retry: RetryConfig,

    /// Run polling configuration
    #[serde(default)]
    pub polling: PollingConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Longest accepted message, in characters
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,

    /// Drop sessions idle for longer than this; `None` keeps them for the process lifetime
    #[serde(default)]
    pub session_idle_ttl_secs: Option<u64>,

    /// Allowed browser origins; empty allows any origin
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

const fn default_port() -> u16 {
    8000
}

const fn default_max_message_chars() -> usize {
    4000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://localhost:8000".to_string(),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_message_chars: default_max_message_chars(),
            session_idle_ttl_secs: None,
            cors_origins: default_cors_origins(),
        }
    }
}

/// Azure AI Foundry project connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct FoundryConfig {
    /// Project endpoint, e.g. `https://<resource>.services.ai.azure.com/api/projects/<project>`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    #[serde(default)]
    pub auth: AuthConfig,

    /// Per-request HTTP timeout in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Model deployment used when provisioning agents without an explicit model
    #[serde(default = "default_model_deployment")]
    pub model_deployment: String,

    /// Delete every tracked thread on shutdown
    #[serde(default)]
    pub delete_threads_on_shutdown: bool,
}

fn default_api_version() -> String {
    "v1".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

fn default_model_deployment() -> String {
    "gpt-4o".to_string()
}

impl Default for FoundryConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_version: default_api_version(),
            auth: AuthConfig::default(),
            request_timeout_secs: default_request_timeout_secs(),
            model_deployment: default_model_deployment(),
            delete_threads_on_shutdown: false,
        }
    }
}

impl FoundryConfig {
    /// Endpoint if it is set and not a template placeholder
    pub fn usable_endpoint(&self) -> Option<&str> {
        self.endpoint
            .as_deref()
            .map(str::trim)
            .filter(|e| !e.is_empty() && !e.starts_with("https://your-"))
    }
}

/// How requests to the runtime are authenticated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMode {
    /// `api-key` header
    ApiKey,
    /// Static bearer token
    Bearer,
    /// Token from `az account get-access-token`
    #[default]
    AzureCli,
    /// No authentication header (local emulators)
    None,
}

/// Authentication settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuthConfig {
    #[serde(default)]
    pub mode: AuthMode,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub token: Option<String>,
}

/// Per-agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentConfig {
    /// Remote agent id
    #[serde(default)]
    pub id: Option<String>,

    pub name: String,

    #[serde(default)]
    pub model: Option<String>,

    #[serde(default)]
    pub description: Option<String>,

    /// Create the agent at startup when `id` is absent
    #[serde(default)]
    pub provision: Option<ProvisionConfig>,
}

impl AgentConfig {
    fn named(name: &str, description: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            model: None,
            description: Some(description.to_string()),
            provision: None,
        }
    }

    /// Descriptor for `role` built from this configuration
    pub fn descriptor(&self, role: AgentRole) -> AgentDescriptor {
        AgentDescriptor {
            role,
            remote_id: self.id.clone(),
            name: self.name.clone(),
            model: self.model.clone(),
            description: self.description.clone(),
        }
    }

    /// Definition used to provision this agent, if provisioning is configured
    pub fn definition(&self, default_model: &str) -> Option<AgentDefinition> {
        let provision = self.provision.as_ref()?;
        let mut tools = Vec::new();
        if let Some(connection_id) = &provision.bing_connection_id {
            tools.push(ToolSpec::BingGrounding {
                connection_id: connection_id.clone(),
            });
        }
        if !provision.vector_store_ids.is_empty() {
            tools.push(ToolSpec::FileSearch {
                vector_store_ids: provision.vector_store_ids.clone(),
            });
        }
        Some(AgentDefinition {
            name: self.name.clone(),
            model: self
                .model
                .clone()
                .unwrap_or_else(|| default_model.to_string()),
            instructions: provision.instructions.clone(),
            description: self.description.clone(),
            tools,
        })
    }
}

/// Remote agent provisioning settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ProvisionConfig {
    /// System prompt
    pub instructions: String,

    /// Bing grounding connection for live web search
    #[serde(default)]
    pub bing_connection_id: Option<String>,

    /// Vector stores for file search
    #[serde(default)]
    pub vector_store_ids: Vec<String>,
}

/// The three hosted agents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AgentsConfig {
    #[serde(default = "default_orchestrator")]
    pub orchestrator: AgentConfig,

    #[serde(default = "default_search")]
    pub search: AgentConfig,

    #[serde(default = "default_booking")]
    pub booking: AgentConfig,
}

fn default_orchestrator() -> AgentConfig {
    AgentConfig::named(
        "Orchestrator",
        "Routes questions to the right specialist",
    )
}

fn default_search() -> AgentConfig {
    AgentConfig::named(
        "Search",
        "Answers questions about theory, practical exams, costs and documents",
    )
}

fn default_booking() -> AgentConfig {
    AgentConfig::named("Booking", "Helps with booking, moving and cancelling exams")
}

impl Default for AgentsConfig {
    fn default() -> Self {
        Self {
            orchestrator: default_orchestrator(),
            search: default_search(),
            booking: default_booking(),
        }
    }
}

impl AgentsConfig {
    /// Configuration for `role`
    pub const fn get(&self, role: AgentRole) -> &AgentConfig {
        match role {
            AgentRole::Orchestrator => &self.orchestrator,
            AgentRole::Search => &self.search,
            AgentRole::Booking => &self.booking,
        }
    }

    /// Mutable configuration for `role`
    pub fn get_mut(&mut self, role: AgentRole) -> &mut AgentConfig {
        match role {
            AgentRole::Orchestrator => &mut self.orchestrator,
            AgentRole::Search => &mut self.search,
            AgentRole::Booking => &mut self.booking,
        }
    }
}

/// Intent routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RoutingConfig {
    /// Ask the orchestrator agent for a routing acknowledgement before the specialist
    #[serde(default = "default_true")]
    pub dual_response: bool,

    /// Keyword table, highest priority first
    #[serde(default = "default_keyword_rules")]
    pub rules: Vec<KeywordRule>,
}

const fn default_true() -> bool {
    true
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            dual_response: true,
            rules: default_keyword_rules(),
        }
    }
}

/// Retry policy configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Total attempts per invocation, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Fixed wait between attempts
    #[serde(default = "default_backoff_ms")]
    pub backoff_ms: u64,

    /// Replace the session's thread before retrying
    #[serde(default = "default_true")]
    pub fresh_thread_on_retry: bool,
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_backoff_ms() -> u64 {
    2000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            backoff_ms: default_backoff_ms(),
            fresh_thread_on_retry: true,
        }
    }
}

/// Run polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PollingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Wall-clock limit for one run
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

const fn default_interval_ms() -> u64 {
    1000
}

const fn default_timeout_secs() -> u64 {
    60
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Log file rotation
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}
