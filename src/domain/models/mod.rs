pub mod agent;
pub mod config;
pub mod intent;
pub mod message;
pub mod orchestration;
pub mod run;
pub mod session;

pub use agent::{
    AgentDefinition, AgentDescriptor, AgentHealth, AgentRole, RemoteAgent, ToolSpec,
};
pub use config::{
    AgentConfig, AgentsConfig, AuthConfig, AuthMode, Config, FoundryConfig, LogFormat,
    LoggingConfig, PollingConfig, ProvisionConfig, RetryConfig, RotationPolicy, RoutingConfig,
    ServerConfig,
};
pub use intent::{default_keyword_rules, Classification, IntentLabel, KeywordRule};
pub use message::{Message, MessageRole};
pub use orchestration::{
    ChatRequest, InvocationOutcome, InvocationResult, NewSession, OrchestrationResult,
    RuntimeMode, StatusReport, MOCK_AGENT, MOCK_RESPONSE, MOCK_THREAD,
};
pub use run::{is_remote_id, Run, RunStatus};
pub use session::Session;
