//! Wire types for the Foundry agents REST API.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::models::{
    AgentDefinition, Message, MessageRole, RemoteAgent, Run, RunStatus, ToolSpec,
};

/// Response body of any create call that only needs the id
#[derive(Debug, Clone, Deserialize)]
pub struct IdResponse {
    pub id: String,
}

/// Body of `POST /threads/{id}/messages`
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

impl<'a> CreateMessageRequest<'a> {
    pub const fn user(content: &'a str) -> Self {
        Self {
            role: "user",
            content,
        }
    }
}

/// Body of `POST /threads/{id}/runs`
#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunObject {
    pub id: String,
    pub thread_id: String,
    pub assistant_id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

impl From<RunObject> for Run {
    fn from(run: RunObject) -> Self {
        let last_error = run.last_error.map(|e| match (e.code, e.message) {
            (Some(code), Some(message)) => format!("{code}: {message}"),
            (Some(only), None) | (None, Some(only)) => only,
            (None, None) => "unknown error".to_string(),
        });
        Self {
            id: run.id,
            thread_id: run.thread_id,
            agent_id: run.assistant_id,
            status: run.status,
            last_error,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TextValue {
    pub value: String,
}

/// One content part of a message; only text parts carry reply text
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: TextValue },
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MessageObject {
    pub id: String,
    pub role: MessageRole,
    #[serde(default)]
    pub content: Vec<ContentPart>,
    /// Unix seconds
    pub created_at: i64,
    #[serde(default)]
    pub run_id: Option<String>,
}

impl From<MessageObject> for Message {
    fn from(message: MessageObject) -> Self {
        let content = message
            .content
            .into_iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.value),
                ContentPart::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");
        Self {
            id: message.id,
            role: message.role,
            content,
            created_at: timestamp(message.created_at),
            run_id: message.run_id,
        }
    }
}

fn timestamp(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Paged list envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssistantObject {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub model: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl From<AssistantObject> for RemoteAgent {
    fn from(agent: AssistantObject) -> Self {
        Self {
            id: agent.id,
            name: agent.name,
            model: agent.model,
            description: agent.description,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BingConnection {
    pub connection_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BingGrounding {
    pub search_configurations: Vec<BingConnection>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ToolDefinition {
    BingGrounding { bing_grounding: BingGrounding },
    FileSearch,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSearchResources {
    pub vector_store_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolResources {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_search: Option<FileSearchResources>,
}

/// Body of `POST /assistants`
#[derive(Debug, Clone, Serialize)]
pub struct CreateAssistantRequest {
    pub model: String,
    pub name: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub tools: Vec<ToolDefinition>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_resources: Option<ToolResources>,
}

impl From<&AgentDefinition> for CreateAssistantRequest {
    fn from(definition: &AgentDefinition) -> Self {
        let mut tools = Vec::new();
        let mut resources = ToolResources::default();
        for tool in &definition.tools {
            match tool {
                ToolSpec::BingGrounding { connection_id } => {
                    tools.push(ToolDefinition::BingGrounding {
                        bing_grounding: BingGrounding {
                            search_configurations: vec![BingConnection {
                                connection_id: connection_id.clone(),
                            }],
                        },
                    });
                }
                ToolSpec::FileSearch { vector_store_ids } => {
                    tools.push(ToolDefinition::FileSearch);
                    resources.file_search = Some(FileSearchResources {
                        vector_store_ids: vector_store_ids.clone(),
                    });
                }
            }
        }
        Self {
            model: definition.model.clone(),
            name: definition.name.clone(),
            instructions: definition.instructions.clone(),
            description: definition.description.clone(),
            tools,
            tool_resources: resources.file_search.is_some().then_some(resources),
        }
    }
}
