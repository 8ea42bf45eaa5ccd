use async_trait::async_trait;
use reqwest::{Client as ReqwestClient, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use super::credentials::Credential;
use super::types::{
    AssistantObject, CreateAssistantRequest, CreateMessageRequest, CreateRunRequest, IdResponse,
    ListResponse, MessageObject, RunObject,
};
use crate::domain::errors::RuntimeError;
use crate::domain::models::{
    is_remote_id, AgentDefinition, FoundryConfig, Message, RemoteAgent, Run,
};
use crate::domain::ports::AgentRuntime;

/// Page size used when listing thread messages
const MESSAGE_PAGE_LIMIT: u32 = 100;

/// Configuration for the Foundry HTTP client
#[derive(Debug, Clone)]
pub struct FoundryClientConfig {
    /// Project endpoint without trailing slash
    pub endpoint: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl FoundryClientConfig {
    /// Client configuration for a usable endpoint, `None` for placeholders
    pub fn from_foundry(config: &FoundryConfig) -> Option<Self> {
        config.usable_endpoint().map(|endpoint| Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            timeout: Duration::from_secs(config.request_timeout_secs),
        })
    }
}

/// HTTP client for the Azure AI Foundry agents API
///
/// Every call maps non-success status codes through
/// [`RuntimeError::from_status`], so callers can decide on retries by
/// looking at [`RuntimeError::is_transient`].
#[derive(Debug)]
pub struct FoundryClient {
    http_client: ReqwestClient,
    config: FoundryClientConfig,
    credential: Credential,
}

impl FoundryClient {
    /// Create a new client
    ///
    /// # Returns
    /// * `Ok(FoundryClient)` - Client ready for use
    /// * `Err(RuntimeError::Network)` - HTTP client could not be built
    pub fn new(config: FoundryClientConfig, credential: Credential) -> Result<Self, RuntimeError> {
        let http_client = ReqwestClient::builder()
            .timeout(config.timeout)
            .pool_max_idle_per_host(10)
            .tcp_nodelay(true)
            .build()
            .map_err(|e| RuntimeError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            config,
            credential,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.config.endpoint, path)
    }

    /// Refuse ids that would change the request path or query
    fn checked_id(id: &str) -> Result<&str, RuntimeError> {
        if is_remote_id(id) {
            Ok(id)
        } else {
            Err(RuntimeError::InvalidRequest(format!("malformed id {id:?}")))
        }
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, RuntimeError> {
        let builder = self
            .http_client
            .request(method, self.url(path))
            .query(&[("api-version", self.config.api_version.as_str())]);
        self.credential.apply(builder).await
    }

    async fn send(builder: RequestBuilder) -> Result<Response, RuntimeError> {
        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                RuntimeError::Timeout(e.to_string())
            } else {
                RuntimeError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Failed to read error response".to_string());
        warn!(status = status.as_u16(), "Foundry request failed");
        Err(RuntimeError::from_status(status.as_u16(), body))
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, RuntimeError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(method, path).await?.json(body);
        let response = Self::send(builder).await?;
        response
            .json()
            .await
            .map_err(|e| RuntimeError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, RuntimeError> {
        let builder = self.request(Method::GET, path).await?.query(query);
        let response = Self::send(builder).await?;
        response
            .json()
            .await
            .map_err(|e| RuntimeError::Decode(e.to_string()))
    }

    async fn delete(&self, path: &str) -> Result<(), RuntimeError> {
        let builder = self.request(Method::DELETE, path).await?;
        Self::send(builder).await.map(|_| ())
    }
}

#[async_trait]
impl AgentRuntime for FoundryClient {
    #[instrument(skip(self), err)]
    async fn create_thread(&self) -> Result<String, RuntimeError> {
        let thread: IdResponse = self.send_json(Method::POST, "threads", &json!({})).await?;
        debug!(thread_id = %thread.id, "Created thread");
        Ok(thread.id)
    }

    #[instrument(skip(self), err)]
    async fn delete_thread(&self, thread_id: &str) -> Result<(), RuntimeError> {
        let thread_id = Self::checked_id(thread_id)?;
        self.delete(&format!("threads/{thread_id}")).await
    }

    #[instrument(skip(self, content), fields(chars = content.chars().count()), err)]
    async fn post_message(&self, thread_id: &str, content: &str) -> Result<String, RuntimeError> {
        let thread_id = Self::checked_id(thread_id)?;
        let message: IdResponse = self
            .send_json(
                Method::POST,
                &format!("threads/{thread_id}/messages"),
                &CreateMessageRequest::user(content),
            )
            .await?;
        Ok(message.id)
    }

    #[instrument(skip(self), err)]
    async fn create_run(&self, thread_id: &str, agent_id: &str) -> Result<Run, RuntimeError> {
        let thread_id = Self::checked_id(thread_id)?;
        let run: RunObject = self
            .send_json(
                Method::POST,
                &format!("threads/{thread_id}/runs"),
                &CreateRunRequest {
                    assistant_id: agent_id,
                },
            )
            .await?;
        debug!(run_id = %run.id, status = %run.status, "Created run");
        Ok(run.into())
    }

    #[instrument(skip(self), level = "debug", err)]
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, RuntimeError> {
        let thread_id = Self::checked_id(thread_id)?;
        let run_id = Self::checked_id(run_id)?;
        let run: RunObject = self
            .get_json(&format!("threads/{thread_id}/runs/{run_id}"), &[])
            .await?;
        Ok(run.into())
    }

    #[instrument(skip(self), err)]
    async fn list_messages(&self, thread_id: &str) -> Result<Vec<Message>, RuntimeError> {
        let path = format!("threads/{}/messages", Self::checked_id(thread_id)?);
        let limit = MESSAGE_PAGE_LIMIT.to_string();
        let mut messages = Vec::new();
        let mut after: Option<String> = None;
        loop {
            // Oldest first, so the listing is chronological
            let mut query = vec![("limit", limit.as_str()), ("order", "asc")];
            if let Some(cursor) = &after {
                query.push(("after", cursor.as_str()));
            }
            let page: ListResponse<MessageObject> = self.get_json(&path, &query).await?;
            messages.extend(page.data.into_iter().map(Message::from));
            match (page.has_more, page.last_id) {
                (true, Some(last_id)) => after = Some(last_id),
                _ => break,
            }
        }
        Ok(messages)
    }

    #[instrument(skip(self), err)]
    async fn get_agent(&self, agent_id: &str) -> Result<RemoteAgent, RuntimeError> {
        let agent_id = Self::checked_id(agent_id)?;
        let agent: AssistantObject = self
            .get_json(&format!("assistants/{agent_id}"), &[])
            .await?;
        Ok(agent.into())
    }

    #[instrument(skip(self, definition), fields(name = %definition.name), err)]
    async fn create_agent(
        &self,
        definition: &AgentDefinition,
    ) -> Result<RemoteAgent, RuntimeError> {
        let agent: AssistantObject = self
            .send_json(
                Method::POST,
                "assistants",
                &CreateAssistantRequest::from(definition),
            )
            .await?;
        Ok(agent.into())
    }

    #[instrument(skip(self), err)]
    async fn delete_agent(&self, agent_id: &str) -> Result<(), RuntimeError> {
        let agent_id = Self::checked_id(agent_id)?;
        self.delete(&format!("assistants/{agent_id}")).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_strips_trailing_slash() {
        let foundry = FoundryConfig {
            endpoint: Some("https://cbr.services.ai.azure.com/api/projects/p1/".to_string()),
            ..FoundryConfig::default()
        };
        let config = FoundryClientConfig::from_foundry(&foundry).unwrap();
        assert_eq!(
            config.endpoint,
            "https://cbr.services.ai.azure.com/api/projects/p1"
        );
        assert_eq!(config.timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_placeholder_endpoint_yields_no_config() {
        let foundry = FoundryConfig {
            endpoint: Some("https://your-project.services.ai.azure.com".to_string()),
            ..FoundryConfig::default()
        };
        assert!(FoundryClientConfig::from_foundry(&foundry).is_none());
    }
}
