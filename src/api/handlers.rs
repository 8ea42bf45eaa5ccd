use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ApiError;
use crate::domain::models::{
    AgentRole, ChatRequest, Message, NewSession, OrchestrationResult, Session, StatusReport,
};
use crate::services::Orchestrator;

/// Shared state for the HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

/// Body of `GET /health`
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub version: String,
}

/// Body of `GET /api/v1/history/{thread_id}`
#[derive(Debug, Serialize, Deserialize)]
pub struct HistoryResponse {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub total_messages: usize,
}

/// Body of `GET /api/v1/sessions`
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<Session>,
    pub total_sessions: usize,
}

/// Body of `DELETE /api/v1/sessions/{session_id}`
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionDeleted {
    pub session_id: String,
    pub message: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<OrchestrationResult>, ApiError> {
    let Json(request) = body?;
    let result = state.orchestrator.handle(request).await?;
    Ok(Json(result))
}

pub async fn chat_with_agent(
    State(state): State<AppState>,
    Path(agent): Path<String>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<OrchestrationResult>, ApiError> {
    let role: AgentRole = agent
        .parse()
        .map_err(|e: anyhow::Error| ApiError::Validation(e.to_string()))?;
    let Json(request) = body?;
    let result = state.orchestrator.handle(request.with_agent(role)).await?;
    Ok(Json(result))
}

pub async fn status(State(state): State<AppState>) -> Json<StatusReport> {
    Json(state.orchestrator.status().await)
}

pub async fn new_session(State(state): State<AppState>) -> Result<Json<NewSession>, ApiError> {
    Ok(Json(state.orchestrator.new_session().await?))
}

pub async fn history(
    State(state): State<AppState>,
    Path(thread_id): Path<String>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let messages = state.orchestrator.history(&thread_id).await?;
    Ok(Json(HistoryResponse {
        thread_id,
        total_messages: messages.len(),
        messages,
    }))
}

pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    let sessions = state.orchestrator.sessions().await;
    Json(SessionsResponse {
        total_sessions: sessions.len(),
        sessions,
    })
}

pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionDeleted>, ApiError> {
    let session = state.orchestrator.delete_session(&session_id).await?;
    Ok(Json(SessionDeleted {
        session_id: session.id,
        message: "Session deleted successfully".to_string(),
    }))
}

pub async fn clear_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<NewSession>, ApiError> {
    Ok(Json(state.orchestrator.clear_session(&session_id).await?))
}
