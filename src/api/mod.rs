//! HTTP chat API
//!
//! A thin axum layer over the [`Orchestrator`](crate::services::Orchestrator).
//! Validation failures become `400 {"error": "validation_error"}`; remote
//! failures are already folded into the orchestration result.

pub mod error;
pub mod handlers;
pub mod server;

pub use error::{ApiError, ErrorResponse};
pub use handlers::{AppState, HealthResponse, HistoryResponse, SessionDeleted, SessionsResponse};
pub use server::{shutdown_signal, ApiServer};
