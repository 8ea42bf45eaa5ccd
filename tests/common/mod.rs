//! Common test utilities for integration tests
//!
//! Builds contexts around the in-memory runtime so scenarios run without
//! network access.

#![allow(dead_code)]

use cbr_agents::domain::models::Config;
use cbr_agents::domain::ports::AgentRuntime;
use cbr_agents::infrastructure::runtime::InMemoryRuntime;
use cbr_agents::services::AppContext;
use std::sync::Arc;

pub const ORCHESTRATOR_ID: &str = "asst_orchestrator";
pub const SEARCH_ID: &str = "asst_search";
pub const BOOKING_ID: &str = "asst_booking";

/// Config with all three agent ids set and fast polling
pub fn online_config() -> Config {
    let mut config = Config::default();
    config.agents.orchestrator.id = Some(ORCHESTRATOR_ID.to_string());
    config.agents.search.id = Some(SEARCH_ID.to_string());
    config.agents.booking.id = Some(BOOKING_ID.to_string());
    config.polling.interval_ms = 100;
    config.retry.backoff_ms = 2000;
    config
}

/// Runtime that knows the three configured agents
pub fn runtime() -> Arc<InMemoryRuntime> {
    Arc::new(InMemoryRuntime::with_agents(&[
        (ORCHESTRATOR_ID, "Orchestrator"),
        (SEARCH_ID, "Search"),
        (BOOKING_ID, "Booking"),
    ]))
}

/// Context wired to `runtime`
pub async fn context(config: Config, runtime: &Arc<InMemoryRuntime>) -> AppContext {
    let runtime: Arc<dyn AgentRuntime> = runtime.clone();
    AppContext::with_runtime(config, Some(runtime))
        .await
        .expect("Failed to build context")
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
