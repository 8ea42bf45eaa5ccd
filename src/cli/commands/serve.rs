//! Serve command: run the HTTP chat API until interrupted.

use anyhow::Result;
use tracing::info;

use crate::api::{shutdown_signal, ApiServer};
use crate::cli::types::ServeArgs;
use crate::domain::models::Config;
use crate::services::AppContext;

pub async fn execute(args: ServeArgs, mut config: Config) -> Result<()> {
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let server_config = config.server.clone();
    let context = AppContext::init(config).await?;
    info!(mode = ?context.orchestrator().mode(), "Starting chat API");

    let sweeper = context.spawn_session_sweeper();
    let result = ApiServer::new(context.orchestrator(), server_config)
        .serve_with_shutdown(shutdown_signal())
        .await;

    if let Some(handle) = sweeper {
        handle.abort();
    }
    context.shutdown().await;
    result
}
