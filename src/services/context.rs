//! Application context
//!
//! Owns everything a request needs: configuration, the runtime adapter,
//! the session tracker and the orchestrator. Built once at startup and
//! shared behind an `Arc`; there is no process-global state.

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::agent_invoker::{AgentInvoker, InvokerSettings};
use super::intent_classifier::IntentClassifier;
use super::orchestrator::{Backend, Orchestrator, OrchestratorSettings};
use super::session_tracker::SessionTracker;
use crate::domain::models::{AgentRole, Config};
use crate::domain::ports::AgentRuntime;
use crate::infrastructure::foundry::{Credential, FoundryClient, FoundryClientConfig};

/// Shortest pause between idle-session sweeps
const MIN_SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Shared application state
pub struct AppContext {
    config: Config,
    orchestrator: Arc<Orchestrator>,
    /// Agents created at startup, deleted again on shutdown
    provisioned: Mutex<Vec<String>>,
}

impl AppContext {
    /// Build the context from configuration
    ///
    /// Without a usable Foundry endpoint the context runs in offline mode
    /// and every message gets the canned reply.
    pub async fn init(config: Config) -> Result<Self> {
        let runtime: Option<Arc<dyn AgentRuntime>> =
            match FoundryClientConfig::from_foundry(&config.foundry) {
                Some(client_config) => {
                    let credential = Credential::from_config(&config.foundry.auth)
                        .context("Failed to set up Foundry credentials")?;
                    info!(
                        endpoint = %client_config.endpoint,
                        auth = ?credential,
                        "Connecting to Azure AI Foundry"
                    );
                    let client = FoundryClient::new(client_config, credential)
                        .context("Failed to build Foundry client")?;
                    Some(Arc::new(client))
                }
                None => {
                    warn!("No Foundry endpoint configured, running in offline mode");
                    None
                }
            };

        Self::with_runtime(config, runtime).await
    }

    /// Build the context around an existing runtime, or none for offline mode
    pub async fn with_runtime(
        mut config: Config,
        runtime: Option<Arc<dyn AgentRuntime>>,
    ) -> Result<Self> {
        let mut provisioned = Vec::new();
        if let Some(runtime) = &runtime {
            provisioned = Self::provision_agents(&mut config, &**runtime).await;
        }

        let classifier = IntentClassifier::new(config.routing.rules.clone());
        let agents = AgentRole::ALL
            .into_iter()
            .map(|role| config.agents.get(role).descriptor(role))
            .collect();

        let backend = runtime.map(|runtime| {
            let tracker = Arc::new(SessionTracker::new(Arc::clone(&runtime)));
            let invoker = Arc::new(AgentInvoker::new(
                Arc::clone(&runtime),
                Arc::clone(&tracker),
                InvokerSettings::from_config(&config),
            ));
            Backend {
                runtime,
                tracker,
                invoker,
            }
        });

        let orchestrator = Orchestrator::new(
            classifier,
            agents,
            backend,
            OrchestratorSettings::from_config(&config),
        );

        Ok(Self {
            config,
            orchestrator: Arc::new(orchestrator),
            provisioned: Mutex::new(provisioned),
        })
    }

    /// Create agents that have a provisioning block but no id
    async fn provision_agents(config: &mut Config, runtime: &dyn AgentRuntime) -> Vec<String> {
        let mut created = Vec::new();
        for role in AgentRole::ALL {
            let agent = config.agents.get(role);
            if agent.descriptor(role).configured_id().is_some() {
                continue;
            }
            let Some(definition) = agent.definition(&config.foundry.model_deployment) else {
                continue;
            };

            match runtime.create_agent(&definition).await {
                Ok(remote) => {
                    info!(%role, agent_id = %remote.id, name = %definition.name, "Provisioned agent");
                    config.agents.get_mut(role).id = Some(remote.id.clone());
                    created.push(remote.id);
                }
                Err(e) => warn!(%role, error = %e, "Agent provisioning failed"),
            }
        }
        created
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    pub fn orchestrator(&self) -> Arc<Orchestrator> {
        Arc::clone(&self.orchestrator)
    }

    /// Ids of agents created at startup
    pub async fn provisioned_agents(&self) -> Vec<String> {
        self.provisioned.lock().await.clone()
    }

    /// Periodically evict idle sessions when `server.session_idle_ttl_secs` is set
    pub fn spawn_session_sweeper(&self) -> Option<JoinHandle<()>> {
        let ttl = Duration::from_secs(self.config.server.session_idle_ttl_secs?);
        let tracker = Arc::clone(&self.orchestrator.backend()?.tracker);
        let period = (ttl / 2).max(MIN_SWEEP_INTERVAL);

        info!(ttl_secs = ttl.as_secs(), "Starting idle session sweeper");
        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                tracker.evict_idle(ttl).await;
            }
        }))
    }

    /// Release remote resources
    ///
    /// Deletes provisioned agents and, when configured, every tracked
    /// thread. Failures are logged and otherwise ignored.
    pub async fn shutdown(&self) {
        let Some(backend) = self.orchestrator.backend() else {
            return;
        };

        let agents = std::mem::take(&mut *self.provisioned.lock().await);
        for agent_id in agents {
            match backend.runtime.delete_agent(&agent_id).await {
                Ok(()) => info!(agent_id = %agent_id, "Deleted provisioned agent"),
                Err(e) => warn!(agent_id = %agent_id, error = %e, "Failed to delete agent"),
            }
        }

        if self.config.foundry.delete_threads_on_shutdown {
            let threads = backend.tracker.thread_ids().await;
            let total = threads.len();
            let mut deleted = 0;
            for thread_id in threads {
                match backend.runtime.delete_thread(&thread_id).await {
                    Ok(()) => deleted += 1,
                    Err(e) => warn!(thread_id = %thread_id, error = %e, "Failed to delete thread"),
                }
            }
            info!(deleted, total, "Deleted session threads");
        }
    }
}
