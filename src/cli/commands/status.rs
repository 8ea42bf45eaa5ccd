//! Status command: agent reachability as a table.

use anyhow::Result;
use comfy_table::{presets, Cell, CellAlignment, Color, ContentArrangement, Table};
use serde::Serialize;

use crate::cli::output::{create_spinner, output, truncate, CommandOutput};
use crate::domain::models::{AgentHealth, Config, RuntimeMode, StatusReport};
use crate::services::AppContext;

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct StatusOutput(pub StatusReport);

impl CommandOutput for StatusOutput {
    fn to_human(&self) -> String {
        let report = &self.0;
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_header(
                ["AGENT", "STATUS", "ID", "DETAIL"]
                    .iter()
                    .map(|h| Cell::new(h).set_alignment(CellAlignment::Left)),
            );

        for (role, health) in &report.agents {
            let (id, detail) = match health {
                AgentHealth::Online { id, name, model } => (
                    id.as_str(),
                    format!("{} ({model})", name.as_deref().unwrap_or("-")),
                ),
                AgentHealth::Offline => ("-", "mock mode".to_string()),
                AgentHealth::NotConfigured { message } => ("-", message.clone()),
                AgentHealth::Error { id, error } => (id.as_str(), truncate(error, 60)),
            };
            let colour = match health {
                AgentHealth::Online { .. } => Color::Green,
                AgentHealth::Offline | AgentHealth::NotConfigured { .. } => Color::Yellow,
                AgentHealth::Error { .. } => Color::Red,
            };
            table.add_row(vec![
                Cell::new(role),
                Cell::new(health.label()).fg(colour),
                Cell::new(id),
                Cell::new(detail),
            ]);
        }

        let mode = match report.status {
            RuntimeMode::Online => "online",
            RuntimeMode::Offline => "offline",
        };
        format!(
            "Runtime: {mode}   Active sessions: {}\n{table}",
            report.active_sessions
        )
    }
}

pub async fn execute(config: Config, json_mode: bool) -> Result<()> {
    let context = AppContext::init(config).await?;
    let spinner = create_spinner("Checking agents...", json_mode);
    let report = context.orchestrator().status().await;
    spinner.finish_and_clear();

    output(&StatusOutput(report), json_mode);
    context.shutdown().await;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::AgentRole;
    use std::collections::BTreeMap;

    #[test]
    fn test_renders_every_agent() {
        let mut agents = BTreeMap::new();
        agents.insert(
            AgentRole::Orchestrator,
            AgentHealth::Online {
                id: "asst_orch".to_string(),
                name: Some("Orchestrator".to_string()),
                model: "gpt-4o".to_string(),
            },
        );
        agents.insert(
            AgentRole::Search,
            AgentHealth::NotConfigured {
                message: "no agent id for search".to_string(),
            },
        );
        agents.insert(
            AgentRole::Booking,
            AgentHealth::Error {
                id: "asst_booking".to_string(),
                error: "not found".to_string(),
            },
        );
        let out = StatusOutput(StatusReport {
            status: RuntimeMode::Online,
            agents,
            active_sessions: 2,
        });

        let human = out.to_human();
        assert!(human.contains("Active sessions: 2"));
        assert!(human.contains("asst_orch"));
        assert!(human.contains("not_configured"));
        assert!(human.contains("asst_booking"));

        let json = out.to_json();
        assert_eq!(json["status"], "online");
        assert_eq!(json["agents"]["booking"]["status"], "error");
    }
}
