//! Chat command: terminal conversation with the assistants.
//!
//! Without `--message` this runs a small REPL. Besides plain messages it
//! understands `history` (print the current thread), `new` (start a new
//! session) and `quit`/`exit`/`bye`.

use anyhow::{Context, Result};
use console::style;
use serde::Serialize;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::output::{create_spinner, output, CommandOutput};
use crate::cli::types::ChatArgs;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    AgentRole, ChatRequest, Config, Message, MessageRole, NewSession, OrchestrationResult,
};
use crate::domain::ports::AgentRuntime;
use crate::infrastructure::runtime::InMemoryRuntime;
use crate::services::{AppContext, Orchestrator};

/// One line of REPL input
#[derive(Debug, PartialEq, Eq)]
pub enum ReplCommand {
    Quit,
    History,
    New,
    Send(String),
    Skip,
}

impl ReplCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        match line.to_lowercase().as_str() {
            "" => Self::Skip,
            "quit" | "exit" | "bye" => Self::Quit,
            "history" => Self::History,
            "new" => Self::New,
            _ => Self::Send(line.to_string()),
        }
    }
}

impl CommandOutput for OrchestrationResult {
    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if let Some(routing) = &self.routing_response {
            lines.push(format!("{} {routing}", style("[orchestrator]").cyan()));
        }
        let agent = format!("[{}]", self.agent_used);
        let agent = if self.degraded {
            style(agent).yellow()
        } else {
            style(agent).green()
        };
        lines.push(format!("{agent} {}", self.response));
        if let Some(error) = &self.error {
            lines.push(format!("{}", style(format!("({error})")).dim()));
        }
        lines.join("\n")
    }
}

#[derive(Debug, Serialize)]
pub struct HistoryOutput {
    pub thread_id: String,
    pub messages: Vec<Message>,
    pub total_messages: usize,
}

impl CommandOutput for HistoryOutput {
    fn to_human(&self) -> String {
        if self.messages.is_empty() {
            return "No messages yet.".to_string();
        }
        self.messages
            .iter()
            .map(|m| {
                let who = match m.role {
                    MessageRole::User => style("jij").bold(),
                    MessageRole::Assistant => style("assistent").green(),
                };
                format!("{} {who}: {}", m.created_at.format("%H:%M:%S"), m.content)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Conversation state carried between REPL turns
pub struct ChatSession {
    orchestrator: Arc<Orchestrator>,
    agent: Option<AgentRole>,
    session_id: Option<String>,
    thread_id: Option<String>,
}

impl ChatSession {
    pub const fn new(
        orchestrator: Arc<Orchestrator>,
        agent: Option<AgentRole>,
        session_id: Option<String>,
    ) -> Self {
        Self {
            orchestrator,
            agent,
            session_id,
            thread_id: None,
        }
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn thread_id(&self) -> Option<&str> {
        self.thread_id.as_deref()
    }

    /// Send one message, remembering the session for the next turn
    pub async fn send(&mut self, text: &str) -> DomainResult<OrchestrationResult> {
        let mut request = ChatRequest::new(text);
        request.session_id = self.session_id.clone();
        request.agent = self.agent;

        let result = self.orchestrator.handle(request).await?;
        self.session_id = Some(result.session_id.clone());
        self.thread_id = Some(result.thread_id.clone());
        Ok(result)
    }

    /// Messages of the current thread
    pub async fn history(&self) -> DomainResult<HistoryOutput> {
        let thread_id = self.thread_id.clone().unwrap_or_default();
        let messages = if thread_id.is_empty() {
            Vec::new()
        } else {
            self.orchestrator.history(&thread_id).await?
        };
        Ok(HistoryOutput {
            thread_id,
            total_messages: messages.len(),
            messages,
        })
    }

    /// Switch to a brand new session
    pub async fn reset(&mut self) -> DomainResult<NewSession> {
        let session = self.orchestrator.new_session().await?;
        self.session_id = Some(session.session_id.clone());
        self.thread_id = Some(session.thread_id.clone());
        Ok(session)
    }
}

/// Local stand-in agents for `--offline`
fn offline_runtime(config: &mut Config) -> InMemoryRuntime {
    let mut agents = Vec::new();
    for role in AgentRole::ALL {
        let agent = config.agents.get_mut(role);
        let id = agent
            .id
            .get_or_insert_with(|| format!("asst_local_{role}"))
            .clone();
        agents.push((id, agent.name.clone()));
    }
    let pairs: Vec<(&str, &str)> = agents
        .iter()
        .map(|(id, name)| (id.as_str(), name.as_str()))
        .collect();
    InMemoryRuntime::with_agents(&pairs)
}

pub async fn execute(args: ChatArgs, mut config: Config, json_mode: bool) -> Result<()> {
    let context = if args.offline {
        let runtime: Arc<dyn AgentRuntime> = Arc::new(offline_runtime(&mut config));
        AppContext::with_runtime(config, Some(runtime)).await?
    } else {
        AppContext::init(config).await?
    };

    let mut session = ChatSession::new(context.orchestrator(), args.agent, args.session);
    let result = match args.message {
        Some(message) => send_and_print(&mut session, &message, json_mode).await,
        None => repl(&mut session, json_mode).await,
    };

    context.shutdown().await;
    result
}

async fn send_and_print(session: &mut ChatSession, text: &str, json_mode: bool) -> Result<()> {
    let spinner = create_spinner("Thinking...", json_mode);
    let result = session.send(text).await;
    spinner.finish_and_clear();
    output(&result?, json_mode);
    Ok(())
}

async fn repl(session: &mut ChatSession, json_mode: bool) -> Result<()> {
    if !json_mode {
        println!(
            "{}",
            style("CBR assistent. Typ 'history', 'new' of 'quit'.").bold()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        if !json_mode {
            print!("{} ", style("jij>").cyan().bold());
            std::io::stdout().flush().context("Failed to flush stdout")?;
        }
        let Some(line) = lines.next_line().await.context("Failed to read stdin")? else {
            break;
        };

        match ReplCommand::parse(&line) {
            ReplCommand::Skip => {}
            ReplCommand::Quit => break,
            ReplCommand::History => output(&session.history().await?, json_mode),
            ReplCommand::New => {
                let new = session.reset().await?;
                if json_mode {
                    println!("{}", serde_json::to_string(&new)?);
                } else {
                    println!("New session {}", style(&new.session_id).bold());
                }
            }
            ReplCommand::Send(text) => match send_and_print(session, &text, json_mode).await {
                Ok(()) => {}
                Err(e) => match e.downcast_ref::<DomainError>() {
                    Some(DomainError::InvalidInput(reason)) => {
                        eprintln!("{} {reason}", style("Not sent:").yellow());
                    }
                    _ => return Err(e),
                },
            },
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::RuntimeMode;

    #[test]
    fn test_parse_repl_commands() {
        assert_eq!(ReplCommand::parse("  "), ReplCommand::Skip);
        assert_eq!(ReplCommand::parse("EXIT"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("bye\n"), ReplCommand::Quit);
        assert_eq!(ReplCommand::parse("history"), ReplCommand::History);
        assert_eq!(ReplCommand::parse("new"), ReplCommand::New);
        assert_eq!(
            ReplCommand::parse(" Wat kost een herexamen? "),
            ReplCommand::Send("Wat kost een herexamen?".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_session_keeps_thread() {
        let mut config = Config::default();
        config.routing.dual_response = false;
        let runtime: Arc<dyn AgentRuntime> = Arc::new(offline_runtime(&mut config));
        let context = AppContext::with_runtime(config, Some(runtime)).await.unwrap();
        assert_eq!(context.orchestrator().mode(), RuntimeMode::Online);

        let mut session = ChatSession::new(context.orchestrator(), None, None);
        let first = session.send("Hoe boek ik een examen?").await.unwrap();
        assert_eq!(first.agent_used, "booking");
        assert!(first.response.contains("asst_local_booking"));

        let second = session.send("En wat kost dat?").await.unwrap();
        assert_eq!(second.session_id, first.session_id);
        assert_eq!(second.thread_id, first.thread_id);

        let history = session.history().await.unwrap();
        assert_eq!(history.total_messages, 4);
        assert_eq!(history.messages[0].role, MessageRole::User);

        let old_session = session.session_id().map(str::to_string);
        session.reset().await.unwrap();
        assert_ne!(session.session_id().map(str::to_string), old_session);
        assert_ne!(session.thread_id(), Some(first.thread_id.as_str()));
    }
}
