//! Classify command: show how a message would be routed.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, truncate, CommandOutput};
use crate::domain::models::{AgentRole, Config, IntentLabel};
use crate::services::IntentClassifier;

#[derive(Debug, Serialize)]
pub struct ClassifyOutput {
    pub message: String,
    pub intent: IntentLabel,
    pub matched: Option<String>,
    pub target_agent: AgentRole,
}

impl CommandOutput for ClassifyOutput {
    fn to_human(&self) -> String {
        format!(
            "Message: {}\nIntent:  {}\nKeyword: {}\nAgent:   {}",
            truncate(&self.message, 60),
            self.intent,
            self.matched.as_deref().unwrap_or("-"),
            self.target_agent
        )
    }
}

pub fn classify(classifier: &IntentClassifier, text: &str) -> ClassifyOutput {
    let classification = classifier.classify(text);
    ClassifyOutput {
        message: text.to_string(),
        intent: classification.label,
        matched: classification.matched,
        target_agent: classification.label.target_role(),
    }
}

pub fn execute(text: &str, config: &Config, json_mode: bool) -> Result<()> {
    let classifier = IntentClassifier::new(config.routing.rules.clone());
    output(&classify(&classifier, text), json_mode);
    Ok(())
}
