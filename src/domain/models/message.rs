use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a thread message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    /// The remote runtime reports agent turns as `assistant` (older API versions use `agent`)
    #[serde(alias = "agent")]
    Assistant,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// One entry of a remote thread, mirrored locally
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
    /// Run that wrote the message; `None` for user messages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
}

impl Message {
    /// Newest assistant message written by `run_id`
    ///
    /// `messages` must be in chronological order; ties on `created_at` go to
    /// the later entry.
    pub fn reply_to_run<'a>(messages: &'a [Self], run_id: &str) -> Option<&'a Self> {
        messages
            .iter()
            .enumerate()
            .filter(|(_, m)| {
                m.role == MessageRole::Assistant && m.run_id.as_deref() == Some(run_id)
            })
            .max_by_key(|(position, m)| (m.created_at, *position))
            .map(|(_, m)| m)
    }
}
