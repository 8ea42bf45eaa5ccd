/// Domain model for chat sessions.
///
/// A session binds a caller-visible identifier to exactly one remote
/// conversation thread at a time.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Chat session mapped to a remote thread
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Caller-supplied or generated session identifier
    pub id: String,

    /// Remote thread currently backing this session
    pub thread_id: String,

    /// When the session was first seen
    pub created_at: DateTime<Utc>,

    /// Last time a message used this session
    pub last_used_at: DateTime<Utc>,
}

impl Session {
    /// Creates a session bound to `thread_id`
    pub fn new(id: String, thread_id: String) -> Self {
        let now = Utc::now();
        Self {
            id,
            thread_id,
            created_at: now,
            last_used_at: now,
        }
    }

    /// Generates a fresh session identifier (`session_` + 8 hex chars)
    pub fn generate_id() -> String {
        let uuid = Uuid::new_v4().simple().to_string();
        format!("session_{}", &uuid[..8])
    }

    /// Marks the session as used now
    pub fn touch(&mut self) {
        self.last_used_at = Utc::now();
    }

    /// Whether the session has been idle for longer than `max_idle`
    pub fn is_idle(&self, max_idle: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_used_at > max_idle
    }
}
