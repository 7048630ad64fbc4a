use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::llm_client::{ChatTurn, Role};

#[derive(Debug, Clone, FromRow)]
pub struct ChatSessionRow {
    pub id: Uuid,
    pub history: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatEntry {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

impl From<&ChatEntry> for ChatTurn {
    fn from(entry: &ChatEntry) -> Self {
        ChatTurn {
            role: entry.role,
            content: entry.content.clone(),
        }
    }
}

/// Append-only chat transcript.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub history: Vec<ChatEntry>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// New active chat seeded with a single assistant entry.
    pub fn seeded(welcome: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            history: vec![ChatEntry::new(Role::Assistant, welcome)],
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn append(&mut self, role: Role, content: impl Into<String>) {
        self.history.push(ChatEntry::new(role, content));
        self.updated_at = Utc::now();
    }

    /// Logical reset: the transcript becomes the seeded welcome entry again.
    pub fn reseed(&mut self, welcome: &str) {
        self.history = vec![ChatEntry::new(Role::Assistant, welcome)];
        self.updated_at = Utc::now();
    }

    /// Last `n` entries, oldest first.
    pub fn recent(&self, n: usize) -> &[ChatEntry] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }
}

impl TryFrom<ChatSessionRow> for ChatSession {
    type Error = anyhow::Error;

    fn try_from(row: ChatSessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            history: serde_json::from_str(&row.history)?,
            active: row.active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
