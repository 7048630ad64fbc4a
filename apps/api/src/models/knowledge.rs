use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Reference document injected into generation prompts while active.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct KnowledgeEntry {
    pub id: Uuid,
    pub filename: String,
    #[serde(skip_serializing)]
    pub content: String,
    pub content_hash: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}
