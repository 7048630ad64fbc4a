use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::etp::{Answers, SessionStatus};
use crate::generation::GenerationStrategy;

/// Row as stored in `etp_sessions`. JSON blobs are kept as TEXT.
#[derive(Debug, Clone, FromRow)]
pub struct EtpSessionRow {
    pub id: Uuid,
    pub status: String,
    pub answers: String,
    pub preview_text: Option<String>,
    pub preview_strategy: Option<String>,
    pub final_artifact_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// One ETP generation lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct EtpSession {
    pub id: Uuid,
    pub status: SessionStatus,
    pub answers: Answers,
    pub preview_text: Option<String>,
    pub preview_strategy: Option<GenerationStrategy>,
    pub final_artifact_reference: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl EtpSession {
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            status: SessionStatus::Created,
            answers: Answers::default(),
            preview_text: None,
            preview_strategy: None,
            final_artifact_reference: None,
            created_at: now,
            updated_at: now,
            approved_at: None,
            completed_at: None,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    /// Drops the preview and anything derived from it.
    pub fn clear_preview(&mut self) {
        self.preview_text = None;
        self.preview_strategy = None;
        self.approved_at = None;
    }
}

impl Default for EtpSession {
    fn default() -> Self {
        Self::new()
    }
}

impl TryFrom<EtpSessionRow> for EtpSession {
    type Error = anyhow::Error;

    fn try_from(row: EtpSessionRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<SessionStatus>()?;
        let answers: Answers = serde_json::from_str(&row.answers)?;
        let preview_strategy = row
            .preview_strategy
            .as_deref()
            .map(str::parse::<GenerationStrategy>)
            .transpose()
            .map_err(|e| anyhow::anyhow!("preview_strategy: {e}"))?;

        Ok(Self {
            id: row.id,
            status,
            answers,
            preview_text: row.preview_text,
            preview_strategy,
            final_artifact_reference: row.final_artifact_reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
            approved_at: row.approved_at,
            completed_at: row.completed_at,
        })
    }
}
