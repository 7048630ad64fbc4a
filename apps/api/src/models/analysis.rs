use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::analysis::AnalysisResult;
use crate::etp::Answers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisStatus {
    Pending,
    Processing,
    Done,
    Error,
}

impl AnalysisStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AnalysisStatus::Pending => "pending",
            AnalysisStatus::Processing => "processing",
            AnalysisStatus::Done => "done",
            AnalysisStatus::Error => "error",
        }
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AnalysisStatus::Pending),
            "processing" => Ok(AnalysisStatus::Processing),
            "done" => Ok(AnalysisStatus::Done),
            "error" => Ok(AnalysisStatus::Error),
            other => anyhow::bail!("unknown analysis status '{other}'"),
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DocumentAnalysisRow {
    pub id: Uuid,
    pub session_id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub file_type: String,
    pub extracted_text: Option<String>,
    pub analysis_result: Option<String>,
    pub extracted_answers: String,
    pub missing_info: String,
    pub status: String,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One uploaded file and what the analyzer made of it.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentAnalysis {
    pub id: Uuid,
    pub session_id: Uuid,
    pub filename: String,
    pub file_size: i64,
    pub file_type: String,
    #[serde(skip_serializing)]
    pub extracted_text: Option<String>,
    pub analysis_result: Option<AnalysisResult>,
    pub extracted_answers: Answers,
    pub missing_info: Vec<String>,
    pub status: AnalysisStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentAnalysis {
    pub fn pending(session_id: Uuid, filename: &str, file_size: usize, file_type: &str) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            session_id,
            filename: filename.to_string(),
            file_size: file_size as i64,
            file_type: file_type.to_string(),
            extracted_text: None,
            analysis_result: None,
            extracted_answers: Answers::default(),
            missing_info: Vec::new(),
            status: AnalysisStatus::Pending,
            error_message: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// First `max_chars` characters of the extracted text, for prompt context.
    pub fn excerpt(&self, max_chars: usize) -> Option<String> {
        self.extracted_text
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(|t| t.chars().take(max_chars).collect())
    }
}

impl TryFrom<DocumentAnalysisRow> for DocumentAnalysis {
    type Error = anyhow::Error;

    fn try_from(row: DocumentAnalysisRow) -> Result<Self, Self::Error> {
        let analysis_result = row
            .analysis_result
            .as_deref()
            .map(serde_json::from_str::<AnalysisResult>)
            .transpose()?;

        Ok(Self {
            id: row.id,
            session_id: row.session_id,
            filename: row.filename,
            file_size: row.file_size,
            file_type: row.file_type,
            extracted_text: row.extracted_text,
            analysis_result,
            extracted_answers: serde_json::from_str(&row.extracted_answers)?,
            missing_info: serde_json::from_str(&row.missing_info)?,
            status: row.status.parse()?,
            error_message: row.error_message,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
