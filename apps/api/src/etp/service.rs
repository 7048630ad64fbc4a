//! ETP session lifecycle.
//!
//! Flow:
//!   1. `create_session` → created
//!   2. `submit_answers` (or auto-fill from `upload_document`) → validated
//!   3. `generate_preview` → preview_generated (repeatable, `adjust_preview` revises)
//!   4. `approve_preview` → approved
//!   5. `finalize` renders the DOCX → completed
//!
//! Every stage is guarded by `lifecycle::check`. A failed session write marks
//! the session `error` on a best-effort basis.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::analysis::{DocumentAnalyzer, FileKind};
use crate::errors::AppError;
use crate::generation::strategy::MAX_KNOWLEDGE_ENTRIES;
use crate::generation::{
    DocumentGenerator, GenerationContext, GenerationMode, GenerationStrategy,
};
use crate::models::{AnalysisStatus, DocumentAnalysis, EtpSession};
use crate::render::{ArtifactStorage, DocumentFormatter, DocumentMetadata};
use crate::store::{KnowledgeStore, SessionStore};

use super::lifecycle::{check, SessionStatus, Transition};
use super::questions::{Answers, Question, QUESTIONS};

pub const FINAL_DOCUMENT_TITLE: &str = "ESTUDO TÉCNICO PRELIMINAR (ETP)";

#[derive(Debug, Serialize)]
pub struct AnalysisSummary {
    pub id: Uuid,
    pub filename: String,
    pub file_type: String,
    pub status: AnalysisStatus,
    pub created_at: chrono::DateTime<Utc>,
}

impl From<&DocumentAnalysis> for AnalysisSummary {
    fn from(a: &DocumentAnalysis) -> Self {
        Self {
            id: a.id,
            filename: a.filename.clone(),
            file_type: a.file_type.clone(),
            status: a.status,
            created_at: a.created_at,
        }
    }
}

/// Status projection returned by `get_session`.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub status: SessionStatus,
    pub answers: Answers,
    pub answers_validated: bool,
    pub preview_available: bool,
    pub preview_approved: bool,
    pub final_document_available: bool,
    pub preview_strategy: Option<GenerationStrategy>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub approved_at: Option<chrono::DateTime<Utc>>,
    pub completed_at: Option<chrono::DateTime<Utc>>,
    pub analyses: Vec<AnalysisSummary>,
}

#[derive(Debug, Serialize)]
pub struct QuestionsView {
    pub questions: &'static [Question],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_answers: Option<Answers>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missing_info: Option<Vec<String>>,
}

#[derive(Debug, Serialize)]
pub struct UploadOutcome {
    pub analysis_id: Uuid,
    pub extracted_answers: Answers,
    pub missing_info: Vec<String>,
    pub auto_filled: bool,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct PreviewOutcome {
    pub preview: String,
    pub strategy: GenerationStrategy,
    pub sections_found: usize,
    pub used_fallback: bool,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct StoredPreview {
    pub preview: String,
    pub strategy: Option<GenerationStrategy>,
    pub status: SessionStatus,
}

#[derive(Debug, Serialize)]
pub struct AdjustOutcome {
    pub preview: String,
    pub adjusted: bool,
}

#[derive(Debug, Serialize)]
pub struct FinalizeOutcome {
    pub download_url: String,
    pub artifact_reference: String,
    pub status: SessionStatus,
}

/// Rendered document bytes with a download filename.
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Merges extracted answers into a session that the user has not validated
/// yet and flips it to validated. Returns whether anything was applied.
fn apply_extracted(session: &mut EtpSession, extracted: &Answers) -> bool {
    if session.status != SessionStatus::Created || extracted.is_empty() {
        return false;
    }
    session.answers.merge_from(extracted);
    session.status = SessionStatus::Validated;
    session.touch();
    true
}

pub struct EtpService {
    sessions: Arc<dyn SessionStore>,
    knowledge: Arc<dyn KnowledgeStore>,
    analyzer: Arc<dyn DocumentAnalyzer>,
    generator: Arc<DocumentGenerator>,
    formatter: Arc<dyn DocumentFormatter>,
    storage: Arc<dyn ArtifactStorage>,
}

impl EtpService {
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        knowledge: Arc<dyn KnowledgeStore>,
        analyzer: Arc<dyn DocumentAnalyzer>,
        generator: Arc<DocumentGenerator>,
        formatter: Arc<dyn DocumentFormatter>,
        storage: Arc<dyn ArtifactStorage>,
    ) -> Self {
        Self {
            sessions,
            knowledge,
            analyzer,
            generator,
            formatter,
            storage,
        }
    }

    async fn load(&self, id: Uuid) -> Result<EtpSession, AppError> {
        self.sessions
            .get_session(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Session {id} not found")))
    }

    /// Saves the session; on failure the session is moved to `error`.
    async fn persist(&self, session: &EtpSession) -> Result<(), AppError> {
        if let Err(e) = self.sessions.save_session(session).await {
            self.mark_failed(session.id).await;
            return Err(e);
        }
        Ok(())
    }

    async fn mark_failed(&self, id: Uuid) {
        if let Err(e) = self.sessions.mark_error(id).await {
            warn!("Could not mark session {id} as error: {e}");
        }
    }

    // ────────────────────────────────────────────────────────────────
    // Intake
    // ────────────────────────────────────────────────────────────────

    pub async fn create_session(&self) -> Result<EtpSession, AppError> {
        let session = EtpSession::new();
        self.sessions.insert_session(&session).await?;
        info!("Created ETP session {}", session.id);
        Ok(session)
    }

    pub async fn questions(&self, session_id: Option<Uuid>) -> Result<QuestionsView, AppError> {
        let mut view = QuestionsView {
            questions: &QUESTIONS,
            extracted_answers: None,
            missing_info: None,
        };
        if let Some(id) = session_id {
            self.load(id).await?;
            if let Some(analysis) = self.sessions.latest_completed_analysis(id).await? {
                view.extracted_answers = Some(analysis.extracted_answers);
                view.missing_info = Some(analysis.missing_info);
            }
        }
        Ok(view)
    }

    /// Replaces the answers after checking all five; any preview or approval
    /// is discarded and the session returns to validated.
    pub async fn submit_answers(
        &self,
        id: Uuid,
        raw: &Map<String, Value>,
    ) -> Result<EtpSession, AppError> {
        let mut session = self.load(id).await?;
        check(session.status, Transition::SubmitAnswers)?;

        let answers = Answers::from_raw(raw);
        let invalid = answers.invalid_questions();
        if !invalid.is_empty() {
            return Err(AppError::Validation {
                message: format!("{} required answer(s) missing or invalid", invalid.len()),
                missing_questions: invalid.iter().map(|q| q.text.to_string()).collect(),
            });
        }

        session.answers = answers;
        session.clear_preview();
        session.status = SessionStatus::Validated;
        session.touch();
        self.persist(&session).await?;

        info!("Session {id} answers validated");
        Ok(session)
    }

    /// Applies answers extracted from a document. Only a session still in
    /// `created` is auto-filled; otherwise nothing changes.
    pub async fn ingest_document_analysis(
        &self,
        id: Uuid,
        extracted: &Answers,
    ) -> Result<(EtpSession, bool), AppError> {
        let mut session = self.load(id).await?;
        check(session.status, Transition::IngestAnalysis)?;

        let auto_filled = apply_extracted(&mut session, extracted);
        if auto_filled {
            self.persist(&session).await?;
            info!("Session {id} auto-filled from document analysis");
        }
        Ok((session, auto_filled))
    }

    pub async fn upload_document(
        &self,
        id: Uuid,
        filename: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadOutcome, AppError> {
        let mut session = self.load(id).await?;
        check(session.status, Transition::IngestAnalysis)?;

        let kind = FileKind::from_filename(filename).ok_or_else(|| {
            AppError::validation(format!(
                "Unsupported file type for {filename}; use .pdf, .docx or .txt"
            ))
        })?;

        let mut analysis = DocumentAnalysis::pending(id, filename, bytes.len(), kind.as_str());
        self.sessions.insert_analysis(&analysis).await?;

        analysis.status = AnalysisStatus::Processing;
        analysis.updated_at = Utc::now();
        self.sessions.save_analysis(&analysis).await?;

        let analyzed = match self.analyzer.extract_text(bytes, kind).await {
            Ok(text) => {
                analysis.extracted_text = Some(text.clone());
                self.analyzer.analyze(&text).await
            }
            Err(e) => Err(e),
        };

        let result = match analyzed {
            Ok(result) => result,
            Err(e) => {
                error!("Analysis {} of {filename} failed: {e}", analysis.id);
                analysis.status = AnalysisStatus::Error;
                analysis.error_message = Some(e.to_string());
                analysis.updated_at = Utc::now();
                if let Err(save) = self.sessions.save_analysis(&analysis).await {
                    warn!("Could not record failed analysis {}: {save}", analysis.id);
                }
                return Err(AppError::ExternalService(e.to_string()));
            }
        };

        let extracted = self.analyzer.extract_answers(&result);
        analysis.extracted_answers = extracted.clone();
        analysis.missing_info = result.missing_questions();
        analysis.analysis_result = Some(result);
        analysis.status = AnalysisStatus::Done;
        analysis.updated_at = Utc::now();

        let auto_filled = apply_extracted(&mut session, &extracted);
        if auto_filled {
            if let Err(e) = self
                .sessions
                .save_analysis_with_session(&analysis, &session)
                .await
            {
                self.mark_failed(id).await;
                return Err(e);
            }
            info!("Session {id} auto-filled from {filename}");
        } else {
            self.sessions.save_analysis(&analysis).await?;
        }

        Ok(UploadOutcome {
            analysis_id: analysis.id,
            extracted_answers: extracted,
            missing_info: analysis.missing_info,
            auto_filled,
            status: session.status,
        })
    }

    pub async fn list_analyses(&self, id: Uuid) -> Result<Vec<DocumentAnalysis>, AppError> {
        self.load(id).await?;
        self.sessions.list_analyses(id).await
    }

    // ────────────────────────────────────────────────────────────────
    // Preview
    // ────────────────────────────────────────────────────────────────

    /// Generates (or regenerates) the preview. Upstream failures never
    /// surface here: the generator falls back to the deterministic document.
    pub async fn generate_preview(
        &self,
        id: Uuid,
        strategy: Option<GenerationStrategy>,
        mode: GenerationMode,
    ) -> Result<PreviewOutcome, AppError> {
        let mut session = self.load(id).await?;
        check(session.status, Transition::GeneratePreview)?;

        let analysis = self.sessions.latest_completed_analysis(id).await?;
        let knowledge = self.knowledge.list_active(MAX_KNOWLEDGE_ENTRIES).await?;
        let context = GenerationContext::assemble(analysis.as_ref(), &knowledge);

        let document = self
            .generator
            .generate(strategy, &session.answers, &context, mode)
            .await;

        session.clear_preview();
        session.preview_text = Some(document.text.clone());
        session.preview_strategy = Some(document.strategy);
        session.status = SessionStatus::PreviewGenerated;
        session.touch();
        self.persist(&session).await?;

        info!(
            "Session {id} preview generated with {} ({} sections, fallback: {})",
            document.strategy, document.sections_found, document.used_fallback
        );
        Ok(PreviewOutcome {
            preview: document.text,
            strategy: document.strategy,
            sections_found: document.sections_found,
            used_fallback: document.used_fallback,
            status: session.status,
        })
    }

    pub async fn get_preview(&self, id: Uuid) -> Result<StoredPreview, AppError> {
        let session = self.load(id).await?;
        let preview = session
            .preview_text
            .ok_or_else(|| AppError::NotFound(format!("Session {id} has no preview")))?;
        Ok(StoredPreview {
            preview,
            strategy: session.preview_strategy,
            status: session.status,
        })
    }

    /// Revises the preview per feedback. The current preview is kept when the
    /// revision fails or loses sections.
    pub async fn adjust_preview(&self, id: Uuid, feedback: &str) -> Result<AdjustOutcome, AppError> {
        let feedback = feedback.trim();
        if feedback.is_empty() {
            return Err(AppError::validation("Feedback must not be empty"));
        }

        let mut session = self.load(id).await?;
        check(session.status, Transition::AdjustPreview)?;
        let current = session
            .preview_text
            .clone()
            .ok_or_else(|| AppError::Precondition("No preview to adjust".to_string()))?;

        let revised = match self.generator.adjust(&current, feedback).await {
            Ok(revised) => revised,
            Err(e) => {
                warn!("Session {id} preview adjustment failed: {e}");
                None
            }
        };

        let Some(revised) = revised else {
            return Ok(AdjustOutcome {
                preview: current,
                adjusted: false,
            });
        };

        session.preview_text = Some(revised.clone());
        session.touch();
        self.persist(&session).await?;
        info!("Session {id} preview adjusted");

        Ok(AdjustOutcome {
            preview: revised,
            adjusted: true,
        })
    }

    pub async fn approve_preview(&self, id: Uuid) -> Result<EtpSession, AppError> {
        let mut session = self.load(id).await?;
        check(session.status, Transition::Approve)?;
        if session.preview_text.is_none() {
            return Err(AppError::Precondition("No preview to approve".to_string()));
        }

        let now = Utc::now();
        session.status = SessionStatus::Approved;
        session.approved_at = Some(now);
        session.updated_at = now;
        self.persist(&session).await?;

        info!("Session {id} preview approved");
        Ok(session)
    }

    // ────────────────────────────────────────────────────────────────
    // Final document
    // ────────────────────────────────────────────────────────────────

    /// Renders the approved preview. A rendering failure leaves the session
    /// approved so finalize can be retried.
    pub async fn finalize(&self, id: Uuid) -> Result<FinalizeOutcome, AppError> {
        let mut session = self.load(id).await?;
        check(session.status, Transition::Finalize)?;
        let text = session
            .preview_text
            .as_deref()
            .ok_or_else(|| AppError::Precondition("No approved preview".to_string()))?;

        let metadata = DocumentMetadata {
            session_id: id,
            title: FINAL_DOCUMENT_TITLE.to_string(),
            generated_at: Utc::now(),
            answers: session.answers.clone(),
        };
        let reference = self
            .formatter
            .render(text, &metadata)
            .await
            .map_err(|e| AppError::Generation(e.to_string()))?;

        session.final_artifact_reference = Some(reference.clone());
        session.status = SessionStatus::Completed;
        session.completed_at = Some(metadata.generated_at);
        session.touch();
        self.persist(&session).await?;

        info!("Session {id} completed: {reference}");
        Ok(FinalizeOutcome {
            download_url: format!("/api/v1/sessions/{id}/download"),
            artifact_reference: reference,
            status: session.status,
        })
    }

    pub async fn download(&self, id: Uuid) -> Result<Download, AppError> {
        let session = self.load(id).await?;
        let reference = match (session.status, session.final_artifact_reference) {
            (SessionStatus::Completed, Some(reference)) => reference,
            _ => {
                return Err(AppError::NotFound(format!(
                    "Session {id} has no final document"
                )))
            }
        };

        let bytes = self
            .storage
            .get(&reference)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;
        let filename = reference
            .rsplit('/')
            .next()
            .unwrap_or("ETP.docx")
            .to_string();
        Ok(Download { filename, bytes })
    }

    // ────────────────────────────────────────────────────────────────
    // Inspection
    // ────────────────────────────────────────────────────────────────

    pub async fn get_session(&self, id: Uuid) -> Result<SessionView, AppError> {
        let session = self.load(id).await?;
        let analyses = self.sessions.list_analyses(id).await?;
        let status = session.status;

        Ok(SessionView {
            session_id: session.id,
            status,
            answers_validated: status.has_reached(SessionStatus::Validated),
            preview_available: session.preview_text.is_some(),
            preview_approved: status.has_reached(SessionStatus::Approved),
            final_document_available: status == SessionStatus::Completed
                && session.final_artifact_reference.is_some(),
            preview_strategy: session.preview_strategy,
            answers: session.answers,
            created_at: session.created_at,
            updated_at: session.updated_at,
            approved_at: session.approved_at,
            completed_at: session.completed_at,
            analyses: analyses.iter().map(AnalysisSummary::from).collect(),
        })
    }

    pub async fn delete_session(&self, id: Uuid) -> Result<(), AppError> {
        if !self.sessions.delete_session(id).await? {
            return Err(AppError::NotFound(format!("Session {id} not found")));
        }
        info!("Deleted session {id}");
        Ok(())
    }
}
