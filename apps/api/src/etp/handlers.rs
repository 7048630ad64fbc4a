use axum::{
    body::Bytes,
    extract::{multipart::MultipartRejection, Multipart, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use crate::errors::AppError;
use crate::generation::{GenerationMode, GenerationStrategy};
use crate::models::{DocumentAnalysis, EtpSession};
use crate::render::DOCX_CONTENT_TYPE;
use crate::routes::extract::{AppJson, AppQuery, ResourceId};
use crate::routes::upload::read_file_field;
use crate::state::AppState;

use super::lifecycle::SessionStatus;
use super::service::{
    AdjustOutcome, FinalizeOutcome, PreviewOutcome, QuestionsView, SessionView, StoredPreview,
    UploadOutcome,
};

// ────────────────────────────────────────────────────────────────
// Request / response types
// ────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct QuestionsQuery {
    pub session_id: Option<Uuid>,
}

#[derive(Deserialize)]
pub struct AnswersRequest {
    #[serde(default)]
    pub answers: Map<String, Value>,
}

#[derive(Deserialize, Default)]
pub struct PreviewRequest {
    pub strategy: Option<GenerationStrategy>,
    #[serde(default)]
    pub mode: GenerationMode,
}

#[derive(Deserialize)]
pub struct AdjustRequest {
    #[serde(default)]
    pub feedback: String,
}

#[derive(Serialize)]
pub struct SessionCreated {
    pub session_id: Uuid,
    pub status: SessionStatus,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub session_id: Uuid,
    pub status: SessionStatus,
}

impl From<EtpSession> for StatusResponse {
    fn from(session: EtpSession) -> Self {
        Self {
            session_id: session.id,
            status: session.status,
        }
    }
}

// ────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────

/// GET /api/v1/questions
pub async fn handle_questions(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<QuestionsQuery>,
) -> Result<Json<QuestionsView>, AppError> {
    Ok(Json(state.etp.questions(params.session_id).await?))
}

/// POST /api/v1/sessions
pub async fn handle_create_session(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<SessionCreated>), AppError> {
    let session = state.etp.create_session().await?;
    Ok((
        StatusCode::CREATED,
        Json(SessionCreated {
            session_id: session.id,
            status: session.status,
        }),
    ))
}

/// GET /api/v1/sessions/:id
pub async fn handle_get_session(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<SessionView>, AppError> {
    Ok(Json(state.etp.get_session(id).await?))
}

/// DELETE /api/v1/sessions/:id
pub async fn handle_delete_session(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, AppError> {
    state.etp.delete_session(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/sessions/:id/answers
pub async fn handle_submit_answers(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    AppJson(req): AppJson<AnswersRequest>,
) -> Result<Json<StatusResponse>, AppError> {
    let session = state.etp.submit_answers(id, &req.answers).await?;
    Ok(Json(session.into()))
}

/// POST /api/v1/sessions/:id/upload
pub async fn handle_upload(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadOutcome>, AppError> {
    let file = read_file_field(multipart?).await?;
    let outcome = state
        .etp
        .upload_document(id, &file.filename, file.bytes)
        .await?;
    Ok(Json(outcome))
}

/// GET /api/v1/sessions/:id/analyses
pub async fn handle_list_analyses(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<Vec<DocumentAnalysis>>, AppError> {
    Ok(Json(state.etp.list_analyses(id).await?))
}

/// POST /api/v1/sessions/:id/preview
///
/// The body is optional; an empty body uses the configured default strategy.
pub async fn handle_generate_preview(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    body: Bytes,
) -> Result<Json<PreviewOutcome>, AppError> {
    let req: PreviewRequest = if body.iter().all(u8::is_ascii_whitespace) {
        PreviewRequest::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            debug!("Rejected preview request: {e}");
            AppError::validation(
                "Invalid preview request: strategy must be complete, optimized or fast \
                 and mode must be preview or final",
            )
        })?
    };
    let outcome = state.etp.generate_preview(id, req.strategy, req.mode).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/sessions/:id/preview
pub async fn handle_get_preview(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<StoredPreview>, AppError> {
    Ok(Json(state.etp.get_preview(id).await?))
}

/// POST /api/v1/sessions/:id/preview/adjust
pub async fn handle_adjust_preview(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
    AppJson(req): AppJson<AdjustRequest>,
) -> Result<Json<AdjustOutcome>, AppError> {
    Ok(Json(state.etp.adjust_preview(id, &req.feedback).await?))
}

/// POST /api/v1/sessions/:id/approve
pub async fn handle_approve(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<StatusResponse>, AppError> {
    let session = state.etp.approve_preview(id).await?;
    Ok(Json(session.into()))
}

/// POST /api/v1/sessions/:id/finalize
pub async fn handle_finalize(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<FinalizeOutcome>, AppError> {
    Ok(Json(state.etp.finalize(id).await?))
}

/// GET /api/v1/sessions/:id/download
pub async fn handle_download(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, AppError> {
    let download = state.etp.download(id).await?;
    let disposition = format!("attachment; filename=\"{}\"", download.filename);
    Ok((
        [
            (header::CONTENT_TYPE, DOCX_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    ))
}
