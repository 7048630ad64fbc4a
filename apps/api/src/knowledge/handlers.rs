use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    http::StatusCode,
    Json,
};
use crate::errors::AppError;
use crate::models::KnowledgeEntry;
use crate::routes::extract::ResourceId;
use crate::routes::upload::read_file_field;
use crate::state::AppState;

use super::service::AddedEntry;

/// POST /api/v1/knowledge
pub async fn handle_add_entry(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<AddedEntry>), AppError> {
    let file = read_file_field(multipart?).await?;
    let added = state.knowledge.add_entry(&file.filename, file.bytes).await?;
    let status = if added.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(added)))
}

/// GET /api/v1/knowledge
pub async fn handle_list_entries(
    State(state): State<AppState>,
) -> Result<Json<Vec<KnowledgeEntry>>, AppError> {
    Ok(Json(state.knowledge.list_entries().await?))
}

/// DELETE /api/v1/knowledge/:id
pub async fn handle_deactivate(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<StatusCode, AppError> {
    state.knowledge.deactivate(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
