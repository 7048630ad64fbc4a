use axum::{extract::State, Json};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::ChatSession;
use crate::routes::extract::{AppJson, ResourceId};
use crate::state::AppState;

use super::service::{ChatReply, ChatStarted, TopicsResponse};

#[derive(Deserialize)]
pub struct MessageRequest {
    #[serde(default)]
    pub message: String,
    pub session_id: Option<Uuid>,
}

/// POST /api/v1/chat/start
pub async fn handle_start_chat(
    State(state): State<AppState>,
) -> Result<Json<ChatStarted>, AppError> {
    Ok(Json(state.chat.start_chat().await?))
}

/// POST /api/v1/chat/message
pub async fn handle_message(
    State(state): State<AppState>,
    AppJson(req): AppJson<MessageRequest>,
) -> Result<Json<ChatReply>, AppError> {
    let reply = state.chat.post_message(&req.message, req.session_id).await?;
    Ok(Json(reply))
}

/// GET /api/v1/chat/topics
pub async fn handle_topics(State(state): State<AppState>) -> Json<TopicsResponse> {
    Json(state.chat.topics())
}

/// GET /api/v1/chat/:id/history
pub async fn handle_history(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<ChatSession>, AppError> {
    Ok(Json(state.chat.history(id).await?))
}

/// POST /api/v1/chat/:id/end
pub async fn handle_end_chat(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<ChatSession>, AppError> {
    Ok(Json(state.chat.end_chat(id).await?))
}

/// POST /api/v1/chat/:id/clear
pub async fn handle_clear_history(
    State(state): State<AppState>,
    ResourceId(id): ResourceId,
) -> Result<Json<ChatSession>, AppError> {
    Ok(Json(state.chat.clear_history(id).await?))
}
