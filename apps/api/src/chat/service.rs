//! Procurement-only assistant chat.
//!
//! Each message is checked by the topic gate before any model call. Both the
//! user entry and the assistant entry are appended to the transcript, also
//! when the topic is rejected or the model fails.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::llm_client::{ChatTurn, CompletionRequest, ModelTier, Role, TextCompletion};
use crate::models::ChatSession;
use crate::store::ChatStore;

use super::prompts::{refusal, APOLOGY_MESSAGE, CHAT_SYSTEM, EXAMPLE_QUESTIONS, WELCOME_MESSAGE};
use super::topic_gate::{check_allowed, ALLOWED_TOPICS};

/// Transcript entries sent to the model with each message.
pub const HISTORY_WINDOW: usize = 10;

#[derive(Debug, Serialize)]
pub struct ChatStarted {
    pub session_id: Uuid,
    pub welcome_message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct ChatReply {
    pub session_id: Uuid,
    pub response: String,
    pub topic_allowed: bool,
}

#[derive(Debug, Serialize)]
pub struct TopicsResponse {
    pub allowed_topics: &'static [&'static str],
    pub examples: &'static [&'static str],
}

pub struct ChatService {
    store: Arc<dyn ChatStore>,
    llm: Arc<dyn TextCompletion>,
}

impl ChatService {
    pub fn new(store: Arc<dyn ChatStore>, llm: Arc<dyn TextCompletion>) -> Self {
        Self { store, llm }
    }

    pub async fn start_chat(&self) -> Result<ChatStarted, AppError> {
        let chat = ChatSession::seeded(WELCOME_MESSAGE);
        self.store.insert_chat(&chat).await?;
        info!("Started chat {}", chat.id);
        Ok(ChatStarted {
            session_id: chat.id,
            welcome_message: WELCOME_MESSAGE,
        })
    }

    async fn load(&self, id: Uuid) -> Result<ChatSession, AppError> {
        self.store
            .get_chat(id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Chat session {id} not found")))
    }

    async fn load_active(&self, id: Uuid) -> Result<ChatSession, AppError> {
        let chat = self.load(id).await?;
        if !chat.active {
            return Err(AppError::Precondition(format!("Chat session {id} has ended")));
        }
        Ok(chat)
    }

    pub async fn post_message(
        &self,
        message: &str,
        session_id: Option<Uuid>,
    ) -> Result<ChatReply, AppError> {
        let message = message.trim();
        if message.is_empty() {
            return Err(AppError::validation("Message must not be empty"));
        }

        let (mut chat, is_new) = match session_id {
            Some(id) => (self.load_active(id).await?, false),
            None => (ChatSession::seeded(WELCOME_MESSAGE), true),
        };

        let verdict = check_allowed(message);
        chat.append(Role::User, message);

        let response = if verdict.allowed {
            self.answer(&chat).await
        } else {
            warn!("Chat {} rejected off-topic message: {}", chat.id, verdict.reason);
            refusal(verdict.reason)
        };
        chat.append(Role::Assistant, response.clone());

        if is_new {
            self.store.insert_chat(&chat).await?;
        } else {
            self.store.save_chat(&chat).await?;
        }

        Ok(ChatReply {
            session_id: chat.id,
            response,
            topic_allowed: verdict.allowed,
        })
    }

    /// Model answer over the recent transcript; the last entry is the user's.
    async fn answer(&self, chat: &ChatSession) -> String {
        let turns: Vec<ChatTurn> = chat.recent(HISTORY_WINDOW).iter().map(ChatTurn::from).collect();
        let request = CompletionRequest::conversation(ModelTier::Balanced, CHAT_SYSTEM, turns)
            .with_max_tokens(800)
            .with_temperature(0.1);

        match self.llm.complete(request).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                warn!("Chat {} answer failed: {e}", chat.id);
                APOLOGY_MESSAGE.to_string()
            }
        }
    }

    pub async fn history(&self, id: Uuid) -> Result<ChatSession, AppError> {
        self.load(id).await
    }

    pub async fn end_chat(&self, id: Uuid) -> Result<ChatSession, AppError> {
        let mut chat = self.load(id).await?;
        chat.active = false;
        chat.updated_at = chrono::Utc::now();
        self.store.save_chat(&chat).await?;
        info!("Ended chat {id}");
        Ok(chat)
    }

    pub async fn clear_history(&self, id: Uuid) -> Result<ChatSession, AppError> {
        let mut chat = self.load(id).await?;
        chat.reseed(WELCOME_MESSAGE);
        self.store.save_chat(&chat).await?;
        Ok(chat)
    }

    pub fn topics(&self) -> TopicsResponse {
        TopicsResponse {
            allowed_topics: ALLOWED_TOPICS,
            examples: EXAMPLE_QUESTIONS,
        }
    }
}
