//! Persistence ports. Services depend on these traits; `PgStore` is the
//! production adapter and `memory::MemoryStore` backs the tests.

pub mod postgres;

#[cfg(test)]
pub mod memory;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::{ChatSession, DocumentAnalysis, EtpSession, KnowledgeEntry};

pub use postgres::PgStore;

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert_session(&self, session: &EtpSession) -> Result<(), AppError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<EtpSession>, AppError>;

    /// Overwrites every mutable column of the session.
    async fn save_session(&self, session: &EtpSession) -> Result<(), AppError>;

    /// Removes the session and its analyses. Returns false when absent.
    async fn delete_session(&self, id: Uuid) -> Result<bool, AppError>;

    async fn insert_analysis(&self, analysis: &DocumentAnalysis) -> Result<(), AppError>;

    async fn save_analysis(&self, analysis: &DocumentAnalysis) -> Result<(), AppError>;

    /// Saves the analysis and the session in one transaction.
    async fn save_analysis_with_session(
        &self,
        analysis: &DocumentAnalysis,
        session: &EtpSession,
    ) -> Result<(), AppError>;

    async fn list_analyses(&self, session_id: Uuid) -> Result<Vec<DocumentAnalysis>, AppError>;

    async fn latest_completed_analysis(
        &self,
        session_id: Uuid,
    ) -> Result<Option<DocumentAnalysis>, AppError>;

    /// Best-effort move to the `error` status after a persistence failure.
    async fn mark_error(&self, id: Uuid) -> Result<(), AppError>;
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn insert_chat(&self, chat: &ChatSession) -> Result<(), AppError>;

    async fn get_chat(&self, id: Uuid) -> Result<Option<ChatSession>, AppError>;

    async fn save_chat(&self, chat: &ChatSession) -> Result<(), AppError>;
}

#[async_trait]
pub trait KnowledgeStore: Send + Sync {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<KnowledgeEntry>, AppError>;

    async fn insert_entry(&self, entry: &KnowledgeEntry) -> Result<(), AppError>;

    async fn list_entries(&self) -> Result<Vec<KnowledgeEntry>, AppError>;

    /// Active entries, newest first, at most `limit`.
    async fn list_active(&self, limit: usize) -> Result<Vec<KnowledgeEntry>, AppError>;

    /// Returns false when no entry has this id.
    async fn deactivate(&self, id: Uuid) -> Result<bool, AppError>;
}
