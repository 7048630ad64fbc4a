use async_trait::async_trait;
use serde::Serialize;
use sqlx::{PgExecutor, PgPool};
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::analysis::DocumentAnalysisRow;
use crate::models::chat::ChatSessionRow;
use crate::models::session::EtpSessionRow;
use crate::models::{ChatSession, DocumentAnalysis, EtpSession, KnowledgeEntry};

use super::{ChatStore, KnowledgeStore, SessionStore};

/// PostgreSQL adapter for every persistence port. JSON blobs live in TEXT
/// columns and are decoded into typed models on read.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn encode<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_json::to_string(value).map_err(|e| AppError::Internal(e.into()))
}

async fn write_session<'e, E: PgExecutor<'e>>(
    executor: E,
    session: &EtpSession,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE etp_sessions
        SET status = $2, answers = $3, preview_text = $4, preview_strategy = $5,
            final_artifact_reference = $6, updated_at = $7, approved_at = $8,
            completed_at = $9
        WHERE id = $1
        "#,
    )
    .bind(session.id)
    .bind(session.status.as_str())
    .bind(encode(&session.answers)?)
    .bind(session.preview_text.as_deref())
    .bind(session.preview_strategy.map(|s| s.as_str()))
    .bind(session.final_artifact_reference.as_deref())
    .bind(session.updated_at)
    .bind(session.approved_at)
    .bind(session.completed_at)
    .execute(executor)
    .await?;
    Ok(())
}

async fn write_analysis<'e, E: PgExecutor<'e>>(
    executor: E,
    analysis: &DocumentAnalysis,
) -> Result<(), AppError> {
    let result = analysis
        .analysis_result
        .as_ref()
        .map(encode)
        .transpose()?;
    sqlx::query(
        r#"
        UPDATE document_analyses
        SET extracted_text = $2, analysis_result = $3, extracted_answers = $4,
            missing_info = $5, status = $6, error_message = $7, updated_at = $8
        WHERE id = $1
        "#,
    )
    .bind(analysis.id)
    .bind(analysis.extracted_text.as_deref())
    .bind(result)
    .bind(encode(&analysis.extracted_answers)?)
    .bind(encode(&analysis.missing_info)?)
    .bind(analysis.status.as_str())
    .bind(analysis.error_message.as_deref())
    .bind(analysis.updated_at)
    .execute(executor)
    .await?;
    Ok(())
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: &EtpSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO etp_sessions (id, status, answers, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(session.id)
        .bind(session.status.as_str())
        .bind(encode(&session.answers)?)
        .bind(session.created_at)
        .bind(session.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<EtpSession>, AppError> {
        let row = sqlx::query_as::<_, EtpSessionRow>("SELECT * FROM etp_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(EtpSession::try_from).transpose()?)
    }

    async fn save_session(&self, session: &EtpSession) -> Result<(), AppError> {
        write_session(&self.pool, session).await
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;
        let analyses = sqlx::query("DELETE FROM document_analyses WHERE session_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        let sessions = sqlx::query("DELETE FROM etp_sessions WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        tx.commit().await?;

        if sessions > 0 {
            info!("Deleted session {id} and {analyses} document analyses");
        }
        Ok(sessions > 0)
    }

    async fn insert_analysis(&self, analysis: &DocumentAnalysis) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO document_analyses
                (id, session_id, filename, file_size, file_type, extracted_answers,
                 missing_info, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(analysis.id)
        .bind(analysis.session_id)
        .bind(&analysis.filename)
        .bind(analysis.file_size)
        .bind(&analysis.file_type)
        .bind(encode(&analysis.extracted_answers)?)
        .bind(encode(&analysis.missing_info)?)
        .bind(analysis.status.as_str())
        .bind(analysis.created_at)
        .bind(analysis.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn save_analysis(&self, analysis: &DocumentAnalysis) -> Result<(), AppError> {
        write_analysis(&self.pool, analysis).await
    }

    async fn save_analysis_with_session(
        &self,
        analysis: &DocumentAnalysis,
        session: &EtpSession,
    ) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;
        write_analysis(&mut *tx, analysis).await?;
        write_session(&mut *tx, session).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn list_analyses(&self, session_id: Uuid) -> Result<Vec<DocumentAnalysis>, AppError> {
        let rows = sqlx::query_as::<_, DocumentAnalysisRow>(
            "SELECT * FROM document_analyses WHERE session_id = $1 ORDER BY created_at DESC",
        )
        .bind(session_id)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter()
            .map(|r| DocumentAnalysis::try_from(r).map_err(AppError::from))
            .collect()
    }

    async fn latest_completed_analysis(
        &self,
        session_id: Uuid,
    ) -> Result<Option<DocumentAnalysis>, AppError> {
        let row = sqlx::query_as::<_, DocumentAnalysisRow>(
            r#"
            SELECT * FROM document_analyses
            WHERE session_id = $1 AND status = 'done'
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(session_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(DocumentAnalysis::try_from).transpose()?)
    }

    async fn mark_error(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE etp_sessions SET status = 'error', updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .execute(&self.pool)
        .await;
        if let Err(e) = &result {
            warn!("Could not mark session {id} as error: {e}");
        }
        result?;
        Ok(())
    }
}

#[async_trait]
impl ChatStore for PgStore {
    async fn insert_chat(&self, chat: &ChatSession) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO chat_sessions (id, history, active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(chat.id)
        .bind(encode(&chat.history)?)
        .bind(chat.active)
        .bind(chat.created_at)
        .bind(chat.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_chat(&self, id: Uuid) -> Result<Option<ChatSession>, AppError> {
        let row = sqlx::query_as::<_, ChatSessionRow>("SELECT * FROM chat_sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(ChatSession::try_from).transpose()?)
    }

    async fn save_chat(&self, chat: &ChatSession) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE chat_sessions SET history = $2, active = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(chat.id)
        .bind(encode(&chat.history)?)
        .bind(chat.active)
        .bind(chat.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for PgStore {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<KnowledgeEntry>, AppError> {
        Ok(sqlx::query_as::<_, KnowledgeEntry>(
            "SELECT * FROM knowledge_base WHERE content_hash = $1",
        )
        .bind(content_hash)
        .fetch_optional(&self.pool)
        .await?)
    }

    async fn insert_entry(&self, entry: &KnowledgeEntry) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO knowledge_base (id, filename, content, content_hash, active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.filename)
        .bind(&entry.content)
        .bind(&entry.content_hash)
        .bind(entry.active)
        .bind(entry.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<KnowledgeEntry>, AppError> {
        Ok(sqlx::query_as::<_, KnowledgeEntry>(
            "SELECT * FROM knowledge_base ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    async fn list_active(&self, limit: usize) -> Result<Vec<KnowledgeEntry>, AppError> {
        Ok(sqlx::query_as::<_, KnowledgeEntry>(
            "SELECT * FROM knowledge_base WHERE active ORDER BY created_at DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?)
    }

    async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let affected = sqlx::query("UPDATE knowledge_base SET active = FALSE WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();
        Ok(affected > 0)
    }
}
