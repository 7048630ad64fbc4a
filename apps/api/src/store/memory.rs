//! In-memory store used by service and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::AppError;
use crate::etp::SessionStatus;
use crate::models::{AnalysisStatus, ChatSession, DocumentAnalysis, EtpSession, KnowledgeEntry};

use super::{ChatStore, KnowledgeStore, SessionStore};

#[derive(Default)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<Uuid, EtpSession>>,
    analyses: Mutex<Vec<DocumentAnalysis>>,
    chats: Mutex<HashMap<Uuid, ChatSession>>,
    knowledge: Mutex<Vec<KnowledgeEntry>>,
    fail_session_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `save_session` fail like a lost connection.
    pub fn fail_session_writes(&self) {
        self.fail_session_writes.store(true, Ordering::SeqCst);
    }

    pub fn session(&self, id: Uuid) -> Option<EtpSession> {
        self.sessions.lock().unwrap().get(&id).cloned()
    }

    fn check_writable(&self) -> Result<(), AppError> {
        if self.fail_session_writes.load(Ordering::SeqCst) {
            return Err(AppError::Database(sqlx::Error::PoolClosed));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: &EtpSession) -> Result<(), AppError> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<EtpSession>, AppError> {
        Ok(self.session(id))
    }

    async fn save_session(&self, session: &EtpSession) -> Result<(), AppError> {
        self.check_writable()?;
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn delete_session(&self, id: Uuid) -> Result<bool, AppError> {
        let removed = self.sessions.lock().unwrap().remove(&id).is_some();
        self.analyses
            .lock()
            .unwrap()
            .retain(|a| a.session_id != id);
        Ok(removed)
    }

    async fn insert_analysis(&self, analysis: &DocumentAnalysis) -> Result<(), AppError> {
        self.analyses.lock().unwrap().push(analysis.clone());
        Ok(())
    }

    async fn save_analysis(&self, analysis: &DocumentAnalysis) -> Result<(), AppError> {
        let mut analyses = self.analyses.lock().unwrap();
        if let Some(existing) = analyses.iter_mut().find(|a| a.id == analysis.id) {
            *existing = analysis.clone();
        }
        Ok(())
    }

    async fn save_analysis_with_session(
        &self,
        analysis: &DocumentAnalysis,
        session: &EtpSession,
    ) -> Result<(), AppError> {
        self.check_writable()?;
        self.save_analysis(analysis).await?;
        self.save_session(session).await
    }

    async fn list_analyses(&self, session_id: Uuid) -> Result<Vec<DocumentAnalysis>, AppError> {
        let mut found: Vec<DocumentAnalysis> = self
            .analyses
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.session_id == session_id)
            .cloned()
            .collect();
        found.reverse();
        Ok(found)
    }

    async fn latest_completed_analysis(
        &self,
        session_id: Uuid,
    ) -> Result<Option<DocumentAnalysis>, AppError> {
        Ok(self
            .analyses
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|a| a.session_id == session_id && a.status == AnalysisStatus::Done)
            .cloned())
    }

    async fn mark_error(&self, id: Uuid) -> Result<(), AppError> {
        if let Some(s) = self.sessions.lock().unwrap().get_mut(&id) {
            s.status = SessionStatus::Error;
        }
        Ok(())
    }
}

#[async_trait]
impl ChatStore for MemoryStore {
    async fn insert_chat(&self, chat: &ChatSession) -> Result<(), AppError> {
        self.chats.lock().unwrap().insert(chat.id, chat.clone());
        Ok(())
    }

    async fn get_chat(&self, id: Uuid) -> Result<Option<ChatSession>, AppError> {
        Ok(self.chats.lock().unwrap().get(&id).cloned())
    }

    async fn save_chat(&self, chat: &ChatSession) -> Result<(), AppError> {
        self.chats.lock().unwrap().insert(chat.id, chat.clone());
        Ok(())
    }
}

#[async_trait]
impl KnowledgeStore for MemoryStore {
    async fn find_by_hash(&self, content_hash: &str) -> Result<Option<KnowledgeEntry>, AppError> {
        Ok(self
            .knowledge
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.content_hash == content_hash)
            .cloned())
    }

    async fn insert_entry(&self, entry: &KnowledgeEntry) -> Result<(), AppError> {
        self.knowledge.lock().unwrap().push(entry.clone());
        Ok(())
    }

    async fn list_entries(&self) -> Result<Vec<KnowledgeEntry>, AppError> {
        let mut entries = self.knowledge.lock().unwrap().clone();
        entries.reverse();
        Ok(entries)
    }

    async fn list_active(&self, limit: usize) -> Result<Vec<KnowledgeEntry>, AppError> {
        Ok(self
            .knowledge
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|e| e.active)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn deactivate(&self, id: Uuid) -> Result<bool, AppError> {
        let mut entries = self.knowledge.lock().unwrap();
        match entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                entry.active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
