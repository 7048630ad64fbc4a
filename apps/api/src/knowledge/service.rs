use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::info;
use uuid::Uuid;

use crate::analysis::extract::{extract_text, FileKind};
use crate::errors::AppError;
use crate::models::KnowledgeEntry;
use crate::store::KnowledgeStore;

#[derive(Debug, Serialize)]
pub struct AddedEntry {
    pub entry: KnowledgeEntry,
    /// False when identical text was already in the base.
    pub created: bool,
}

pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct KnowledgeService {
    store: Arc<dyn KnowledgeStore>,
}

impl KnowledgeService {
    pub fn new(store: Arc<dyn KnowledgeStore>) -> Self {
        Self { store }
    }

    pub async fn add_entry(&self, filename: &str, bytes: Vec<u8>) -> Result<AddedEntry, AppError> {
        let kind = FileKind::from_filename(filename).ok_or_else(|| {
            AppError::validation(format!(
                "Unsupported file type for {filename}; use .pdf, .docx or .txt"
            ))
        })?;
        let content = extract_text(bytes, kind)
            .await
            .map_err(|e| AppError::ExternalService(e.to_string()))?;

        let hash = content_hash(&content);
        if let Some(existing) = self.store.find_by_hash(&hash).await? {
            info!("Knowledge entry {} already holds {filename}", existing.id);
            return Ok(AddedEntry {
                entry: existing,
                created: false,
            });
        }

        let entry = KnowledgeEntry {
            id: Uuid::new_v4(),
            filename: filename.to_string(),
            content,
            content_hash: hash,
            active: true,
            created_at: Utc::now(),
        };
        self.store.insert_entry(&entry).await?;
        info!("Added knowledge entry {} ({filename})", entry.id);

        Ok(AddedEntry {
            entry,
            created: true,
        })
    }

    pub async fn list_entries(&self) -> Result<Vec<KnowledgeEntry>, AppError> {
        self.store.list_entries().await
    }

    pub async fn deactivate(&self, id: Uuid) -> Result<(), AppError> {
        if !self.store.deactivate(id).await? {
            return Err(AppError::NotFound(format!("Knowledge entry {id} not found")));
        }
        info!("Deactivated knowledge entry {id}");
        Ok(())
    }
}
