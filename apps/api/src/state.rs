use std::sync::Arc;

use crate::chat::ChatService;
use crate::config::Config;
use crate::etp::EtpService;
use crate::knowledge::KnowledgeService;

/// Shared application state injected into all route handlers via Axum extractors.
/// Services hold their ports (store, LLM, analyzer, formatter) behind `Arc<dyn _>`.
#[derive(Clone)]
pub struct AppState {
    pub etp: Arc<EtpService>,
    pub chat: Arc<ChatService>,
    pub knowledge: Arc<KnowledgeService>,
    pub config: Arc<Config>,
}
