mod analysis;
mod chat;
mod config;
mod db;
mod errors;
mod etp;
mod generation;
mod knowledge;
mod llm_client;
mod models;
mod render;
mod routes;
mod state;
mod store;

use anyhow::Result;
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::analysis::LlmDocumentAnalyzer;
use crate::chat::ChatService;
use crate::config::Config;
use crate::db::create_pool;
use crate::etp::EtpService;
use crate::generation::DocumentGenerator;
use crate::knowledge::KnowledgeService;
use crate::llm_client::{LlmClient, TextCompletion};
use crate::render::{ArtifactStorage, DocxFormatter, S3Storage};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::PgStore;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ETP API v{}", env!("CARGO_PKG_VERSION"));

    // PostgreSQL (migrations run on connect)
    let db = create_pool(&config.database_url).await?;
    let store = Arc::new(PgStore::new(db));

    // S3 / MinIO for rendered documents
    let s3 = build_s3_client(&config).await;
    let storage: Arc<dyn ArtifactStorage> = Arc::new(S3Storage::new(s3, &config.s3_bucket));
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    let llm: Arc<dyn TextCompletion> = Arc::new(LlmClient::new(
        config.anthropic_api_key.clone(),
        config.models.clone(),
    )?);
    info!(
        "LLM client initialized (thorough: {}, balanced: {}, fast: {})",
        config.models.thorough, config.models.balanced, config.models.fast
    );

    let generator = Arc::new(DocumentGenerator::new(llm.clone(), &config.generation));
    info!(
        "Default generation strategy: {} (fast mode: {:?})",
        generator.default_strategy(),
        config.generation.fast_mode
    );

    let etp = EtpService::new(
        store.clone(),
        store.clone(),
        Arc::new(LlmDocumentAnalyzer::new(llm.clone())),
        generator,
        Arc::new(DocxFormatter::new(storage.clone())),
        storage,
    );

    let state = AppState {
        etp: Arc::new(etp),
        chat: Arc::new(ChatService::new(store.clone(), llm)),
        knowledge: Arc::new(KnowledgeService::new(store)),
        config: Arc::new(config.clone()),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "etp-static",
    );

    let s3_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new("us-east-1"))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    aws_sdk_s3::Client::new(&s3_config)
}
