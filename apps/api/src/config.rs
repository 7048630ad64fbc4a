use std::time::Duration;

use anyhow::{Context, Result};

use crate::generation::{FastMode, GenerationStrategy};

/// Model names per latency tier. Passed into the LLM client at startup.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub thorough: String,
    pub balanced: String,
    pub fast: String,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            thorough: "claude-sonnet-4-5".to_string(),
            balanced: "claude-sonnet-4-5".to_string(),
            fast: "claude-haiku-4-5".to_string(),
        }
    }
}

/// Settings consumed by the content generators.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub default_strategy: GenerationStrategy,
    pub fast_mode: FastMode,
    /// Bounded wait applied to each half of the parallel strategy.
    pub parallel_timeout: Duration,
}

impl Default for GenerationSettings {
    fn default() -> Self {
        Self {
            default_strategy: GenerationStrategy::Optimized,
            fast_mode: FastMode::Parallel,
            parallel_timeout: Duration::from_secs(60),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Startup fails if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub models: ModelSettings,
    pub generation: GenerationSettings,
    pub max_upload_bytes: usize,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let model_defaults = ModelSettings::default();
        let generation_defaults = GenerationSettings::default();

        let default_strategy = match std::env::var("DEFAULT_STRATEGY") {
            Ok(raw) => raw
                .parse::<GenerationStrategy>()
                .map_err(|e| anyhow::anyhow!("DEFAULT_STRATEGY: {e}"))?,
            Err(_) => generation_defaults.default_strategy,
        };
        let fast_mode = match std::env::var("FAST_MODE") {
            Ok(raw) => raw
                .parse::<FastMode>()
                .map_err(|e| anyhow::anyhow!("FAST_MODE: {e}"))?,
            Err(_) => generation_defaults.fast_mode,
        };

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            models: ModelSettings {
                thorough: optional_env("LLM_MODEL_THOROUGH", &model_defaults.thorough),
                balanced: optional_env("LLM_MODEL_BALANCED", &model_defaults.balanced),
                fast: optional_env("LLM_MODEL_FAST", &model_defaults.fast),
            },
            generation: GenerationSettings {
                default_strategy,
                fast_mode,
                parallel_timeout: Duration::from_secs(
                    optional_env("PARALLEL_TIMEOUT_SECS", "60")
                        .parse::<u64>()
                        .context("PARALLEL_TIMEOUT_SECS must be a whole number of seconds")?,
                ),
            },
            max_upload_bytes: optional_env("MAX_UPLOAD_BYTES", "16777216")
                .parse::<usize>()
                .context("MAX_UPLOAD_BYTES must be a byte count")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

#[cfg(test)]
impl Config {
    /// Configuration with placeholder credentials; nothing reads them in tests.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgres://localhost/etp_test".to_string(),
            s3_bucket: "etp-documents".to_string(),
            s3_endpoint: "http://localhost:9000".to_string(),
            aws_access_key_id: "test".to_string(),
            aws_secret_access_key: "test".to_string(),
            anthropic_api_key: "test".to_string(),
            models: ModelSettings::default(),
            generation: GenerationSettings::default(),
            max_upload_bytes: 16 * 1024 * 1024,
            port: 8080,
            rust_log: "debug".to_string(),
        }
    }
}
