//! Strategy selection and the completeness-gated orchestrator.
//!
//! Flow:
//!   1. Pick the `ContentGenerator` for the requested (or default) strategy
//!   2. Run it to get a raw 14-section body
//!   3. `completeness::assess` the body; keep it when acceptable
//!   4. Otherwise (or when the generator failed) use the deterministic fallback
//!   5. Frame the chosen body with the document header and footer

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::config::GenerationSettings;
use crate::etp::Answers;
use crate::llm_client::{CompletionRequest, LlmError, ModelTier, TextCompletion};
use crate::models::{DocumentAnalysis, KnowledgeEntry};

use super::completeness::{assess, QualityVerdict};
use super::fallback::fallback_body;
use super::{complete::CompleteGenerator, fast::FastGenerator, optimized::OptimizedGenerator};

pub const DOCUMENT_TITLE: &str = "ESTUDO TÉCNICO PRELIMINAR";
pub const COMPLIANCE_FOOTER: &str = "Documento elaborado em conformidade com a Lei nº 14.133/2021";

/// Longest document excerpt any strategy puts in its prompt.
pub const MAX_DOCUMENT_EXCERPT: usize = 2000;
pub const MAX_KNOWLEDGE_ENTRIES: usize = 3;
pub const KNOWLEDGE_EXCERPT_CHARS: usize = 1500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationStrategy {
    Complete,
    Optimized,
    Fast,
}

impl GenerationStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            GenerationStrategy::Complete => "complete",
            GenerationStrategy::Optimized => "optimized",
            GenerationStrategy::Fast => "fast",
        }
    }
}

impl fmt::Display for GenerationStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GenerationStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "complete" => Ok(GenerationStrategy::Complete),
            "optimized" => Ok(GenerationStrategy::Optimized),
            "fast" => Ok(GenerationStrategy::Fast),
            other => Err(format!(
                "unknown strategy '{other}' (expected complete, optimized or fast)"
            )),
        }
    }
}

/// How the fast strategy issues its calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastMode {
    /// Sections 1–7 and 8–14 as two concurrent calls.
    Parallel,
    /// One terse call for all 14 sections.
    Single,
}

impl FromStr for FastMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "parallel" => Ok(FastMode::Parallel),
            "single" => Ok(FastMode::Single),
            other => Err(format!(
                "unknown fast mode '{other}' (expected parallel or single)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    #[default]
    Preview,
    Final,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeExcerpt {
    pub filename: String,
    pub content: String,
}

/// Optional material injected into generation prompts.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub document_text: Option<String>,
    pub knowledge: Vec<KnowledgeExcerpt>,
}

impl GenerationContext {
    /// Builds the context from the latest completed analysis and the active
    /// knowledge-base entries, truncated to the prompt budgets.
    pub fn assemble(analysis: Option<&DocumentAnalysis>, knowledge: &[KnowledgeEntry]) -> Self {
        Self {
            document_text: analysis.and_then(|a| a.excerpt(MAX_DOCUMENT_EXCERPT)),
            knowledge: knowledge
                .iter()
                .filter(|e| e.active && !e.content.trim().is_empty())
                .take(MAX_KNOWLEDGE_ENTRIES)
                .map(|e| KnowledgeExcerpt {
                    filename: e.filename.clone(),
                    content: e.content.chars().take(KNOWLEDGE_EXCERPT_CHARS).collect(),
                })
                .collect(),
        }
    }

    pub fn document_excerpt(&self, max_chars: usize) -> Option<String> {
        self.document_text
            .as_deref()
            .map(|t| t.chars().take(max_chars).collect())
    }
}

#[derive(Debug, Error)]
pub enum GeneratorError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("generation task failed: {0}")]
    Task(String),
}

/// One content-generation strategy: (answers, context, mode) → raw body.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(
        &self,
        answers: &Answers,
        context: &GenerationContext,
        mode: GenerationMode,
    ) -> Result<String, GeneratorError>;
}

/// Output of the gated orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct GeneratedDocument {
    pub text: String,
    pub strategy: GenerationStrategy,
    pub sections_found: usize,
    pub used_fallback: bool,
}

/// Header and footer shared by every produced document.
pub fn frame_document(body: &str, date: NaiveDate) -> String {
    format!(
        "{DOCUMENT_TITLE}\n\nData: {}\n\n{}\n\n---\n{COMPLIANCE_FOOTER}",
        date.format("%d/%m/%Y"),
        body.trim()
    )
}

/// Inverse of `frame_document`: the body between header and footer.
/// Text without the frame is returned trimmed.
pub fn unframe(text: &str) -> &str {
    let mut body = text.trim();
    if let Some(rest) = body.strip_prefix(DOCUMENT_TITLE) {
        let rest = rest.trim_start();
        body = match rest.strip_prefix("Data:") {
            Some(after) => after.split_once('\n').map(|(_, b)| b).unwrap_or(""),
            None => rest,
        };
    }
    if let Some((before, after)) = body.rsplit_once("\n---\n") {
        if after.trim() == COMPLIANCE_FOOTER {
            body = before;
        }
    }
    body.trim()
}

/// Removes code fences the model sometimes wraps documents in.
pub(crate) fn tidy_output(text: &str) -> String {
    let trimmed = text.trim();
    let without_open = trimmed
        .strip_prefix("```markdown")
        .or_else(|| trimmed.strip_prefix("```text"))
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    without_open
        .strip_suffix("```")
        .unwrap_or(without_open)
        .trim()
        .to_string()
}

/// Selects a strategy, runs it and applies the completeness gate.
pub struct DocumentGenerator {
    complete: Arc<dyn ContentGenerator>,
    optimized: Arc<dyn ContentGenerator>,
    fast: Arc<dyn ContentGenerator>,
    llm: Arc<dyn TextCompletion>,
    default_strategy: GenerationStrategy,
}

impl DocumentGenerator {
    pub fn new(llm: Arc<dyn TextCompletion>, settings: &GenerationSettings) -> Self {
        Self {
            complete: Arc::new(CompleteGenerator::new(llm.clone())),
            optimized: Arc::new(OptimizedGenerator::new(llm.clone())),
            fast: Arc::new(FastGenerator::new(
                llm.clone(),
                settings.fast_mode,
                settings.parallel_timeout,
            )),
            llm,
            default_strategy: settings.default_strategy,
        }
    }

    pub fn default_strategy(&self) -> GenerationStrategy {
        self.default_strategy
    }

    fn generator_for(&self, strategy: GenerationStrategy) -> &dyn ContentGenerator {
        match strategy {
            GenerationStrategy::Complete => self.complete.as_ref(),
            GenerationStrategy::Optimized => self.optimized.as_ref(),
            GenerationStrategy::Fast => self.fast.as_ref(),
        }
    }

    /// Never fails: generator errors and incomplete output both resolve to
    /// the deterministic fallback.
    pub async fn generate(
        &self,
        strategy: Option<GenerationStrategy>,
        answers: &Answers,
        context: &GenerationContext,
        mode: GenerationMode,
    ) -> GeneratedDocument {
        self.generate_on(strategy, answers, context, mode, Utc::now().date_naive())
            .await
    }

    pub async fn generate_on(
        &self,
        strategy: Option<GenerationStrategy>,
        answers: &Answers,
        context: &GenerationContext,
        mode: GenerationMode,
        date: NaiveDate,
    ) -> GeneratedDocument {
        let strategy = strategy.unwrap_or(self.default_strategy);
        let started = std::time::Instant::now();

        let body = match self
            .generator_for(strategy)
            .generate(answers, context, mode)
            .await
        {
            Ok(raw) => {
                let body = tidy_output(&raw);
                match assess(&body) {
                    QualityVerdict::Acceptable { sections_found } => {
                        info!(
                            "Strategy {strategy} produced {sections_found}/14 sections in {}ms",
                            started.elapsed().as_millis()
                        );
                        return GeneratedDocument {
                            text: frame_document(&body, date),
                            strategy,
                            sections_found,
                            used_fallback: false,
                        };
                    }
                    QualityVerdict::NeedsFallback { sections_found } => {
                        warn!(
                            "Strategy {strategy} produced only {sections_found}/14 sections; using fallback"
                        );
                        fallback_body(answers)
                    }
                }
            }
            Err(e) => {
                warn!("Strategy {strategy} failed ({e}); using fallback");
                fallback_body(answers)
            }
        };

        GeneratedDocument {
            sections_found: assess(&body).sections_found(),
            text: frame_document(&body, date),
            strategy,
            used_fallback: true,
        }
    }

    /// Asks the model to revise `current` per `feedback`. Returns `Ok(None)`
    /// when the revision fails the completeness gate.
    pub async fn adjust(
        &self,
        current: &str,
        feedback: &str,
    ) -> Result<Option<String>, GeneratorError> {
        let prompt = super::prompts::adjustment_prompt(unframe(current), feedback);
        let request = CompletionRequest::prompt(
            ModelTier::Balanced,
            crate::llm_client::prompts::PROCUREMENT_SPECIALIST,
            prompt,
        )
        .with_max_tokens(8000)
        .with_temperature(0.2);

        let revised = tidy_output(&self.llm.complete(request).await?);
        let verdict = assess(&revised);
        if !verdict.is_acceptable() {
            warn!(
                "Preview revision kept only {}/14 sections; keeping current preview",
                verdict.sections_found()
            );
            return Ok(None);
        }
        Ok(Some(frame_document(&revised, Utc::now().date_naive())))
    }
}

#[cfg(test)]
impl DocumentGenerator {
    /// Orchestrator over explicit generators, for tests.
    pub fn from_parts(
        complete: Arc<dyn ContentGenerator>,
        optimized: Arc<dyn ContentGenerator>,
        fast: Arc<dyn ContentGenerator>,
        llm: Arc<dyn TextCompletion>,
        default_strategy: GenerationStrategy,
    ) -> Self {
        Self {
            complete,
            optimized,
            fast,
            llm,
            default_strategy,
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::generation::sections::SECTIONS;

    /// A well-formed body with the given section numbers.
    pub fn body_with_sections(numbers: std::ops::RangeInclusive<u8>) -> String {
        SECTIONS
            .iter()
            .filter(|s| numbers.contains(&s.number))
            .map(|s| format!("{}\n\nConteúdo técnico da seção {}.", s.heading(), s.number))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub struct StaticGenerator {
        pub output: Result<String, String>,
    }

    #[async_trait]
    impl ContentGenerator for StaticGenerator {
        async fn generate(
            &self,
            _answers: &Answers,
            _context: &GenerationContext,
            _mode: GenerationMode,
        ) -> Result<String, GeneratorError> {
            self.output.clone().map_err(GeneratorError::Task)
        }
    }
}
