use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::etp::Answers;
use crate::llm_client::{CompletionRequest, ModelTier, TextCompletion};

use super::prompts::{fast_prompt, render_references, FAST_SYSTEM};
use super::strategy::{
    tidy_output, ContentGenerator, FastMode, GenerationContext, GenerationMode, GeneratorError,
};

const FIRST_HALF: RangeInclusive<u8> = 1..=7;
const SECOND_HALF: RangeInclusive<u8> = 8..=14;
const DOCUMENT_EXCERPT_CHARS: usize = 1000;

/// Lowest-latency strategy: one terse call, or two concurrent half-document
/// calls joined in fixed order.
pub struct FastGenerator {
    llm: Arc<dyn TextCompletion>,
    mode: FastMode,
    half_timeout: Duration,
}

impl FastGenerator {
    pub fn new(llm: Arc<dyn TextCompletion>, mode: FastMode, half_timeout: Duration) -> Self {
        Self {
            llm,
            mode,
            half_timeout,
        }
    }

    async fn single(
        &self,
        answers: &Answers,
        references: &str,
        mode: GenerationMode,
    ) -> Result<String, GeneratorError> {
        let prompt = fast_prompt(answers, references, 1..=14, mode);
        let request = CompletionRequest::prompt(ModelTier::Fast, FAST_SYSTEM, prompt)
            .with_max_tokens(6000)
            .with_temperature(0.1);
        Ok(self.llm.complete(request).await?)
    }

    async fn parallel(
        &self,
        answers: &Answers,
        references: &str,
        mode: GenerationMode,
    ) -> Result<String, GeneratorError> {
        let spawn_half = |range: RangeInclusive<u8>| {
            let llm = Arc::clone(&self.llm);
            let timeout = self.half_timeout;
            let prompt = fast_prompt(answers, references, range, mode);
            let request = CompletionRequest::prompt(ModelTier::Fast, FAST_SYSTEM, prompt)
                .with_max_tokens(3500)
                .with_temperature(0.1);
            tokio::spawn(async move {
                match tokio::time::timeout(timeout, llm.complete(request)).await {
                    Ok(result) => result.map_err(GeneratorError::from),
                    Err(_) => Err(GeneratorError::Timeout(timeout)),
                }
            })
        };

        let first = spawn_half(FIRST_HALF);
        let second = spawn_half(SECOND_HALF);
        let (first, second) = tokio::join!(first, second);

        // Either half failing sends the whole document to the fallback.
        let first = first.map_err(|e| GeneratorError::Task(e.to_string()))??;
        let second = second.map_err(|e| GeneratorError::Task(e.to_string()))??;

        info!("Parallel halves completed");
        Ok(format!("{}\n\n{}", tidy_output(&first), tidy_output(&second)))
    }
}

#[async_trait]
impl ContentGenerator for FastGenerator {
    async fn generate(
        &self,
        answers: &Answers,
        context: &GenerationContext,
        mode: GenerationMode,
    ) -> Result<String, GeneratorError> {
        let references = render_references(context, DOCUMENT_EXCERPT_CHARS);
        let result = match self.mode {
            FastMode::Single => self.single(answers, &references, mode).await,
            FastMode::Parallel => self.parallel(answers, &references, mode).await,
        };
        if let Err(e) = &result {
            warn!("Fast generation ({:?}) failed: {e}", self.mode);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::strategy::test_support::body_with_sections;
    use crate::generation::strategy::KnowledgeExcerpt;
    use crate::llm_client::testing::ScriptedCompletion;
    use crate::llm_client::LlmError;

    fn halves_llm() -> ScriptedCompletion {
        ScriptedCompletion::new(|req| {
            let prompt = req.last_user_text().unwrap_or_default();
            if prompt.contains("as seções 1 a 7") {
                Ok(body_with_sections(1..=7))
            } else {
                Ok(body_with_sections(8..=14))
            }
        })
    }

    #[tokio::test]
    async fn test_parallel_joins_halves_in_fixed_order() {
        let llm = Arc::new(halves_llm());
        let gen = FastGenerator::new(llm.clone(), FastMode::Parallel, Duration::from_secs(60));
        let body = gen
            .generate(&Answers::default(), &GenerationContext::default(), GenerationMode::Preview)
            .await
            .unwrap();
        assert_eq!(
            body,
            format!("{}\n\n{}", body_with_sections(1..=7), body_with_sections(8..=14))
        );
        assert_eq!(llm.calls().len(), 2);
        assert!(llm.calls().iter().all(|c| c.tier == ModelTier::Fast));
    }

    #[tokio::test]
    async fn test_parallel_fails_when_one_half_errors() {
        let llm = Arc::new(ScriptedCompletion::new(|req| {
            if req.last_user_text().unwrap_or_default().contains("as seções 8 a 14") {
                Err(LlmError::EmptyContent)
            } else {
                Ok(body_with_sections(1..=7))
            }
        }));
        let gen = FastGenerator::new(llm, FastMode::Parallel, Duration::from_secs(60));
        let result = gen
            .generate(&Answers::default(), &GenerationContext::default(), GenerationMode::Preview)
            .await;
        assert!(matches!(result, Err(GeneratorError::Llm(LlmError::EmptyContent))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_half_timeout_is_an_error() {
        let llm = Arc::new(halves_llm().with_delay(Duration::from_secs(120)));
        let gen = FastGenerator::new(llm, FastMode::Parallel, Duration::from_secs(60));
        let result = gen
            .generate(&Answers::default(), &GenerationContext::default(), GenerationMode::Preview)
            .await;
        assert!(matches!(result, Err(GeneratorError::Timeout(d)) if d == Duration::from_secs(60)));
    }

    #[tokio::test]
    async fn test_both_halves_carry_document_and_knowledge_context() {
        let llm = Arc::new(halves_llm());
        let gen = FastGenerator::new(llm.clone(), FastMode::Parallel, Duration::from_secs(60));
        let context = GenerationContext {
            document_text: Some(format!("Termo de referência{}", "x".repeat(3000))),
            knowledge: vec![KnowledgeExcerpt {
                filename: "modelo_etp.docx".to_string(),
                content: "Modelo padrão da secretaria".to_string(),
            }],
        };
        gen.generate(&Answers::default(), &context, GenerationMode::Final)
            .await
            .unwrap();

        let calls = llm.calls();
        assert_eq!(calls.len(), 2);
        for call in &calls {
            let prompt = call.last_user_text().unwrap();
            assert!(prompt.contains("DOCUMENTO ANEXADO"));
            assert!(prompt.contains("Termo de referência"));
            assert!(!prompt.contains(&"x".repeat(1000)));
            assert!(prompt.contains("[modelo_etp.docx]\nModelo padrão da secretaria"));
            assert!(prompt.contains("versão final"));
        }
    }

    #[tokio::test]
    async fn test_single_mode_issues_one_terse_call() {
        let llm = Arc::new(ScriptedCompletion::fixed("1. INTRODUÇÃO"));
        let gen = FastGenerator::new(llm.clone(), FastMode::Single, Duration::from_secs(60));
        gen.generate(&Answers::default(), &GenerationContext::default(), GenerationMode::Preview)
            .await
            .unwrap();
        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0]
            .last_user_text()
            .unwrap()
            .contains("14 seções obrigatórias"));
    }
}
