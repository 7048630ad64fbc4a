use std::sync::Arc;

use async_trait::async_trait;

use crate::etp::Answers;
use crate::llm_client::prompts::PROCUREMENT_SPECIALIST;
use crate::llm_client::{CompletionRequest, ModelTier, TextCompletion};

use super::prompts::{optimized_prompt, render_context};
use super::strategy::{
    ContentGenerator, GenerationContext, GenerationMode, GeneratorError,
};

const DOCUMENT_EXCERPT_CHARS: usize = 1000;

/// All 14 sections in a single batched call.
pub struct OptimizedGenerator {
    llm: Arc<dyn TextCompletion>,
}

impl OptimizedGenerator {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentGenerator for OptimizedGenerator {
    async fn generate(
        &self,
        answers: &Answers,
        context: &GenerationContext,
        mode: GenerationMode,
    ) -> Result<String, GeneratorError> {
        let context_text = render_context(answers, context, DOCUMENT_EXCERPT_CHARS);
        let request = CompletionRequest::prompt(
            ModelTier::Balanced,
            PROCUREMENT_SPECIALIST,
            optimized_prompt(&context_text, mode),
        )
        .with_max_tokens(8000)
        .with_temperature(0.3);

        Ok(self.llm.complete(request).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedCompletion;

    #[tokio::test]
    async fn test_single_balanced_call_with_short_excerpt() {
        let llm = Arc::new(ScriptedCompletion::fixed("1. INTRODUÇÃO\n\nTexto."));
        let gen = OptimizedGenerator::new(llm.clone());
        let ctx = GenerationContext {
            document_text: Some("d".repeat(2000)),
            knowledge: Vec::new(),
        };
        let out = gen
            .generate(&Answers::default(), &ctx, GenerationMode::Preview)
            .await
            .unwrap();
        assert_eq!(out, "1. INTRODUÇÃO\n\nTexto.");

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tier, ModelTier::Balanced);
        let prompt = calls[0].last_user_text().unwrap();
        assert!(prompt.contains(&"d".repeat(1000)));
        assert!(!prompt.contains(&"d".repeat(1001)));
        assert!(prompt.contains("6 a 8 parágrafos"));
        assert!(prompt.contains("prévia para revisão"));
    }

    #[tokio::test]
    async fn test_upstream_error_propagates_to_orchestrator() {
        let gen = OptimizedGenerator::new(Arc::new(ScriptedCompletion::failing()));
        let result = gen
            .generate(&Answers::default(), &GenerationContext::default(), GenerationMode::Final)
            .await;
        assert!(matches!(result, Err(GeneratorError::Llm(_))));
    }
}
