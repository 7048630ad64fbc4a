use std::sync::Arc;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::etp::Answers;
use crate::llm_client::{CompletionRequest, ModelTier, TextCompletion};

use super::prompts::{complete_section_prompt, render_context, COMPLETE_SYSTEM};
use super::sections::{SectionSpec, SECTIONS};
use super::strategy::{
    tidy_output, ContentGenerator, GenerationContext, GenerationMode, GeneratorError,
    MAX_DOCUMENT_EXCERPT,
};

/// One model call per section, in order. Slowest and most elaborated.
pub struct CompleteGenerator {
    llm: Arc<dyn TextCompletion>,
}

impl CompleteGenerator {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl ContentGenerator for CompleteGenerator {
    async fn generate(
        &self,
        answers: &Answers,
        context: &GenerationContext,
        mode: GenerationMode,
    ) -> Result<String, GeneratorError> {
        let context_text = render_context(answers, context, MAX_DOCUMENT_EXCERPT);
        let mut sections = Vec::with_capacity(SECTIONS.len());
        let mut last_error = None;

        for section in &SECTIONS {
            let request = CompletionRequest::prompt(
                ModelTier::Thorough,
                COMPLETE_SYSTEM,
                complete_section_prompt(section, &context_text, mode),
            )
            .with_max_tokens(2000)
            .with_temperature(0.2);

            match self.llm.complete(request).await {
                Ok(text) => {
                    info!("Generated section {}", section.number);
                    sections.push(normalize_section(&tidy_output(&text), section));
                }
                Err(e) => {
                    // Omitted; the completeness gate decides on the whole document.
                    warn!("Section {} generation failed: {e}", section.number);
                    last_error = Some(e);
                }
            }
        }

        match (sections.is_empty(), last_error) {
            (true, Some(e)) => Err(e.into()),
            _ => Ok(sections.join("\n\n")),
        }
    }
}

/// Forces the first line to the canonical heading and collapses blank-line
/// runs to a single blank line.
pub fn normalize_section(content: &str, section: &SectionSpec) -> String {
    let heading = section.heading();
    let mut lines: Vec<&str> = content.lines().collect();

    while lines.first().is_some_and(|l| l.trim().is_empty()) {
        lines.remove(0);
    }

    let prefix = format!("{}.", section.number);
    let first_is_heading = lines.first().is_some_and(|l| {
        let bare = l.trim().trim_start_matches(['#', '*']).trim_start();
        bare.starts_with(&prefix) && !bare[prefix.len()..].starts_with(|c: char| c.is_ascii_digit())
    });
    if first_is_heading {
        lines[0] = &heading;
    } else {
        lines.insert(0, &heading);
        lines.insert(1, "");
    }

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    for line in lines {
        let blank = line.trim().is_empty();
        if blank && out.last().is_some_and(|l| l.trim().is_empty()) {
            continue;
        }
        out.push(if blank { "" } else { line });
    }
    out.join("\n").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::completeness::count_section_markers;
    use crate::llm_client::testing::ScriptedCompletion;
    use crate::llm_client::LlmError;

    #[test]
    fn test_normalize_replaces_loose_title() {
        let out = normalize_section("**4. Estimativa**\n\n\n\nTexto.\n\n\nMais.", &SECTIONS[3]);
        assert_eq!(
            out,
            "4. ESTIMATIVA DAS QUANTIDADES E VALORES\n\nTexto.\n\nMais."
        );
    }

    #[test]
    fn test_normalize_inserts_missing_title() {
        let out = normalize_section("Texto sem título.", &SECTIONS[0]);
        assert_eq!(out, "1. INTRODUÇÃO\n\nTexto sem título.");
    }

    #[test]
    fn test_normalize_does_not_mistake_section_ten_for_one() {
        let out = normalize_section("10. PROVIDÊNCIAS\nTexto", &SECTIONS[0]);
        assert!(out.starts_with("1. INTRODUÇÃO\n\n10. PROVIDÊNCIAS"));
    }

    #[tokio::test]
    async fn test_one_call_per_section_in_order() {
        let llm = Arc::new(ScriptedCompletion::new(|req| {
            let prompt = req.last_user_text().unwrap_or_default();
            let heading = prompt
                .split('"')
                .nth(1)
                .unwrap_or("?")
                .to_string();
            Ok(format!("{heading}\n\nParágrafo."))
        }));
        let gen = CompleteGenerator::new(llm.clone());
        let body = gen
            .generate(&Answers::default(), &GenerationContext::default(), GenerationMode::Final)
            .await
            .unwrap();

        let calls = llm.calls();
        assert_eq!(calls.len(), 14);
        assert!(calls.iter().all(|c| c.tier == ModelTier::Thorough));
        assert_eq!(count_section_markers(&body), 14);
        assert!(body.find("1. INTRODUÇÃO").unwrap() < body.find("14. CONCLUSÃO").unwrap());
    }

    #[tokio::test]
    async fn test_failed_sections_are_omitted() {
        let llm = Arc::new(ScriptedCompletion::new(|req| {
            let prompt = req.last_user_text().unwrap_or_default();
            if prompt.contains("\"13. ANÁLISE DE RISCOS\"") || prompt.contains("\"12. AVALIAÇÃO") {
                Err(LlmError::EmptyContent)
            } else {
                Ok("Conteúdo da seção.".to_string())
            }
        }));
        let gen = CompleteGenerator::new(llm);
        let body = gen
            .generate(&Answers::default(), &GenerationContext::default(), GenerationMode::Final)
            .await
            .unwrap();
        assert_eq!(count_section_markers(&body), 12);
        assert!(!body.contains("13. ANÁLISE DE RISCOS"));
    }

    #[tokio::test]
    async fn test_all_sections_failing_is_an_error() {
        let gen = CompleteGenerator::new(Arc::new(ScriptedCompletion::failing()));
        let result = gen
            .generate(&Answers::default(), &GenerationContext::default(), GenerationMode::Preview)
            .await;
        assert!(matches!(result, Err(GeneratorError::Llm(_))));
    }
}
