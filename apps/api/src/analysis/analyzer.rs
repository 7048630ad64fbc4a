use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{info, warn};

use crate::etp::{question, Answers};
use crate::llm_client::prompts::JSON_ONLY_SYSTEM;
use crate::llm_client::{complete_json, CompletionRequest, LlmError, ModelTier, TextCompletion};

use super::extract::{extract_text, ExtractError, FileKind};
use super::prompts::{analysis_prompt, ANALYZER_SYSTEM};

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error(transparent)]
    Extraction(#[from] ExtractError),

    #[error("document analysis failed: {0}")]
    Llm(#[from] LlmError),
}

/// Structured output of the analysis call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Raw answers keyed by question number, as returned by the model.
    #[serde(default)]
    pub extracted_answers: Map<String, Value>,
    #[serde(default, deserialize_with = "lenient_strings")]
    pub missing_info: Vec<String>,
    #[serde(default, deserialize_with = "lenient_confidence")]
    pub confidence: BTreeMap<String, f64>,
    #[serde(default)]
    pub summary: String,
}

impl AnalysisResult {
    /// Result used when the model answer cannot be parsed: nothing extracted,
    /// every question missing.
    pub fn unreadable() -> Self {
        Self {
            missing_info: (1..=5).map(|n| n.to_string()).collect(),
            ..Self::default()
        }
    }

    /// Missing entries as question texts where they name a question number.
    pub fn missing_questions(&self) -> Vec<String> {
        self.missing_info
            .iter()
            .map(|m| {
                m.trim()
                    .parse::<u8>()
                    .ok()
                    .and_then(question)
                    .map(|q| q.text.to_string())
                    .unwrap_or_else(|| m.clone())
            })
            .collect()
    }
}

fn lenient_strings<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<String>, D::Error> {
    let values = Option::<Vec<Value>>::deserialize(d)?.unwrap_or_default();
    Ok(values
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
        .collect())
}

/// Accepts a per-question map or a single overall number.
fn lenient_confidence<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeMap<String, f64>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Object(map) => map
            .into_iter()
            .filter_map(|(k, v)| v.as_f64().map(|f| (k, f)))
            .collect(),
        Value::Number(n) => n
            .as_f64()
            .map(|f| BTreeMap::from([("overall".to_string(), f)]))
            .unwrap_or_default(),
        _ => BTreeMap::new(),
    })
}

/// Three-call boundary used by the upload path.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    async fn extract_text(&self, bytes: Vec<u8>, kind: FileKind) -> Result<String, AnalyzerError>;

    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalyzerError>;

    fn extract_answers(&self, result: &AnalysisResult) -> Answers {
        Answers::from_raw(&result.extracted_answers)
    }
}

pub struct LlmDocumentAnalyzer {
    llm: Arc<dyn TextCompletion>,
}

impl LlmDocumentAnalyzer {
    pub fn new(llm: Arc<dyn TextCompletion>) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl DocumentAnalyzer for LlmDocumentAnalyzer {
    async fn extract_text(&self, bytes: Vec<u8>, kind: FileKind) -> Result<String, AnalyzerError> {
        let size = bytes.len();
        let text = extract_text(bytes, kind).await?;
        info!(
            "Extracted {} chars from {} bytes of {}",
            text.chars().count(),
            size,
            kind.as_str()
        );
        Ok(text)
    }

    async fn analyze(&self, text: &str) -> Result<AnalysisResult, AnalyzerError> {
        let request = CompletionRequest::prompt(
            ModelTier::Balanced,
            format!("{ANALYZER_SYSTEM} {JSON_ONLY_SYSTEM}"),
            analysis_prompt(text),
        )
        .with_max_tokens(1500)
        .with_temperature(0.1);

        match complete_json::<AnalysisResult>(self.llm.as_ref(), request).await {
            Ok(result) => Ok(result),
            Err(LlmError::Parse(e)) => {
                warn!("Analysis response was not valid JSON: {e}");
                Ok(AnalysisResult::unreadable())
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;

    /// Analyzer that skips the model and returns fixed answers.
    pub struct FixedAnalyzer {
        pub result: Result<AnalysisResult, String>,
    }

    impl FixedAnalyzer {
        pub fn answering(pairs: &[(&str, &str)]) -> Self {
            let extracted_answers = pairs
                .iter()
                .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
                .collect();
            Self {
                result: Ok(AnalysisResult {
                    extracted_answers,
                    ..AnalysisResult::default()
                }),
            }
        }

        pub fn failing() -> Self {
            Self {
                result: Err("analysis service unavailable".to_string()),
            }
        }
    }

    #[async_trait]
    impl DocumentAnalyzer for FixedAnalyzer {
        async fn extract_text(&self, bytes: Vec<u8>, kind: FileKind) -> Result<String, AnalyzerError> {
            Ok(super::super::extract::extract_text_blocking(&bytes, kind)?)
        }

        async fn analyze(&self, _text: &str) -> Result<AnalysisResult, AnalyzerError> {
            self.result.clone().map_err(|message| {
                AnalyzerError::Llm(LlmError::Api {
                    status: 503,
                    message,
                })
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm_client::testing::ScriptedCompletion;

    #[tokio::test]
    async fn test_analyze_parses_model_json() {
        let llm = Arc::new(ScriptedCompletion::fixed(
            r#"```json
{"extracted_answers": {"1": "Aquisição de notebooks", "2": true},
 "missing_info": [3, 4, "5"],
 "confidence": {"1": 0.9, "2": 0.6},
 "summary": "Termo de referência de notebooks."}
```"#,
        ));
        let analyzer = LlmDocumentAnalyzer::new(llm.clone());
        let result = analyzer.analyze("documento").await.unwrap();

        let answers = analyzer.extract_answers(&result);
        assert_eq!(answers.get(1), Some("Aquisição de notebooks"));
        assert_eq!(answers.get(2), Some("Sim"));
        assert_eq!(result.missing_info, vec!["3", "4", "5"]);
        assert_eq!(result.confidence.get("1"), Some(&0.9));
        assert_eq!(
            result.missing_questions()[0],
            "Quais normas legais pretende utilizar?"
        );
        assert_eq!(llm.calls()[0].tier, ModelTier::Balanced);
    }

    #[tokio::test]
    async fn test_unparseable_answer_yields_empty_result() {
        let analyzer = LlmDocumentAnalyzer::new(Arc::new(ScriptedCompletion::fixed(
            "Desculpe, não consegui analisar.",
        )));
        let result = analyzer.analyze("documento").await.unwrap();
        assert!(result.extracted_answers.is_empty());
        assert_eq!(result.missing_info.len(), 5);
    }

    #[tokio::test]
    async fn test_upstream_failure_is_an_error() {
        let analyzer = LlmDocumentAnalyzer::new(Arc::new(ScriptedCompletion::failing()));
        assert!(matches!(
            analyzer.analyze("documento").await,
            Err(AnalyzerError::Llm(_))
        ));
    }

    #[test]
    fn test_overall_confidence_number_is_accepted() {
        let result: AnalysisResult =
            serde_json::from_str(r#"{"confidence": 0.7, "missing_info": null}"#).unwrap();
        assert_eq!(result.confidence.get("overall"), Some(&0.7));
        assert!(result.missing_info.is_empty());
    }
}
