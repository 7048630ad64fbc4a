pub mod analyzer;
pub mod extract;
pub mod prompts;

pub use analyzer::{AnalysisResult, DocumentAnalyzer, LlmDocumentAnalyzer};
pub use extract::FileKind;
