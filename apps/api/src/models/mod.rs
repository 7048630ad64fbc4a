pub mod analysis;
pub mod chat;
pub mod knowledge;
pub mod session;

pub use analysis::{AnalysisStatus, DocumentAnalysis};
pub use chat::ChatSession;
pub use knowledge::KnowledgeEntry;
pub use session::EtpSession;
