pub mod handlers;
pub mod prompts;
pub mod service;
pub mod topic_gate;

pub use service::ChatService;
