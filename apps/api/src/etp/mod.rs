pub mod handlers;
pub mod lifecycle;
pub mod questions;
pub mod service;

pub use lifecycle::SessionStatus;
pub use questions::{question, Answers, QUESTIONS};
pub use service::EtpService;
