pub mod complete;
pub mod completeness;
pub mod fallback;
pub mod fast;
pub mod optimized;
pub mod prompts;
pub mod sections;
pub mod strategy;

pub use strategy::{
    DocumentGenerator, FastMode, GenerationContext, GenerationMode, GenerationStrategy,
};
