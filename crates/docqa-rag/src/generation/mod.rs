//! Answer synthesis with the LLM

pub mod prompt;
pub mod synthesizer;

pub use prompt::{PromptBuilder, CONTEXT_DELIMITER, EMPTY_RESPONSE};
pub use synthesizer::Synthesizer;
