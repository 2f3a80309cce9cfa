//! LLM provider trait for answer synthesis

use async_trait::async_trait;
use crate::error::Result;

/// Trait for text completion
///
/// The prompt is fully rendered by the synthesizer; providers only send it.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Complete a prompt
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Input plus output budget of the model, in tokens
    fn context_window(&self) -> usize;

    /// Maximum tokens the model is asked to generate
    fn max_output_tokens(&self) -> usize;

    /// Model being used
    fn model(&self) -> &str;

    /// Provider name for logging
    fn name(&self) -> &str;
}
