//! Provider abstractions for embeddings and LLM calls
//!
//! Trait-based so the query path can run against Gemini in production and
//! against offline fakes in tests.

pub mod embedding;
pub mod factory;
pub mod gemini;
pub mod llm;
pub mod retry;

pub use embedding::EmbeddingProvider;
pub use factory::{CloudProviderFactory, ProviderFactory, Providers};
pub use gemini::GeminiClient;
pub use llm::LlmProvider;
pub use retry::RetryPolicy;
