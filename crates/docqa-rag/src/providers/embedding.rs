//! Embedding provider trait for generating text embeddings

use async_trait::async_trait;
use crate::error::Result;

/// Trait for generating text embeddings
///
/// Implementations:
/// - `GeminiClient`: Generative Language API (`models/embedding-001`)
///
/// Queries go through `embed`, documents through `embed_batch`; some models
/// embed the two differently.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate the embedding for a query
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for documents, one vector per input, in order
    ///
    /// Default implementation calls `embed` sequentially.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for text in texts {
            embeddings.push(self.embed(text).await?);
        }
        Ok(embeddings)
    }

    /// Embedding dimensions (768 for embedding-001)
    fn dimensions(&self) -> usize;

    /// Model identifier, recorded on every collection
    fn model(&self) -> &str;

    /// Provider name for logging
    fn name(&self) -> &str;
}
