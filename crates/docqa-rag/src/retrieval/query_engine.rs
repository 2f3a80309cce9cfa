//! Query engine bound to one collection

use std::sync::Arc;
use std::time::Instant;

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::generation::Synthesizer;
use crate::providers::{EmbeddingProvider, LlmProvider};
use crate::storage::CollectionStore;
use crate::types::{ChatMessage, QueryResponse, ScoredChunk, SourceNode};

/// Read-only handle over one collection
///
/// Every call re-embeds the question and re-queries the store; nothing is
/// cached between questions.
#[derive(Clone)]
pub struct QueryEngine {
    store: CollectionStore,
    collection: String,
    embedder: Arc<dyn EmbeddingProvider>,
    synthesizer: Synthesizer,
    top_k: usize,
}

impl QueryEngine {
    /// Bind to an existing collection
    ///
    /// The embedder must match the model and dimensionality the collection
    /// was built with.
    pub fn open(
        store: CollectionStore,
        collection: &str,
        embedder: Arc<dyn EmbeddingProvider>,
        llm: Arc<dyn LlmProvider>,
        config: &RetrievalConfig,
    ) -> Result<Self> {
        let info = store
            .get_collection(collection)?
            .ok_or_else(|| Error::CollectionNotFound(collection.to_string()))?;

        if info.embedding_model != embedder.model() || info.dimensions != embedder.dimensions() {
            return Err(Error::EmbeddingMismatch(format!(
                "collection '{}' was built with {} ({} dims), query embedder is {} ({} dims)",
                collection,
                info.embedding_model,
                info.dimensions,
                embedder.model(),
                embedder.dimensions()
            )));
        }

        Ok(Self {
            store,
            collection: collection.to_string(),
            embedder,
            synthesizer: Synthesizer::new(llm, config.response_mode),
            top_k: config.top_k,
        })
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Top-K chunks for a question, best first
    pub async fn retrieve(&self, question: &str) -> Result<Vec<ScoredChunk>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::EmptyQuestion);
        }

        let vector = self.embedder.embed(question).await?;
        let results = self.store.query(&self.collection, &vector, self.top_k)?;

        tracing::debug!(
            "Retrieved {} chunks from {} (best score {:?})",
            results.len(),
            self.collection,
            results.first().map(|r| r.score)
        );
        Ok(results)
    }

    /// Answer a question from the collection
    pub async fn query(&self, question: &str) -> Result<QueryResponse> {
        self.query_with_history(question, &[]).await
    }

    /// Answer a question with prior turns as extra prompt context
    ///
    /// Retrieval uses the question alone.
    pub async fn query_with_history(
        &self,
        question: &str,
        history: &[ChatMessage],
    ) -> Result<QueryResponse> {
        let start = Instant::now();
        let question = question.trim();

        let retrieved = self.retrieve(question).await?;
        let answer = self
            .synthesizer
            .synthesize(question, &retrieved, history)
            .await?;

        let processing_time_ms = start.elapsed().as_millis() as u64;
        tracing::info!(
            "Answered question against {} in {}ms ({} sources)",
            self.collection,
            processing_time_ms,
            retrieved.len()
        );

        Ok(QueryResponse {
            answer,
            sources: retrieved.iter().map(SourceNode::from).collect(),
            collection: self.collection.clone(),
            processing_time_ms,
        })
    }
}
