//! Embeds chunks and stores them in a named collection

use std::sync::Arc;

use crate::config::ReindexPolicy;
use crate::error::{Error, Result};
use crate::providers::EmbeddingProvider;
use crate::storage::CollectionStore;
use crate::types::Chunk;

/// What an indexing run did
#[derive(Debug, Clone, PartialEq)]
pub struct IndexReport {
    pub collection: String,
    pub chunks_indexed: usize,
    /// Chunks of earlier uploads of the same file that were removed
    pub chunks_replaced: usize,
    /// Identical content was already present; nothing was embedded
    pub already_indexed: bool,
}

/// Fetch-or-create a collection, embed, store
pub struct Indexer {
    store: CollectionStore,
    embedder: Arc<dyn EmbeddingProvider>,
    reindex: ReindexPolicy,
}

impl Indexer {
    pub fn new(store: CollectionStore, embedder: Arc<dyn EmbeddingProvider>, reindex: ReindexPolicy) -> Self {
        Self {
            store,
            embedder,
            reindex,
        }
    }

    /// Index one document's chunks into `collection`
    ///
    /// The collection is created with cosine similarity on first use, once
    /// embedding has succeeded. All chunks must come from the same document.
    pub async fn index(&self, collection: &str, mut chunks: Vec<Chunk>) -> Result<IndexReport> {
        let Some(first) = chunks.first() else {
            return Ok(IndexReport {
                collection: collection.to_string(),
                chunks_indexed: 0,
                chunks_replaced: 0,
                already_indexed: false,
            });
        };
        let filename = first.source.filename.clone();
        let document_hash = first.source.document_hash.clone();

        if self.reindex == ReindexPolicy::Dedupe
            && self.store.contains_document(collection, &document_hash)?
        {
            tracing::info!("{} is already indexed in {}, skipping", filename, collection);
            return Ok(IndexReport {
                collection: collection.to_string(),
                chunks_indexed: 0,
                chunks_replaced: 0,
                already_indexed: true,
            });
        }

        // Embed before touching stored chunks so a failed call changes nothing
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(Error::embedding(format!(
                "{} returned {} embeddings for {} chunks",
                self.embedder.name(),
                embeddings.len(),
                chunks.len()
            )));
        }
        let dimensions = self.embedder.dimensions();
        for (chunk, embedding) in chunks.iter_mut().zip(embeddings) {
            if embedding.len() != dimensions {
                return Err(Error::EmbeddingMismatch(format!(
                    "{} returned {} dimensions for chunk {}, expected {}",
                    self.embedder.name(),
                    embedding.len(),
                    chunk.seq,
                    dimensions
                )));
            }
            chunk.embedding = embedding;
        }

        self.store
            .get_or_create_collection(collection, self.embedder.model(), dimensions)?;

        let (chunks_replaced, chunks_indexed) = match self.reindex {
            ReindexPolicy::Append => (0, self.store.add_chunks(collection, &chunks)?),
            ReindexPolicy::Replace | ReindexPolicy::Dedupe => {
                self.store.replace_document(collection, &filename, &chunks)?
            }
        };

        tracing::info!(
            "Indexed {} chunks of {} into {} (replaced {})",
            chunks_indexed,
            filename,
            collection,
            chunks_replaced
        );

        Ok(IndexReport {
            collection: collection.to_string(),
            chunks_indexed,
            chunks_replaced,
            already_indexed: false,
        })
    }
}
