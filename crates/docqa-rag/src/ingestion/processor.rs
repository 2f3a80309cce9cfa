//! Document processing pipeline: parse, chunk, index

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use super::chunker::TextChunker;
use super::parser::read_document;
use crate::config::RagConfig;
use crate::error::{Error, Result};
use crate::providers::Providers;
use crate::retrieval::{Indexer, QueryEngine};
use crate::storage::{collection_name_for, sanitize_collection_name, CollectionStore};
use crate::types::{Document, DocumentSummary};

/// A processed upload and the engine bound to its collection
#[derive(Clone)]
pub struct ProcessedDocument {
    pub engine: QueryEngine,
    pub summary: DocumentSummary,
}

/// Runs one upload through parser, chunker and indexer
///
/// Nothing outside the target collection is touched, and a failure before
/// indexing leaves the collection as it was.
pub struct DocumentProcessor {
    config: Arc<RagConfig>,
    store: CollectionStore,
    providers: Providers,
    chunker: TextChunker,
}

impl DocumentProcessor {
    pub fn new(config: Arc<RagConfig>, store: CollectionStore, providers: Providers) -> Self {
        let chunker = TextChunker::from_config(&config.chunking);
        Self {
            config,
            store,
            providers,
            chunker,
        }
    }

    /// Process an uploaded document
    ///
    /// `collection` overrides the configured naming policy.
    pub async fn process_document(
        &self,
        document: &Document,
        collection: Option<&str>,
    ) -> Result<ProcessedDocument> {
        let start = Instant::now();
        let collection = match collection {
            Some(name) => sanitize_collection_name(name),
            None => collection_name_for(&self.config.collections, &document.filename),
        };

        tracing::info!(
            "Processing {} ({} bytes) into {} with {} parser",
            document.filename,
            document.size(),
            collection,
            self.providers.parser.name()
        );

        let parsed = self
            .providers
            .parser
            .parse(&document.filename, &document.data)
            .await
            .map_err(|e| {
                tracing::error!("Parsing {} failed: {}", document.filename, e);
                e
            })?;

        let chunks = self.chunker.chunk_document(&parsed);
        if chunks.is_empty() {
            return Err(Error::parse(&document.filename, "document produced no chunks"));
        }

        let indexer = Indexer::new(
            self.store.clone(),
            self.providers.embedder.clone(),
            self.config.collections.reindex,
        );
        let report = indexer.index(&collection, chunks).await?;
        let engine = self.open_engine(&collection)?;

        let summary = DocumentSummary {
            filename: document.filename.clone(),
            collection,
            total_pages: parsed.total_pages,
            segments: parsed.segments.len(),
            chunks_indexed: report.chunks_indexed,
            already_indexed: report.already_indexed,
            processing_time_ms: start.elapsed().as_millis() as u64,
        };

        tracing::info!(
            "Processed {}: {} segments, {} chunks indexed in {}ms",
            summary.filename,
            summary.segments,
            summary.chunks_indexed,
            summary.processing_time_ms
        );

        Ok(ProcessedDocument { engine, summary })
    }

    /// Read a file from disk and process it
    pub async fn process_file(&self, path: &Path, collection: Option<&str>) -> Result<ProcessedDocument> {
        let document = read_document(path).await?;
        self.process_document(&document, collection).await
    }

    /// Query engine over an existing collection
    pub fn open_engine(&self, collection: &str) -> Result<QueryEngine> {
        QueryEngine::open(
            self.store.clone(),
            collection,
            self.providers.embedder.clone(),
            self.providers.llm.clone(),
            &self.config.retrieval,
        )
    }
}
