//! docqa-rag: question answering and chat over uploaded PDFs
//!
//! An upload is parsed into text segments, split into overlapping chunks,
//! embedded and stored in a named collection. Questions are embedded the same
//! way, the nearest chunks retrieved and an LLM answers from them. The HTTP
//! server wraps this in per-user sessions; the `docqa` binary drives the same
//! pipeline from a terminal.

pub mod chat;
pub mod config;
pub mod error;
pub mod generation;
pub mod ingestion;
pub mod providers;
pub mod retrieval;
pub mod server;
pub mod storage;
pub mod types;

pub use chat::ChatInterface;
pub use config::RagConfig;
pub use error::{Error, Result};
pub use ingestion::{DocumentProcessor, ProcessedDocument, TextChunker};
pub use retrieval::{Indexer, QueryEngine};
pub use server::DocQaServer;
pub use storage::CollectionStore;
pub use types::{
    document::{Chunk, ChunkSource, Document, FileType},
    query::{Credentials, QueryRequest},
    response::{DocumentSummary, QueryResponse, SourceNode},
};
