//! Response types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::conversation::ChatMessage;
use super::document::Chunk;

/// A retrieved chunk with its similarity score
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    /// The retrieved chunk
    pub chunk: Chunk,
    /// Cosine similarity (-1.0 to 1.0, higher is closer)
    pub score: f32,
}

/// Retrieved chunk as shown to the user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceNode {
    pub chunk_id: Uuid,
    pub filename: String,
    pub page_number: Option<u32>,
    pub seq: u32,
    pub text: String,
    pub score: f32,
}

impl From<&ScoredChunk> for SourceNode {
    fn from(scored: &ScoredChunk) -> Self {
        Self {
            chunk_id: scored.chunk.id,
            filename: scored.chunk.source.filename.clone(),
            page_number: scored.chunk.source.page_number,
            seq: scored.chunk.seq,
            text: scored.chunk.text.clone(),
            score: scored.score,
        }
    }
}

/// Answer from the query engine
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    /// Synthesized answer
    pub answer: String,
    /// Chunks the answer was grounded on, best first
    pub sources: Vec<SourceNode>,
    /// Collection the question was answered against
    pub collection: String,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
}

impl std::fmt::Display for QueryResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.answer)
    }
}

/// Result of processing an upload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentSummary {
    pub filename: String,
    pub collection: String,
    pub total_pages: Option<u32>,
    pub segments: usize,
    pub chunks_indexed: usize,
    /// True when the identical document was already indexed and nothing was added
    pub already_indexed: bool,
    pub processing_time_ms: u64,
}

/// Collection listing entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CollectionInfo {
    pub name: String,
    pub metric: String,
    pub embedding_model: String,
    pub dimensions: usize,
    pub chunk_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Chat transcript view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptResponse {
    pub messages: Vec<ChatMessage>,
}

/// Session view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub credentials_set: bool,
    pub active_document: Option<DocumentSummary>,
    pub messages: usize,
}
