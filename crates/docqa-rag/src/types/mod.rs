//! Core types for the document Q&A system

pub mod conversation;
pub mod document;
pub mod query;
pub mod response;

pub use conversation::{ChatMessage, ConversationState, Role};
pub use document::{
    hash_content, Chunk, ChunkSource, Document, FileType, ParsedDocument, ParsedSegment,
};
pub use query::{ChatRequest, Credentials, QueryRequest};
pub use response::{
    CollectionInfo, DocumentSummary, QueryResponse, ScoredChunk, SessionResponse, SourceNode,
    TranscriptResponse,
};
