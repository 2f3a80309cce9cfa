//! Document, segment and chunk types with source tracking

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use uuid::Uuid;

/// Supported file types
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    /// PDF document
    Pdf,
    /// Plain text file
    Txt,
    /// Markdown file
    Markdown,
    /// Unknown file type
    Unknown,
}

impl FileType {
    /// Detect file type from extension
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "txt" | "text" => Self::Txt,
            "md" | "markdown" => Self::Markdown,
            _ => Self::Unknown,
        }
    }

    /// Detect file type from a filename, falling back to its guessed MIME type
    pub fn from_filename(filename: &str) -> Self {
        let by_ext = filename
            .rsplit_once('.')
            .map(|(_, ext)| Self::from_extension(ext))
            .unwrap_or(Self::Unknown);
        if by_ext != Self::Unknown {
            return by_ext;
        }

        match mime_guess::from_path(filename).first_raw() {
            Some("application/pdf") => Self::Pdf,
            Some("text/plain") => Self::Txt,
            Some("text/markdown") | Some("text/x-markdown") => Self::Markdown,
            _ => Self::Unknown,
        }
    }
}

/// An uploaded file, alive for one processing cycle only
#[derive(Debug, Clone)]
pub struct Document {
    /// Upload ID
    pub id: Uuid,
    /// Filename as uploaded by the user
    pub filename: String,
    /// Raw bytes
    pub data: Bytes,
    /// Detected file type
    pub file_type: FileType,
}

impl Document {
    /// Wrap uploaded bytes
    pub fn new(filename: impl Into<String>, data: impl Into<Bytes>) -> Self {
        let filename = filename.into();
        Self {
            id: Uuid::new_v4(),
            file_type: FileType::from_filename(&filename),
            filename,
            data: data.into(),
        }
    }

    /// Size in bytes
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Whether the bytes start with the PDF magic header
    pub fn looks_like_pdf(&self) -> bool {
        self.data.starts_with(b"%PDF-")
    }
}

/// One unit of parser output (a page or block)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParsedSegment {
    /// Text content (markdown or plain text)
    pub text: String,
    /// Page number (1-indexed), when the parser reports it
    pub page_number: Option<u32>,
    /// Parser-specific metadata
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl ParsedSegment {
    /// Create a segment for a page
    pub fn page(page_number: u32, text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_number: Some(page_number),
            metadata: HashMap::new(),
        }
    }

    /// Create a segment without position information
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            page_number: None,
            metadata: HashMap::new(),
        }
    }
}

/// Parser output for a whole document
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Source filename
    pub filename: String,
    /// Ordered segments
    pub segments: Vec<ParsedSegment>,
    /// Total pages (if known)
    pub total_pages: Option<u32>,
    /// Hash of the source bytes, used for re-index deduplication
    pub content_hash: String,
}

impl ParsedDocument {
    /// Build a parsed document, dropping whitespace-only segments
    pub fn new(
        filename: impl Into<String>,
        segments: Vec<ParsedSegment>,
        total_pages: Option<u32>,
        content_hash: String,
    ) -> Self {
        Self {
            filename: filename.into(),
            segments: segments
                .into_iter()
                .filter(|s| !s.text.trim().is_empty())
                .collect(),
            total_pages,
            content_hash,
        }
    }

    /// Whether no text was extracted
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Total characters across segments
    pub fn char_count(&self) -> usize {
        self.segments.iter().map(|s| s.text.chars().count()).sum()
    }
}

/// Where a chunk came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChunkSource {
    /// Original filename
    pub filename: String,
    /// Hash of the source document
    pub document_hash: String,
    /// Index of the segment the chunk was cut from
    pub segment_index: usize,
    /// Page number (1-indexed)
    pub page_number: Option<u32>,
    /// Byte offset of the chunk start within its segment
    pub byte_start: usize,
    /// Byte offset one past the chunk end within its segment
    pub byte_end: usize,
}

/// A bounded span of text, the unit of embedding and retrieval
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique chunk ID
    pub id: Uuid,
    /// Text content
    pub text: String,
    /// Source information
    pub source: ChunkSource,
    /// Sequence index within the document
    pub seq: u32,
    /// Embedding vector (empty until indexed)
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub embedding: Vec<f32>,
}

impl Chunk {
    /// Create a new chunk
    pub fn new(text: String, source: ChunkSource, seq: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            text,
            source,
            seq,
            embedding: Vec::new(),
        }
    }
}

/// Hash content for deduplication
pub fn hash_content(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_type_detection() {
        assert_eq!(FileType::from_filename("report.PDF"), FileType::Pdf);
        assert_eq!(FileType::from_filename("notes.md"), FileType::Markdown);
        assert_eq!(FileType::from_filename("archive.tar.gz"), FileType::Unknown);
        assert_eq!(FileType::from_filename("README"), FileType::Unknown);
    }

    #[test]
    fn test_parsed_document_drops_blank_segments() {
        let parsed = ParsedDocument::new(
            "a.pdf",
            vec![
                ParsedSegment::page(1, "Intro"),
                ParsedSegment::page(2, "  \n\t "),
                ParsedSegment::page(3, "Body"),
            ],
            Some(3),
            "hash".to_string(),
        );

        assert_eq!(parsed.segments.len(), 2);
        assert_eq!(parsed.segments[1].page_number, Some(3));
        assert_eq!(parsed.char_count(), 9);
    }

    #[test]
    fn test_document_hash_and_magic() {
        let doc = Document::new("a.pdf", b"%PDF-1.7 body".to_vec());
        assert!(doc.looks_like_pdf());
        assert_eq!(doc.size(), 13);
    }
}
