//! Document parser abstraction

use async_trait::async_trait;
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{hash_content, Document, FileType, ParsedDocument, ParsedSegment};

/// Turns an uploaded file into ordered text segments
///
/// Implementations:
/// - `LlamaParseClient`: cloud parsing service (default)
/// - `LocalPdfParser`: offline extraction with lopdf/pdf-extract
#[async_trait]
pub trait DocumentParser: Send + Sync {
    /// Parse raw bytes. Fails when no text could be extracted.
    async fn parse(&self, filename: &str, data: &[u8]) -> Result<ParsedDocument>;

    /// Parser name for logging
    fn name(&self) -> &str;
}

/// Read a file from disk into an upload
pub async fn read_document(path: &Path) -> Result<Document> {
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| Error::parse(path.display().to_string(), "path has no file name"))?;

    let data = tokio::fs::read(path).await?;
    tracing::debug!("Read {} ({} bytes) from {}", filename, data.len(), path.display());

    Ok(Document::new(filename, data))
}

/// Read a file from disk and parse it with the given parser
pub async fn parse_file(parser: &dyn DocumentParser, path: &Path) -> Result<ParsedDocument> {
    let document = read_document(path).await?;
    parser.parse(&document.filename, &document.data).await
}

/// Reject anything that is not a PDF, text or markdown file
pub(crate) fn check_supported(filename: &str) -> Result<FileType> {
    match FileType::from_filename(filename) {
        FileType::Unknown => {
            let ext = filename
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_string())
                .unwrap_or_else(|| filename.to_string());
            Err(Error::UnsupportedFileType(ext))
        }
        file_type => Ok(file_type),
    }
}

/// Plain text and markdown pass through as a single segment
pub(crate) fn parse_plain_text(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
    let text = String::from_utf8_lossy(data).replace('\0', "");
    finish(
        filename,
        vec![ParsedSegment::text(text)],
        None,
        hash_content(data),
    )
}

/// Build the parsed document and fail when it carries no text
pub(crate) fn finish(
    filename: &str,
    segments: Vec<ParsedSegment>,
    total_pages: Option<u32>,
    content_hash: String,
) -> Result<ParsedDocument> {
    let parsed = ParsedDocument::new(filename, segments, total_pages, content_hash);
    if parsed.is_empty() {
        return Err(Error::parse(
            filename,
            "no text content could be extracted from the document",
        ));
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_single_segment() {
        let parsed = parse_plain_text("notes.txt", b"Some notes.\nMore notes.").unwrap();
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.segments[0].page_number, None);
        assert_eq!(parsed.content_hash, hash_content(b"Some notes.\nMore notes."));
    }

    #[test]
    fn test_blank_document_is_parse_error() {
        let err = parse_plain_text("empty.txt", b"   \n ").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }

    struct PlainParser;

    #[async_trait]
    impl DocumentParser for PlainParser {
        async fn parse(&self, filename: &str, data: &[u8]) -> Result<ParsedDocument> {
            parse_plain_text(filename, data)
        }

        fn name(&self) -> &str {
            "plain"
        }
    }

    #[tokio::test]
    async fn test_parse_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, "Kept on disk.").unwrap();

        let parsed = parse_file(&PlainParser, &path).await.unwrap();
        assert_eq!(parsed.filename, "notes.txt");
        assert_eq!(parsed.segments[0].text, "Kept on disk.");
        assert_eq!(parsed.content_hash, hash_content(b"Kept on disk."));

        let document = read_document(&path).await.unwrap();
        assert_eq!(document.file_type, FileType::Txt);
        assert_eq!(document.size(), 13);
    }

    #[tokio::test]
    async fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = parse_file(&PlainParser, &dir.path().join("gone.pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_unsupported_type() {
        assert_eq!(check_supported("a.pdf").unwrap(), FileType::Pdf);
        let err = check_supported("sheet.xlsx").unwrap_err();
        assert!(matches!(err, Error::UnsupportedFileType(ext) if ext == "xlsx"));
    }
}
