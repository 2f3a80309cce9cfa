//! Offline PDF text extraction
//!
//! Extracts per-page text with lopdf and falls back to pdf-extract for the
//! whole document when lopdf yields nothing. No OCR: image-only PDFs fail.

use async_trait::async_trait;

use super::parser::{check_supported, finish, parse_plain_text, DocumentParser};
use crate::error::{Error, Result};
use crate::types::{hash_content, FileType, ParsedDocument, ParsedSegment};

/// Parser that never leaves the machine
#[derive(Debug, Clone, Default)]
pub struct LocalPdfParser;

impl LocalPdfParser {
    pub fn new() -> Self {
        Self
    }

    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        if !data.starts_with(b"%PDF-") {
            return Err(Error::parse(filename, "missing PDF header"));
        }

        let (segments, total_pages) = match lopdf::Document::load_mem(data) {
            Ok(doc) => {
                let pages: Vec<u32> = doc.get_pages().keys().copied().collect();
                let segments = pages
                    .iter()
                    .filter_map(|&page| match doc.extract_text(&[page]) {
                        Ok(text) => Some(ParsedSegment::page(page, cleanup_pdf_text(&text))),
                        Err(e) => {
                            tracing::debug!("lopdf could not extract page {}: {}", page, e);
                            None
                        }
                    })
                    .collect::<Vec<_>>();
                (segments, Some(pages.len() as u32))
            }
            Err(e) => {
                tracing::warn!("lopdf failed to load {}: {}, trying pdf-extract", filename, e);
                (Vec::new(), None)
            }
        };

        if segments.iter().any(|s| !s.text.trim().is_empty()) {
            return finish(filename, segments, total_pages, hash_content(data));
        }

        let text = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::parse(filename, format!("failed to extract PDF text: {}", e)))?;

        // pdf-extract separates pages with form feeds
        let segments = text
            .split('\u{c}')
            .enumerate()
            .map(|(i, page)| ParsedSegment::page(i as u32 + 1, cleanup_pdf_text(page)))
            .collect();

        finish(filename, segments, total_pages, hash_content(data))
    }
}

#[async_trait]
impl DocumentParser for LocalPdfParser {
    async fn parse(&self, filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        match check_supported(filename)? {
            FileType::Pdf => {
                let filename = filename.to_string();
                let data = data.to_vec();
                // Extraction is CPU bound and can stall on odd fonts
                tokio::task::spawn_blocking(move || Self::parse_pdf(&filename, &data))
                    .await
                    .map_err(|e| Error::internal(format!("PDF extraction task failed: {}", e)))?
            }
            _ => parse_plain_text(filename, data),
        }
    }

    fn name(&self) -> &str {
        "local"
    }
}

/// Normalise ligatures, odd spaces and blank lines left by PDF extraction
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\0', "")
        .replace('\u{00A0}', " ")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup() {
        let cleaned = cleanup_pdf_text("  e\u{FB03}cient\u{00A0}flow \n\n\0  next line  ");
        assert_eq!(cleaned, "efficient flow\nnext line");
    }

    #[tokio::test]
    async fn test_text_passthrough() {
        let parsed = LocalPdfParser::new()
            .parse("notes.md", b"# Heading\n\nParagraph.")
            .await
            .unwrap();
        assert_eq!(parsed.segments.len(), 1);
        assert_eq!(parsed.segments[0].text, "# Heading\n\nParagraph.");
    }

    #[tokio::test]
    async fn test_garbage_pdf_is_parse_error() {
        let err = LocalPdfParser::new()
            .parse("broken.pdf", b"this is not a pdf")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
