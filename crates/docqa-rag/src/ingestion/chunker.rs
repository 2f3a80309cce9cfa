//! Text chunking with overlap and source tracking
//!
//! Chunks are contiguous slices of their segment. Consecutive chunks from the
//! same segment share at most `overlap` characters, and the shared span is the
//! same bytes of the segment in both chunks.

use unicode_segmentation::UnicodeSegmentation;

use crate::config::ChunkingConfig;
use crate::types::{Chunk, ChunkSource, ParsedDocument};

/// Smallest piece the chunker will not split further
#[derive(Debug, Clone, Copy)]
struct Unit {
    start: usize,
    end: usize,
    chars: usize,
    /// Unit ends a sentence
    sentence_end: bool,
}

/// Text chunker with configurable size and overlap (both in characters)
#[derive(Debug, Clone)]
pub struct TextChunker {
    chunk_size: usize,
    overlap: usize,
}

impl TextChunker {
    /// Create a new chunker
    ///
    /// `chunk_size` is raised to at least 1 and `overlap` is clamped below it.
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            chunk_size,
            overlap: overlap.min(chunk_size - 1),
        }
    }

    /// Create from configuration
    pub fn from_config(config: &ChunkingConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Chunk a parsed document. Sequence indices run across all segments.
    pub fn chunk_document(&self, parsed: &ParsedDocument) -> Vec<Chunk> {
        let mut chunks = Vec::new();

        for (segment_index, segment) in parsed.segments.iter().enumerate() {
            for (start, end) in self.split_spans(&segment.text) {
                let source = ChunkSource {
                    filename: parsed.filename.clone(),
                    document_hash: parsed.content_hash.clone(),
                    segment_index,
                    page_number: segment.page_number,
                    byte_start: start,
                    byte_end: end,
                };
                let seq = chunks.len() as u32;
                chunks.push(Chunk::new(segment.text[start..end].to_string(), source, seq));
            }
        }

        tracing::debug!(
            "Chunked {} into {} chunks (size {}, overlap {})",
            parsed.filename,
            chunks.len(),
            self.chunk_size,
            self.overlap
        );

        chunks
    }

    /// Split text into chunk byte spans
    pub fn split_spans(&self, text: &str) -> Vec<(usize, usize)> {
        let units = self.units(text);
        let mut spans: Vec<(usize, usize)> = Vec::new();
        let mut i = 0usize;
        // Unit index one past the previous chunk
        let mut prev_end = 0usize;

        while i < units.len() {
            // Grow the chunk greedily
            let mut j = i;
            let mut len = 0usize;
            while j < units.len() && len + units[j].chars <= self.chunk_size {
                len += units[j].chars;
                j += 1;
            }

            // Prefer ending on a sentence if that keeps at least half the chunk
            if j < units.len() {
                let mut kept = len;
                for m in (i.max(prev_end) + 1..=j).rev() {
                    if units[m - 1].sentence_end && kept * 2 >= self.chunk_size {
                        j = m;
                        break;
                    }
                    kept -= units[m - 1].chars;
                }
            }

            if let Some(span) = trim_span(text, units[i].start, units[j - 1].end) {
                // A chunk that adds only whitespace past the previous one is
                // dropped; one that starts where the previous one did replaces it
                match spans.last_mut() {
                    Some(last) if span.1 <= last.1 => {}
                    Some(last) if span.0 <= last.0 => *last = span,
                    _ => spans.push(span),
                }
            }
            prev_end = j;

            if j >= units.len() {
                break;
            }

            // Step back over whole units for the overlap. The next chunk must
            // start after this one and still reach past it.
            let mut k = j;
            let mut overlap = 0usize;
            while k > i + 1 {
                let candidate = overlap + units[k - 1].chars;
                if candidate > self.overlap || candidate + units[j].chars > self.chunk_size {
                    break;
                }
                overlap = candidate;
                k -= 1;
            }
            i = k;
        }

        spans
    }

    /// Split text into word-level units no longer than the chunk size
    fn units(&self, text: &str) -> Vec<Unit> {
        let sentence_ends: Vec<usize> = text
            .split_sentence_bound_indices()
            .map(|(start, s)| start + s.len())
            .collect();

        let mut units = Vec::new();
        for (start, word) in text.split_word_bound_indices() {
            let end = start + word.len();
            let chars = word.chars().count();

            if chars <= self.chunk_size {
                units.push(Unit {
                    start,
                    end,
                    chars,
                    sentence_end: sentence_ends.binary_search(&end).is_ok(),
                });
                continue;
            }

            // Over-long word: hard split on character boundaries
            let mut piece_start = start;
            let mut piece_chars = 0usize;
            for (offset, _) in word.char_indices() {
                if piece_chars == self.chunk_size {
                    units.push(Unit {
                        start: piece_start,
                        end: start + offset,
                        chars: piece_chars,
                        sentence_end: false,
                    });
                    piece_start = start + offset;
                    piece_chars = 0;
                }
                piece_chars += 1;
            }
            units.push(Unit {
                start: piece_start,
                end,
                chars: piece_chars,
                sentence_end: sentence_ends.binary_search(&end).is_ok(),
            });
        }

        units
    }
}

impl Default for TextChunker {
    fn default() -> Self {
        Self::from_config(&ChunkingConfig::default())
    }
}

/// Shrink a span to exclude surrounding whitespace; `None` if nothing is left
fn trim_span(text: &str, start: usize, end: usize) -> Option<(usize, usize)> {
    let slice = &text[start..end];
    let leading = slice.len() - slice.trim_start().len();
    let trailing = slice.len() - slice.trim_end().len();
    if leading == slice.len() {
        return None;
    }
    Some((start + leading, end - trailing))
}
