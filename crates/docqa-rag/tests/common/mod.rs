//! Offline providers for pipeline and server tests.
//!
//! The parser reads uploads as UTF-8 text, the embedder hashes words into a
//! small bag-of-words vector and the LLM answers with the context it was given.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use docqa_rag::config::RagConfig;
use docqa_rag::error::{Error, Result};
use docqa_rag::generation::CONTEXT_DELIMITER;
use docqa_rag::ingestion::DocumentParser;
use docqa_rag::providers::{EmbeddingProvider, LlmProvider, ProviderFactory, Providers};
use docqa_rag::types::{hash_content, Credentials, Document, ParsedDocument, ParsedSegment};
use parking_lot::Mutex;

pub const FRANCE: &str = "The capital of France is Paris.";
pub const BANANAS: &str = "Bananas are a yellow fruit that grows in bunches.";

/// Bytes that pass for a PDF upload
pub fn pdf_bytes(text: &str) -> Vec<u8> {
    format!("%PDF-1.4\n{}", text).into_bytes()
}

pub fn pdf(filename: &str, text: &str) -> Document {
    Document::new(filename, pdf_bytes(text))
}

/// Treats the upload as text; each blank-line separated block is a page.
/// Any upload containing `CORRUPT` fails to parse.
#[derive(Default)]
pub struct TextParser {
    pub calls: AtomicUsize,
}

#[async_trait]
impl DocumentParser for TextParser {
    async fn parse(&self, filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let text = String::from_utf8_lossy(data);
        let text = text.strip_prefix("%PDF-1.4\n").unwrap_or(&text);
        if text.contains("CORRUPT") {
            return Err(Error::parse(filename, "unreadable document"));
        }

        let segments: Vec<ParsedSegment> = text
            .split("\n\n")
            .enumerate()
            .map(|(i, page)| ParsedSegment::page(i as u32 + 1, page))
            .collect();
        let pages = segments.len() as u32;

        Ok(ParsedDocument::new(filename, segments, Some(pages), hash_content(data)))
    }

    fn name(&self) -> &str {
        "text"
    }
}

pub const DIMENSIONS: usize = 64;

/// Bag of lowercase words, FNV-hashed into `DIMENSIONS` buckets
pub fn keyword_vector(text: &str) -> Vec<f32> {
    let mut vector = vec![0.0f32; DIMENSIONS];
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let mut hash: u64 = 0xcbf29ce484222325;
        for byte in word.to_lowercase().bytes() {
            hash ^= byte as u64;
            hash = hash.wrapping_mul(0x100000001b3);
        }
        vector[(hash % DIMENSIONS as u64) as usize] += 1.0;
    }
    vector
}

#[derive(Default)]
pub struct KeywordEmbedder {
    pub query_calls: AtomicUsize,
    pub document_calls: AtomicUsize,
    pub fail: AtomicBool,
    /// Return 3-element document vectors while still claiming `DIMENSIONS`
    pub short_vectors: AtomicBool,
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.query_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::embedding("embedding service unavailable"));
        }
        Ok(keyword_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.document_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::embedding("embedding service unavailable"));
        }
        if self.short_vectors.load(Ordering::SeqCst) {
            return Ok(texts.iter().map(|_| vec![1.0, 0.0, 0.0]).collect());
        }
        Ok(texts.iter().map(|t| keyword_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        DIMENSIONS
    }

    fn model(&self) -> &str {
        "keyword-64"
    }

    fn name(&self) -> &str {
        "keyword"
    }
}

/// Answers with the context section of the prompt
#[derive(Default)]
pub struct ExtractiveLlm {
    pub prompts: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

impl ExtractiveLlm {
    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }
}

#[async_trait]
impl LlmProvider for ExtractiveLlm {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::llm("model overloaded"));
        }

        let context = prompt
            .split(CONTEXT_DELIMITER)
            .nth(1)
            .unwrap_or_default()
            .trim();
        Ok(context.to_string())
    }

    fn context_window(&self) -> usize {
        32_768
    }

    fn max_output_tokens(&self) -> usize {
        1024
    }

    fn model(&self) -> &str {
        "extractive"
    }

    fn name(&self) -> &str {
        "extractive"
    }
}

/// One shared set of fakes
#[derive(Clone, Default)]
pub struct Fakes {
    pub parser: Arc<TextParser>,
    pub embedder: Arc<KeywordEmbedder>,
    pub llm: Arc<ExtractiveLlm>,
}

impl Fakes {
    pub fn providers(&self) -> Providers {
        Providers {
            parser: self.parser.clone(),
            embedder: self.embedder.clone(),
            llm: self.llm.clone(),
        }
    }
}

/// Validates credentials like production, then hands out the fakes
pub struct FakeProviderFactory {
    pub fakes: Fakes,
    pub builds: AtomicUsize,
}

impl FakeProviderFactory {
    pub fn new(fakes: Fakes) -> Self {
        Self {
            fakes,
            builds: AtomicUsize::new(0),
        }
    }
}

impl ProviderFactory for FakeProviderFactory {
    fn build(&self, credentials: &Credentials) -> Result<Providers> {
        credentials.clone().validated()?;
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(self.fakes.providers())
    }
}

pub fn test_config() -> RagConfig {
    RagConfig::default()
}
