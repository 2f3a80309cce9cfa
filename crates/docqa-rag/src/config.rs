//! Configuration for the document Q&A system

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Main system configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Document parser configuration
    pub parser: ParserConfig,
    /// Gemini/LLM configuration
    pub llm: LlmConfig,
    /// Embedding configuration
    pub embeddings: EmbeddingConfig,
    /// Chunking configuration
    pub chunking: ChunkingConfig,
    /// Retrieval and synthesis configuration
    pub retrieval: RetrievalConfig,
    /// Vector database configuration
    pub vector_db: VectorDbConfig,
    /// Collection naming and re-index policy
    pub collections: CollectionConfig,
    /// Retry policy for external calls
    pub retry: RetryConfig,
    /// Session lifecycle configuration
    pub sessions: SessionConfig,
    /// Chat configuration
    pub chat: ChatConfig,
}

impl RagConfig {
    /// Load configuration from an optional TOML file, then apply
    /// `DOCQA_*` environment overrides and validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)?;
                toml::from_str::<RagConfig>(&raw).map_err(|e| {
                    Error::Config(format!("Invalid config file {}: {}", path.display(), e))
                })?
            }
            None => RagConfig::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment in production)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("DOCQA_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("DOCQA_PORT") {
            self.server.port = port
                .parse()
                .map_err(|_| Error::Config(format!("DOCQA_PORT is not a port: {}", port)))?;
        }
        if let Some(dir) = lookup("DOCQA_STORAGE_DIR") {
            self.vector_db.storage_dir = PathBuf::from(dir);
        }
        if let Some(top_k) = lookup("DOCQA_TOP_K") {
            self.retrieval.top_k = top_k
                .parse()
                .map_err(|_| Error::Config(format!("DOCQA_TOP_K is not a number: {}", top_k)))?;
        }
        Ok(())
    }

    /// Check cross-field invariants
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(Error::Config("chunking.chunk_size must be > 0".to_string()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(Error::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.retrieval.top_k == 0 {
            return Err(Error::Config("retrieval.top_k must be > 0".to_string()));
        }
        if self.embeddings.dimensions == 0 {
            return Err(Error::Config("embeddings.dimensions must be > 0".to_string()));
        }
        if self.embeddings.batch_size == 0 {
            return Err(Error::Config("embeddings.batch_size must be > 0".to_string()));
        }
        if self.llm.max_output_tokens as usize >= self.llm.context_window {
            return Err(Error::Config(
                "llm.max_output_tokens must leave room in llm.context_window".to_string(),
            ));
        }
        if let CollectionNaming::Fixed = self.collections.naming {
            if self.collections.fixed_name.trim().is_empty() {
                return Err(Error::Config(
                    "collections.fixed_name is required for fixed naming".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host address
    pub host: String,
    /// Port number
    pub port: u16,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum upload size in bytes (default: 100MB)
    pub max_upload_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            enable_cors: true,
            max_upload_size: 100 * 1024 * 1024, // 100MB
        }
    }
}

/// Which parser turns uploads into segments
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParserBackend {
    /// LlamaParse cloud service
    #[default]
    LlamaParse,
    /// Local PDF text extraction (no credentials needed for parsing)
    Local,
}

/// Shape of the text returned by the cloud parser
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ParseResultType {
    #[default]
    Markdown,
    Text,
}

/// Document parser configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Parser backend
    pub backend: ParserBackend,
    /// LlamaParse API base URL
    pub base_url: String,
    /// Result format requested from the parser
    pub result_type: ParseResultType,
    /// Delay between job status polls
    pub poll_interval_ms: u64,
    /// Give up on a parse job after this long
    pub max_wait_secs: u64,
    /// Per-request timeout
    pub timeout_secs: u64,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            backend: ParserBackend::LlamaParse,
            base_url: "https://api.cloud.llamaindex.ai/api/parsing".to_string(),
            result_type: ParseResultType::Markdown,
            poll_interval_ms: 1000,
            max_wait_secs: 300,
            timeout_secs: 120,
        }
    }
}

/// LLM (Gemini) configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Generative Language API base URL
    pub base_url: String,
    /// Generation model name
    pub model: String,
    /// Temperature for generation
    pub temperature: f32,
    /// Nucleus sampling
    pub top_p: f32,
    /// Maximum tokens in a generated answer
    pub max_output_tokens: u32,
    /// Model input budget (tokens)
    pub context_window: usize,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "models/gemini-1.5-flash".to_string(),
            temperature: 0.3,
            top_p: 0.85,
            max_output_tokens: 4096,
            context_window: 32_768,
            timeout_secs: 120,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    /// Embedding model name
    pub model: String,
    /// Embedding dimensions
    pub dimensions: usize,
    /// Texts per batch embedding request
    pub batch_size: usize,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: "models/embedding-001".to_string(),
            dimensions: 768,
            batch_size: 100,
        }
    }
}

/// Text chunking configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    /// Maximum chunk length in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            chunk_overlap: 200,
        }
    }
}

/// How retrieved chunks are turned into an answer
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Pack as many chunks per LLM call as fit, refine across packs
    #[default]
    Compact,
    /// One LLM call per chunk, refining the running answer
    Refine,
}

/// Retrieval configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of nearest chunks to retrieve
    pub top_k: usize,
    /// Response synthesis mode
    pub response_mode: ResponseMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            response_mode: ResponseMode::Compact,
        }
    }
}

/// Vector database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorDbConfig {
    /// Directory holding the collection database
    pub storage_dir: PathBuf,
}

impl VectorDbConfig {
    /// Path of the SQLite file holding all collections
    pub fn database_path(&self) -> PathBuf {
        self.storage_dir.join("collections.db")
    }
}

impl Default for VectorDbConfig {
    fn default() -> Self {
        Self {
            storage_dir: PathBuf::from("./vector_db"),
        }
    }
}

/// How a collection name is chosen for an upload
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CollectionNaming {
    /// `collection_<filename>`
    #[default]
    PerFile,
    /// Every document goes into `fixed_name`
    Fixed,
}

/// What happens when a document is indexed into a collection that already has it
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ReindexPolicy {
    /// Keep old chunks and add new ones
    Append,
    /// Drop chunks previously indexed under the same filename
    Replace,
    /// Skip identical content; otherwise behave like `Replace`
    #[default]
    Dedupe,
}

/// Collection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    /// Naming policy
    pub naming: CollectionNaming,
    /// Prefix for per-file names
    pub prefix: String,
    /// Collection used by fixed naming
    pub fixed_name: String,
    /// Re-index policy
    pub reindex: ReindexPolicy,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            naming: CollectionNaming::PerFile,
            prefix: "collection_".to_string(),
            fixed_name: "documents".to_string(),
            reindex: ReindexPolicy::Dedupe,
        }
    }
}

/// Retry policy for external calls
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// First backoff delay
    pub initial_backoff_ms: u64,
    /// Backoff ceiling
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }
}

/// Session lifecycle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sessions idle longer than this are dropped
    pub idle_ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { idle_ttl_secs: 3600 }
    }
}

/// Chat configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Prior question/answer turns forwarded with a follow-up (0 = none)
    pub history_turns: usize,
}
