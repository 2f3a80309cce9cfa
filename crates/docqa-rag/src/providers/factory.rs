//! Builds a session's providers from its credentials

use std::sync::Arc;

use super::embedding::EmbeddingProvider;
use super::gemini::GeminiClient;
use super::llm::LlmProvider;
use super::retry::RetryPolicy;
use crate::config::{ParserBackend, RagConfig};
use crate::error::Result;
use crate::ingestion::{DocumentParser, LlamaParseClient};
use crate::types::Credentials;

/// Everything a session needs to talk to the outside world
#[derive(Clone)]
pub struct Providers {
    pub parser: Arc<dyn DocumentParser>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub llm: Arc<dyn LlmProvider>,
}

/// Creates providers for a set of credentials
///
/// Production uses `CloudProviderFactory`; tests swap in offline fakes.
pub trait ProviderFactory: Send + Sync {
    fn build(&self, credentials: &Credentials) -> Result<Providers>;
}

/// LlamaParse (or the local parser) plus Gemini
pub struct CloudProviderFactory {
    config: Arc<RagConfig>,
}

impl CloudProviderFactory {
    pub fn new(config: Arc<RagConfig>) -> Self {
        Self { config }
    }

    fn parser(&self, credentials: &Credentials, retry: RetryPolicy) -> Result<Arc<dyn DocumentParser>> {
        match self.config.parser.backend {
            ParserBackend::LlamaParse => Ok(Arc::new(LlamaParseClient::new(
                credentials.llama_cloud_api_key.clone(),
                &self.config.parser,
                retry,
            )?)),
            #[cfg(feature = "local-parser")]
            ParserBackend::Local => Ok(Arc::new(crate::ingestion::LocalPdfParser::new())),
            #[cfg(not(feature = "local-parser"))]
            ParserBackend::Local => Err(crate::error::Error::Config(
                "parser.backend = \"local\" requires the local-parser feature".to_string(),
            )),
        }
    }
}

impl ProviderFactory for CloudProviderFactory {
    fn build(&self, credentials: &Credentials) -> Result<Providers> {
        let credentials = credentials.clone().validated()?;
        let retry = RetryPolicy::from_config(&self.config.retry);

        let gemini = Arc::new(GeminiClient::new(
            credentials.gemini_api_key.clone(),
            &self.config.llm,
            &self.config.embeddings,
            retry.clone(),
        )?);

        let parser = self.parser(&credentials, retry)?;
        tracing::debug!(
            "Built providers: parser={}, llm={}, embeddings={}",
            parser.name(),
            LlmProvider::model(gemini.as_ref()),
            EmbeddingProvider::model(gemini.as_ref())
        );

        Ok(Providers {
            parser,
            embedder: gemini.clone(),
            llm: gemini,
        })
    }
}
