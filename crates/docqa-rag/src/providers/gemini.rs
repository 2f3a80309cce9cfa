//! Gemini client for embeddings and answer generation
//!
//! Talks to the Generative Language REST API with the session's API key.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::embedding::EmbeddingProvider;
use super::llm::LlmProvider;
use super::retry::RetryPolicy;
use crate::config::{EmbeddingConfig, LlmConfig};
use crate::error::{Error, Result};

const SERVICE: &str = "gemini";

/// Gemini client, one per session key
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    llm_model: String,
    embed_model: String,
    dimensions: usize,
    batch_size: usize,
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
    context_window: usize,
    retry: RetryPolicy,
}

impl GeminiClient {
    /// Create a new Gemini client
    ///
    /// # Arguments
    /// * `api_key` - Gemini API key (must not be blank)
    /// * `llm` - generation settings
    /// * `embeddings` - embedding model settings
    /// * `retry` - policy applied to every request
    pub fn new(
        api_key: impl Into<String>,
        llm: &LlmConfig,
        embeddings: &EmbeddingConfig,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::MissingCredentials(
                "Gemini API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(llm.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: llm.base_url.trim_end_matches('/').to_string(),
            llm_model: qualified_model(&llm.model),
            embed_model: qualified_model(&embeddings.model),
            dimensions: embeddings.dimensions,
            batch_size: embeddings.batch_size.max(1),
            temperature: llm.temperature,
            top_p: llm.top_p,
            max_output_tokens: llm.max_output_tokens,
            context_window: llm.context_window,
            retry,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!("{}/{}:{}", self.base_url, model, method)
    }

    async fn post<B, R>(&self, what: &str, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + Sync,
        R: for<'de> Deserialize<'de>,
    {
        self.retry
            .run(what, || async move {
                let response = self
                    .client
                    .post(url)
                    .header("x-goog-api-key", &self.api_key)
                    .json(body)
                    .send()
                    .await?;
                Ok::<_, Error>(check_status(response).await?.json().await?)
            })
            .await
    }

    fn embed_request(&self, text: &str, task_type: &'static str) -> EmbedContentRequest {
        EmbedContentRequest {
            model: self.embed_model.clone(),
            content: Content::user(text),
            task_type,
        }
    }

    fn check_vector(&self, values: Vec<f32>) -> Result<Vec<f32>> {
        if values.is_empty() {
            return Err(Error::embedding("Gemini returned an empty embedding"));
        }
        if values.len() != self.dimensions {
            return Err(Error::EmbeddingMismatch(format!(
                "{} returned {} dimensions, expected {}",
                self.embed_model,
                values.len(),
                self.dimensions
            )));
        }
        Ok(values)
    }
}

/// Model names are addressed as `models/<name>`
fn qualified_model(model: &str) -> String {
    if model.starts_with("models/") || model.starts_with("tunedModels/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(Error::Upstream {
        service: SERVICE,
        status: status.as_u16(),
        body,
    })
}

#[derive(Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

impl Content {
    fn user(text: &str) -> Self {
        Self {
            role: None,
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize)]
struct Part {
    text: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest {
    model: String,
    content: Content,
    task_type: &'static str,
}

#[derive(Serialize)]
struct BatchEmbedRequest {
    requests: Vec<EmbedContentRequest>,
}

#[derive(Deserialize)]
struct EmbeddingValues {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Deserialize)]
struct EmbedContentResponse {
    embedding: EmbeddingValues,
}

#[derive(Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<EmbeddingValues>,
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
    top_p: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Concatenate the text parts of the first candidate
fn extract_text(response: GenerateResponse) -> Result<String> {
    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(Error::llm(format!("prompt blocked by Gemini: {}", reason)));
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| Error::llm("No candidates in Gemini response"))?;

    let text: String = candidate
        .content
        .map(|c| c.parts.into_iter().map(|p| p.text).collect())
        .unwrap_or_default();

    if text.is_empty() {
        return Err(Error::llm(format!(
            "No text in Gemini response (finish reason: {})",
            candidate.finish_reason.as_deref().unwrap_or("unknown")
        )));
    }
    Ok(text)
}

#[async_trait]
impl EmbeddingProvider for GeminiClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = self.endpoint(&self.embed_model, "embedContent");
        let request = self.embed_request(text, "RETRIEVAL_QUERY");

        let response: EmbedContentResponse = self.post("Gemini embedContent", &url, &request).await?;
        self.check_vector(response.embedding.values)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let url = self.endpoint(&self.embed_model, "batchEmbedContents");
        let mut embeddings = Vec::with_capacity(texts.len());

        for batch in texts.chunks(self.batch_size) {
            let request = BatchEmbedRequest {
                requests: batch
                    .iter()
                    .map(|t| self.embed_request(t, "RETRIEVAL_DOCUMENT"))
                    .collect(),
            };

            let response: BatchEmbedResponse = self
                .post("Gemini batchEmbedContents", &url, &request)
                .await?;

            if response.embeddings.len() != batch.len() {
                return Err(Error::embedding(format!(
                    "Gemini returned {} embeddings for {} texts",
                    response.embeddings.len(),
                    batch.len()
                )));
            }

            for values in response.embeddings {
                embeddings.push(self.check_vector(values.values)?);
            }
            tracing::debug!("Embedded {}/{} chunks", embeddings.len(), texts.len());
        }

        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.embed_model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

#[async_trait]
impl LlmProvider for GeminiClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let url = self.endpoint(&self.llm_model, "generateContent");
        let request = GenerateRequest {
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
                top_p: self.top_p,
            },
        };

        let response: GenerateResponse = self.post("Gemini generateContent", &url, &request).await?;
        extract_text(response)
    }

    fn context_window(&self) -> usize {
        self.context_window
    }

    fn max_output_tokens(&self) -> usize {
        self.max_output_tokens as usize
    }

    fn model(&self) -> &str {
        &self.llm_model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}
