//! LlamaParse cloud parsing client
//!
//! Upload the file, poll the job until it settles, then fetch the JSON result
//! and map each page to a segment.

use async_trait::async_trait;
use reqwest::{multipart, Client, Response};
use serde::Deserialize;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use super::parser::{check_supported, finish, parse_plain_text, DocumentParser};
use crate::config::{ParseResultType, ParserConfig};
use crate::error::{Error, Result};
use crate::providers::RetryPolicy;
use crate::types::{hash_content, FileType, ParsedDocument, ParsedSegment};

const SERVICE: &str = "llamaparse";

#[derive(Debug, Deserialize)]
struct JobStatus {
    id: String,
    #[serde(default)]
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JobResult {
    #[serde(default)]
    pages: Vec<ResultPage>,
}

#[derive(Debug, Deserialize)]
struct ResultPage {
    page: Option<u32>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    md: Option<String>,
}

/// Cloud parser authenticated with the session's LlamaCloud key
pub struct LlamaParseClient {
    client: Client,
    api_key: String,
    base_url: String,
    result_type: ParseResultType,
    poll_interval: Duration,
    max_wait: Duration,
    retry: RetryPolicy,
}

impl LlamaParseClient {
    pub fn new(api_key: impl Into<String>, config: &ParserConfig, retry: RetryPolicy) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(Error::MissingCredentials(
                "LlamaCloud API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            result_type: config.result_type,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_wait: Duration::from_secs(config.max_wait_secs),
            retry,
        })
    }

    async fn upload(&self, filename: &str, data: &[u8]) -> Result<String> {
        let mime = mime_guess::from_path(filename)
            .first_or_octet_stream()
            .to_string();
        let mime = mime.as_str();

        let job: JobStatus = self
            .retry
            .run("LlamaParse upload", || async move {
                let part = multipart::Part::bytes(data.to_vec())
                    .file_name(filename.to_string())
                    .mime_str(mime)?;
                let form = multipart::Form::new().part("file", part);

                let response = self
                    .client
                    .post(format!("{}/upload", self.base_url))
                    .bearer_auth(&self.api_key)
                    .multipart(form)
                    .send()
                    .await?;
                Ok::<_, Error>(check_status(response).await?.json().await?)
            })
            .await?;

        Ok(job.id)
    }

    async fn job_status(&self, job_id: &str) -> Result<JobStatus> {
        self.retry
            .run("LlamaParse status", || async move {
                let response = self
                    .client
                    .get(format!("{}/job/{}", self.base_url, job_id))
                    .bearer_auth(&self.api_key)
                    .send()
                    .await?;
                Ok::<_, Error>(check_status(response).await?.json().await?)
            })
            .await
    }

    async fn wait_for_job(&self, filename: &str, job_id: &str) -> Result<()> {
        let deadline = Instant::now() + self.max_wait;

        loop {
            let job = self.job_status(job_id).await?;
            match job.status.as_str() {
                "SUCCESS" => return Ok(()),
                "ERROR" | "CANCELED" => {
                    return Err(Error::parse(
                        filename,
                        job.error_message
                            .unwrap_or_else(|| format!("parsing job {} failed", job_id)),
                    ))
                }
                status => {
                    tracing::debug!("LlamaParse job {} is {}", job_id, status);
                }
            }

            if Instant::now() >= deadline {
                return Err(Error::parse(
                    filename,
                    format!(
                        "parsing job {} did not finish within {:?}",
                        job_id, self.max_wait
                    ),
                ));
            }
            sleep(self.poll_interval).await;
        }
    }

    async fn fetch_result(&self, job_id: &str) -> Result<JobResult> {
        self.retry
            .run("LlamaParse result", || async move {
                let response = self
                    .client
                    .get(format!("{}/job/{}/result/json", self.base_url, job_id))
                    .bearer_auth(&self.api_key)
                    .send()
                    .await?;
                Ok::<_, Error>(check_status(response).await?.json().await?)
            })
            .await
    }
}

#[async_trait]
impl DocumentParser for LlamaParseClient {
    async fn parse(&self, filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        if check_supported(filename)? != FileType::Pdf {
            return parse_plain_text(filename, data);
        }

        let job_id = self.upload(filename, data).await?;
        tracing::info!("Uploaded {} to LlamaParse (job {})", filename, job_id);

        self.wait_for_job(filename, &job_id).await?;
        let result = self.fetch_result(&job_id).await?;

        let total_pages = result.pages.len() as u32;
        let segments = pages_to_segments(result.pages, self.result_type);
        let parsed = finish(filename, segments, Some(total_pages), hash_content(data))?;

        tracing::info!(
            "Parsed {}: {} pages, {} non-empty segments",
            filename,
            total_pages,
            parsed.segments.len()
        );
        Ok(parsed)
    }

    fn name(&self) -> &str {
        "llamaparse"
    }
}

/// Turn non-success responses into an upstream error carrying the body
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

fn pages_to_segments(pages: Vec<ResultPage>, result_type: ParseResultType) -> Vec<ParsedSegment> {
    pages
        .into_iter()
        .enumerate()
        .map(|(i, page)| {
            let text = match result_type {
                ParseResultType::Markdown => page.md.or(page.text),
                ParseResultType::Text => page.text.or(page.md),
            }
            .unwrap_or_default();
            let number = page.page.unwrap_or(i as u32 + 1);
            ParsedSegment::page(number, text)
        })
        .collect()
}
