//! Client for the hosted text-generation API. The `TextGenerator` trait is
//! the seam handlers depend on, so tests run without network access.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("generation API returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("generation API response missing completion text")]
    MalformedResponse,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError>;
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: String,
    pub model: String,
    pub timeout: Duration,
    /// Total send attempts per call. Defaults to 1: every upstream call is
    /// made exactly once unless explicitly configured otherwise.
    pub attempts: u32,
}

impl GenerationConfig {
    pub fn from_env() -> Self {
        GenerationConfig {
            api_key: std::env::var("GOOGLE_API_KEY").unwrap_or_default(),
            model: std::env::var("GENERATION_MODEL")
                .unwrap_or_else(|_| "gemini-2.0-flash".to_string()),
            timeout: Duration::from_secs(
                std::env::var("GENERATION_TIMEOUT_SECS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(30),
            ),
            attempts: std::env::var("GENERATION_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(1),
        }
    }
}

pub struct GoogleAiClient {
    http: reqwest::Client,
    config: GenerationConfig,
}

impl GoogleAiClient {
    pub fn new(config: GenerationConfig) -> Result<Self, GenerateError> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { http, config })
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, GenerateError> {
        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.config.model
        );

        let response = self
            .http
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&GenerateContentRequest {
                contents: vec![Content {
                    parts: vec![Part { text: prompt }],
                }],
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(GenerateError::Status(response.status()));
        }

        let body: GenerateContentResponse = response.json().await?;
        extract_text(body).ok_or(GenerateError::MalformedResponse)
    }
}

#[async_trait]
impl TextGenerator for GoogleAiClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerateError> {
        let attempts = self.config.attempts.max(1);
        for attempt in 1..attempts {
            match self.generate_once(prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => warn!("generation attempt {}/{} failed: {}", attempt, attempts, e),
            }
        }
        self.generate_once(prompt).await
    }
}

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

fn extract_text(response: GenerateContentResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .next()?
        .text
}
