use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::credentials::Credential;
use crate::error::InvocationError;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Llm completes a single-turn prompt.
pub trait Llm {
    fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> impl Future<Output = Result<String, InvocationError>> + Send;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the Gemini `generateContent` endpoint.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    credential: Credential,
    base_url: String,
    allowed_models: Vec<String>,
}

impl GeminiClient {
    pub fn new(
        credential: Credential,
        allowed_models: Vec<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        if allowed_models.is_empty() {
            bail!("At least one model must be allowed");
        }

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http,
            credential,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            allowed_models,
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, model)
    }
}

impl Llm for GeminiClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: f32,
    ) -> Result<String, InvocationError> {
        if !self.allowed_models.iter().any(|allowed| allowed == model) {
            return Err(InvocationError::new(format!("Model not allowed: {model}")));
        }

        let body = build_request_body(prompt, temperature);

        debug!("Sending generateContent request");
        let response = self
            .http
            .post(self.endpoint(model))
            .header("x-goog-api-key", self.credential.key())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        debug!(%status, "Received generateContent response");

        if !status.is_success() {
            return Err(provider_error(status, &text));
        }

        extract_text(&text)
    }
}

fn build_request_body(prompt: &str, temperature: f32) -> GenerateContentRequest<'_> {
    GenerateContentRequest {
        contents: vec![Content {
            role: "user",
            parts: vec![Part { text: prompt }],
        }],
        generation_config: GenerationConfig { temperature },
    }
}

fn provider_error(status: reqwest::StatusCode, body: &str) -> InvocationError {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => InvocationError::new(format!("{status}: {}", envelope.error.message)),
        Err(_) if body.trim().is_empty() => InvocationError::new(status.to_string()),
        Err(_) => InvocationError::new(format!("{status}: {}", body.trim())),
    }
}

/// Concatenate the text parts of the first candidate, untouched.
fn extract_text(body: &str) -> Result<String, InvocationError> {
    let parsed: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| InvocationError::new(format!("Malformed response: {e}")))?;

    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect()
        })
        .unwrap_or_default();

    if text.is_empty() {
        return Err(InvocationError::new("The model returned an empty response"));
    }

    Ok(text)
}
