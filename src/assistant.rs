//! Generative-text helper that drafts a complaint description from keywords.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{error, warn};

use crate::error::ValidationError;
use crate::settings::AppConfig;

pub const USER_FACING_FAILURE: &str =
    "Failed to generate description. Please check your connection or try again later.";

#[derive(Debug, Error)]
pub enum AssistantError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("assistant not configured")]
    NotConfigured,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upstream returned {0}")]
    Upstream(u16),
    #[error("empty response")]
    EmptyResponse,
}

#[async_trait]
pub trait DescriptionAssistant: Send + Sync {
    /// One request, one response; no streaming, no retry.
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError>;
}

pub fn complaint_prompt(keywords: &str) -> String {
    format!(
        "You are a helpful assistant for a university student. Write a formal and detailed complaint \
         for the Computer Science department based on the student's keywords. Keep the tone respectful \
         but firm, clearly stating the problem and what the student has observed. Expand on the \
         following points: \"{keywords}\". Reply with the complaint description text only, without any \
         introductory phrase."
    )
}

/// Validate the keywords, wrap them in the instruction template and return
/// the trimmed draft.
pub async fn describe_complaint(assistant: &dyn DescriptionAssistant, keywords: &str) -> Result<String, AssistantError> {
    let keywords = keywords.trim();
    if keywords.is_empty() {
        return Err(ValidationError::EmptyKeywords.into());
    }
    let text = assistant.generate(&complaint_prompt(keywords)).await?;
    let text = text.trim();
    if text.is_empty() {
        return Err(AssistantError::EmptyResponse);
    }
    Ok(text.to_string())
}

// ---------------- No-op implementation (no API key) ----------------
pub struct NoopAssistant;

#[async_trait]
impl DescriptionAssistant for NoopAssistant {
    async fn generate(&self, _prompt: &str) -> Result<String, AssistantError> {
        Err(AssistantError::NotConfigured)
    }
}

// ---------------- Gemini generateContent ----------------
#[derive(Serialize)]
struct GenerateRequest<'a> {
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
struct GenerateResponse {
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
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

pub struct GeminiAssistant {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiAssistant {
    pub fn new(endpoint: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    fn url(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl DescriptionAssistant for GeminiAssistant {
    async fn generate(&self, prompt: &str) -> Result<String, AssistantError> {
        let body = GenerateRequest { contents: vec![Content { parts: vec![Part { text: prompt }] }] };
        let resp = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                error!("generateContent request failed: {e}");
                AssistantError::from(e)
            })?;
        if !resp.status().is_success() {
            warn!(status = resp.status().as_u16(), "generateContent returned an error status");
            return Err(AssistantError::Upstream(resp.status().as_u16()));
        }
        let parsed: GenerateResponse = resp.json().await?;
        let text: String = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();
        if text.trim().is_empty() {
            return Err(AssistantError::EmptyResponse);
        }
        Ok(text)
    }
}

/// Real assistant when an API key is configured, otherwise the no-op one.
pub fn from_config(cfg: &AppConfig) -> Arc<dyn DescriptionAssistant> {
    match &cfg.gemini_api_key {
        Some(key) => Arc::new(GeminiAssistant::new(&cfg.gemini_endpoint, &cfg.gemini_model, key)),
        None => Arc::new(NoopAssistant),
    }
}
