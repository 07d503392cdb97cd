//! Gemini `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::config::AdvisorConfig;
use super::{AdviceBackend, AdvisorError};

pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl GeminiClient {
    pub fn new(config: AdvisorConfig) -> Result<Self, AdvisorError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeouts.request_secs))
            .connect_timeout(Duration::from_secs(config.timeouts.connect_secs))
            .build()
            .map_err(|e| AdvisorError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, api_key: config.api_key, model: config.model, base_url: config.base_url })
    }

    pub fn model(&self) -> &str { &self.model }

    async fn send_json(&self, body: &impl Serialize) -> Result<String, AdvisorError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| AdvisorError::ApiRequest(e.to_string()))?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| AdvisorError::ApiRequest(e.to_string()))?;
        if !(200..300).contains(&status) {
            return Err(AdvisorError::ApiResponse { status, body: text });
        }
        Ok(text)
    }
}

#[async_trait]
impl AdviceBackend for GeminiClient {
    async fn generate(&self, system: &str, prompt: &str, temperature: f32) -> Result<String, AdvisorError> {
        let body = build_request(system, prompt, temperature);
        let text = self.send_json(&body).await?;
        parse_response(&text)
    }
}

// =============================================================================
// WIRE TYPES
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
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

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn build_request<'a>(system: &'a str, prompt: &'a str, temperature: f32) -> GenerateRequest<'a> {
    let system_instruction = (!system.trim().is_empty()).then(|| Content { role: None, parts: vec![Part { text: system }] });
    GenerateRequest {
        system_instruction,
        contents: vec![Content { role: Some("user"), parts: vec![Part { text: prompt }] }],
        generation_config: GenerationConfig { temperature },
    }
}

/// Joins the text parts of the first candidate.
fn parse_response(body: &str) -> Result<String, AdvisorError> {
    let parsed: GenerateResponse = serde_json::from_str(body).map_err(|e| AdvisorError::ApiParse(e.to_string()))?;
    if let Some(reason) = parsed.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(AdvisorError::Blocked(reason));
    }
    let text: String = parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(AdvisorError::EmptyResponse);
    }
    Ok(text)
}
