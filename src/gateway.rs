//! Client for the Gemini-style `generateContent` endpoint.
//!
//! One prompt in, one text out. No retries: a failure is surfaced to the
//! caller immediately and the orchestrator decides which phase it sinks.

use serde::{Deserialize, Serialize};

use crate::error::LabError;

/// Fixed sampling temperature for every generation call.
pub const GENERATION_TEMPERATURE: f32 = 0.7;
/// Fixed output-length cap. Generous: a full HTML document fits well inside.
pub const MAX_OUTPUT_TOKENS: u32 = 50_000;
/// Default generateContent endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-preview-05-20:generateContent";

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    pub max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateRequest {
    pub fn for_prompt(prompt: &str) -> Self {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: GENERATION_TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        }
    }
}

/// Pull the first text part of the first candidate out of a response
/// envelope. `None` means the envelope is missing the required shape.
pub fn first_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
}

// ---------------------------------------------------------------------------
// TextGenerator trait + Gemini client
// ---------------------------------------------------------------------------

/// Seam between the pipeline and the network. The pipeline is generic over
/// this so tests can substitute a canned generator.
#[allow(async_fn_in_trait)]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LabError>;
}

impl<T: TextGenerator> TextGenerator for std::sync::Arc<T> {
    async fn generate(&self, prompt: &str) -> Result<String, LabError> {
        (**self).generate(prompt).await
    }
}

pub struct GeminiClient {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
}

impl GeminiClient {
    pub fn new(api_key: &str, endpoint: &str) -> Self {
        GeminiClient {
            client: reqwest::Client::new(),
            api_key: api_key.to_string(),
            endpoint: endpoint.to_string(),
        }
    }
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &str) -> Result<String, LabError> {
        let request = GenerateRequest::for_prompt(prompt);

        let response = self
            .client
            .post(format!("{}?key={}", self.endpoint, self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LabError::Transport {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LabError::MalformedResponse(format!("invalid JSON envelope: {e}")))?;

        first_text(envelope).ok_or_else(|| {
            LabError::MalformedResponse(
                "missing candidates[0].content.parts[0].text".to_string(),
            )
        })
    }
}
