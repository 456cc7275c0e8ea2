// inference/gemini.rs — Google Gemini streaming adapter

use super::sse::event_stream;
use super::types::{FragmentStream, LLMError};
use super::InferenceTransport;
use crate::request::{GenerationRequest, PayloadPart};
use async_trait::async_trait;
use futures::{future, StreamExt, TryStreamExt};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const CONNECT_TIMEOUT_SECS: u64 = 20;
const REASONING_PARAMETER: &str = "thinkingConfig";

const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Part<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thinking_config: Option<ThinkingConfig>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ThinkingConfig {
    thinking_budget: u32,
}

#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
    error: Option<ApiErrorBody>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
    #[serde(default)]
    status: String,
}

pub struct GeminiAdapter {
    client: Client,
    api_key: String,
    endpoint: String,
}

impl GeminiAdapter {
    pub fn new(api_key: String, endpoint: Option<&str>) -> Self {
        // No overall timeout; the orchestrator owns the deadline for the whole stream.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .unwrap_or_default();

        let endpoint = endpoint
            .map(|e| e.trim().trim_end_matches('/'))
            .filter(|e| !e.is_empty())
            .unwrap_or(DEFAULT_ENDPOINT)
            .to_string();

        tracing::info!("Gemini adapter initialized (endpoint={})", endpoint);

        Self {
            client,
            api_key,
            endpoint,
        }
    }

    fn stream_url(&self, model: &str) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.endpoint, model
        )
    }
}

#[async_trait]
impl InferenceTransport for GeminiAdapter {
    async fn open_stream(&self, request: &GenerationRequest) -> Result<FragmentStream, LLMError> {
        let body = request_body(request);

        tracing::info!(
            model = %request.model,
            images = request.images.len(),
            reasoning_budget = ?request.reasoning_budget,
            "Gemini: opening stream"
        );

        let response = self
            .client
            .post(self.stream_url(&request.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LLMError::Timeout
                } else {
                    LLMError::NetworkError(format!("Gemini: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_http_error(status.as_u16(), &body));
        }

        let fragments = event_stream(response.bytes_stream())
            .and_then(|data| future::ready(parse_chunk(&data)))
            .try_filter_map(|text| future::ready(Ok(text)))
            .boxed();

        Ok(fragments)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn request_body(request: &GenerationRequest) -> GeminiRequest<'_> {
    let parts = request
        .payload()
        .into_iter()
        .map(|part| match part {
            PayloadPart::Image(image) => Part {
                inline_data: Some(InlineData {
                    mime_type: &image.mime_type,
                    data: image.base64_data(),
                }),
                text: None,
            },
            PayloadPart::Text(text) => Part {
                inline_data: None,
                text: Some(text),
            },
        })
        .collect();

    let system_instruction = request.system_instruction.as_deref().map(|text| Content {
        role: None,
        parts: vec![Part {
            inline_data: None,
            text: Some(text),
        }],
    });

    GeminiRequest {
        contents: vec![Content {
            role: Some("user"),
            parts,
        }],
        system_instruction,
        generation_config: GenerationConfig {
            temperature: request.temperature,
            top_p: request.top_p,
            thinking_config: request
                .reasoning_budget
                .map(|thinking_budget| ThinkingConfig { thinking_budget }),
        },
    }
}

/// Visible text of one streamed chunk; `None` when the chunk carries no text
fn parse_chunk(data: &str) -> Result<Option<String>, LLMError> {
    let chunk: StreamChunk = serde_json::from_str(data)
        .map_err(|e| LLMError::InvalidResponse(format!("Gemini parse: {}", e)))?;

    if let Some(error) = chunk.error {
        return Err(map_api_error(error.code, &error.status, &error.message));
    }

    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LLMError::Blocked(reason));
    }

    let Some(candidate) = chunk.candidates.into_iter().next() else {
        return Ok(None);
    };

    let text: String = candidate
        .content
        .map(|c| c.parts)
        .unwrap_or_default()
        .into_iter()
        .filter(|p| !p.thought)
        .filter_map(|p| p.text)
        .collect();

    if text.is_empty() {
        if let Some(reason) = candidate.finish_reason {
            if BLOCKING_FINISH_REASONS.contains(&reason.as_str()) {
                return Err(LLMError::Blocked(reason));
            }
        }
        return Ok(None);
    }

    Ok(Some(text))
}

fn map_http_error(status: u16, body: &str) -> LLMError {
    match serde_json::from_str::<ApiErrorEnvelope>(body) {
        Ok(envelope) => {
            let code = if envelope.error.code == 0 { status } else { envelope.error.code };
            map_api_error(code, &envelope.error.status, &envelope.error.message)
        }
        Err(_) => map_api_error(status, "", body.trim()),
    }
}

fn map_api_error(code: u16, status: &str, message: &str) -> LLMError {
    let message = if message.is_empty() {
        format!("HTTP {}", code)
    } else {
        message.to_string()
    };

    if code == 429 || status == "RESOURCE_EXHAUSTED" {
        return LLMError::RateLimited(message);
    }
    if code == 401 || code == 403 || status == "UNAUTHENTICATED" || status == "PERMISSION_DENIED" {
        return LLMError::AuthenticationError { status: code, message };
    }
    if code == 400 && rejects_reasoning_parameter(&message) {
        return LLMError::UnsupportedParameter {
            parameter: REASONING_PARAMETER.to_string(),
            message,
        };
    }
    LLMError::HttpError {
        status: code,
        message,
    }
}

/// Heuristic for "the service does not accept a thinking budget here"
fn rejects_reasoning_parameter(message: &str) -> bool {
    let lower = message.to_lowercase();
    let mentions_reasoning = lower.contains("thinking");
    let rejection = [
        "not supported",
        "unsupported",
        "unknown name",
        "cannot find field",
        "invalid json payload",
        "is invalid",
        "not enabled",
        "is not available",
    ]
    .iter()
    .any(|marker| lower.contains(marker));

    mentions_reasoning && rejection
}
