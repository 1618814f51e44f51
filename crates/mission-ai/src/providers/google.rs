//! Google Generative AI (Gemini) completion oracle with model fallback

use crate::{
    error::{Error, Result},
    oracle::CompletionOracle,
    stream::{CompletionEvent, CompletionEventStream, StopReason, collect},
    types::{Completion, CompletionRequest, Message, Usage},
};
use async_stream::stream;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

/// Default API base URL
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Models tried in order until one answers
pub const DEFAULT_MODELS: &[&str] = &["gemini-2.5-flash", "gemini-1.5-flash", "gemini-pro"];

/// Google Generative AI client
pub struct GoogleProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    models: Vec<String>,
}

impl GoogleProvider {
    /// Create a new Google provider with an API key and the default model list
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into().trim().to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            models: DEFAULT_MODELS.iter().map(|m| m.to_string()).collect(),
        }
    }

    /// Replace the fallback model list
    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    /// Point at a different API endpoint
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The fallback model list, in the order it is tried
    pub fn models(&self) -> &[String] {
        &self.models
    }

    /// Stream a response from one Gemini model
    pub async fn stream(
        &self,
        model: &str,
        request: &CompletionRequest,
    ) -> Result<CompletionEventStream> {
        if self.api_key.is_empty() {
            return Err(Error::InvalidApiKey);
        }

        let body = build_request(request);
        let model_path = model.strip_prefix("models/").unwrap_or(model);
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse&key={}",
            self.base_url, model_path, self.api_key
        );

        let request_builder = self
            .client
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(&body);

        let event_source = EventSource::new(request_builder)
            .map_err(|e| Error::Sse(format!("Failed to create event source: {}", e)))?;

        Ok(Box::pin(create_stream(event_source, model.to_string())))
    }
}

#[async_trait]
impl CompletionOracle for GoogleProvider {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion> {
        if self.models.is_empty() {
            return Err(Error::InvalidConfig("no models configured".to_string()));
        }

        let mut error_log = String::new();

        for model in &self.models {
            let attempt = match self.stream(model, request).await {
                Ok(s) => collect(s, model).await,
                Err(e) => Err(e),
            };

            match attempt {
                Ok(completion) => {
                    tracing::debug!("Completion served by {}", completion.model);
                    return Ok(completion);
                }
                Err(e) if stops_fallback(&e) => {
                    tracing::warn!("Model {} failed, not trying others: {}", model, e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::warn!("Model {} failed: {}", model, e);
                    error_log.push_str(&fallback_log_line(model, &e.to_string()));
                }
            }
        }

        Err(Error::AllModelsFailed(error_log))
    }
}

/// Errors no other model can fix: the key is bad, or the request is too
/// large for any of them.
fn stops_fallback(error: &Error) -> bool {
    matches!(error, Error::InvalidApiKey) || error.is_context_overflow()
}

/// One line of the fallback debug log: the model and the head of its error
fn fallback_log_line(model: &str, error: &str) -> String {
    let head: String = error.chars().take(50).collect();
    format!("[{}]: {}... \n", model, head)
}

fn build_request(request: &CompletionRequest) -> GeminiRequest {
    let contents = request
        .messages
        .iter()
        .filter_map(convert_message)
        .collect();

    let system_instruction = request
        .system_instruction
        .as_ref()
        .map(|prompt| GeminiContent {
            role: None,
            parts: vec![GeminiPart {
                text: prompt.clone(),
            }],
        });

    let generation_config =
        if request.max_output_tokens.is_some() || request.temperature.is_some() {
            Some(GeminiGenerationConfig {
                max_output_tokens: request.max_output_tokens,
                temperature: request.temperature,
            })
        } else {
            None
        };

    GeminiRequest {
        contents,
        system_instruction,
        generation_config,
    }
}

fn convert_message(msg: &Message) -> Option<GeminiContent> {
    // Gemini rejects parts with empty text
    if msg.content.is_empty() {
        return None;
    }
    Some(GeminiContent {
        role: Some(msg.role.as_str().to_string()),
        parts: vec![GeminiPart {
            text: msg.content.clone(),
        }],
    })
}

fn create_stream(
    mut event_source: EventSource,
    model: String,
) -> impl futures::Stream<Item = CompletionEvent> {
    stream! {
        let mut accumulated_text = String::new();
        let mut finish_reason: Option<String> = None;
        let mut usage = Usage::default();

        yield CompletionEvent::Start { model: model.clone() };

        while let Some(event) = event_source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(msg)) => {
                    if msg.data.is_empty() || msg.data == "[DONE]" {
                        continue;
                    }

                    match serde_json::from_str::<GeminiStreamResponse>(&msg.data) {
                        Ok(response) => {
                            for candidate in &response.candidates {
                                if let Some(ref content) = candidate.content {
                                    for part in &content.parts {
                                        if let Some(ref text) = part.text {
                                            accumulated_text.push_str(text);
                                            yield CompletionEvent::TextDelta { delta: text.clone() };
                                        }
                                    }
                                }
                                if let Some(ref reason) = candidate.finish_reason {
                                    finish_reason = Some(reason.clone());
                                }
                            }

                            if let Some(ref meta) = response.usage_metadata {
                                usage.input = meta.prompt_token_count.unwrap_or(0);
                                usage.output = meta.candidates_token_count.unwrap_or(0);
                            }
                        }
                        Err(e) => {
                            event_source.close();
                            if let Ok(error_response) = serde_json::from_str::<GeminiErrorResponse>(&msg.data) {
                                yield CompletionEvent::Error {
                                    message: error_response.error.message,
                                    status: error_response.error.code,
                                };
                                return;
                            }
                            yield CompletionEvent::Error {
                                message: format!("Failed to parse chunk: {}", e),
                                status: None,
                            };
                            return;
                        }
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    event_source.close();
                    let body = response.text().await.unwrap_or_default();
                    let message = serde_json::from_str::<GeminiErrorResponse>(&body)
                        .map(|r| r.error.message)
                        .unwrap_or(body);
                    yield CompletionEvent::Error {
                        message,
                        status: Some(status.as_u16()),
                    };
                    return;
                }
                Err(e) => {
                    event_source.close();
                    yield CompletionEvent::Error {
                        message: format!("SSE error: {}", e),
                        status: None,
                    };
                    return;
                }
            }
        }

        event_source.close();

        let stop_reason = match finish_reason.as_deref() {
            Some("MAX_TOKENS") => StopReason::Length,
            Some("SAFETY") | Some("RECITATION") | Some("BLOCKLIST") => StopReason::Filtered,
            _ => StopReason::Stop,
        };

        yield CompletionEvent::Done {
            text: accumulated_text,
            stop_reason,
            usage,
        };
    }
}

// Request types

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GeminiGenerationConfig>,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

// Response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiStreamResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsageMetadata>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsageMetadata {
    prompt_token_count: Option<u32>,
    candidates_token_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorResponse {
    error: GeminiError,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    #[serde(default)]
    code: Option<u16>,
    message: String,
}
