//! Streaming event types and utilities

use crate::error::{Error, Result};
use crate::types::{Completion, Usage};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tokio_stream::Stream;

/// Reason why generation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Natural end of response
    Stop,
    /// Maximum tokens reached
    Length,
    /// Blocked by the provider's safety or recitation filters
    Filtered,
}

/// Events emitted while a completion streams in
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CompletionEvent {
    /// Request accepted by the given model
    Start { model: String },
    /// Text content delta
    TextDelta { delta: String },
    /// Completion finished
    Done {
        text: String,
        stop_reason: StopReason,
        usage: Usage,
    },
    /// Error occurred, with the HTTP status or payload error code if known
    Error {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status: Option<u16>,
    },
}

impl CompletionEvent {
    /// Check if this is a terminal event (Done or Error)
    pub fn is_terminal(&self) -> bool {
        matches!(self, CompletionEvent::Done { .. } | CompletionEvent::Error { .. })
    }
}

/// A stream of completion events
pub type CompletionEventStream = Pin<Box<dyn Stream<Item = CompletionEvent> + Send>>;

/// Drain a completion stream into a single [`Completion`].
///
/// Deltas are accumulated in case the stream ends without a `Done` event.
/// An `Error` event or an empty reply is returned as an error.
pub async fn collect(mut stream: CompletionEventStream, model: &str) -> Result<Completion> {
    let mut text = String::new();
    let mut usage = Usage::default();
    let mut model = model.to_string();

    while let Some(event) = stream.next().await {
        match event {
            CompletionEvent::Start { model: m } => model = m,
            CompletionEvent::TextDelta { delta } => text.push_str(&delta),
            CompletionEvent::Done {
                text: final_text,
                usage: final_usage,
                stop_reason,
            } => {
                if stop_reason == StopReason::Length {
                    tracing::debug!("Completion from {} hit the output token limit", model);
                }
                text = final_text;
                usage = final_usage;
                break;
            }
            CompletionEvent::Error { message, status } => {
                return Err(Error::from_stream(status, message));
            }
        }
    }

    if text.trim().is_empty() {
        return Err(Error::EmptyResponse);
    }

    Ok(Completion { text, model, usage })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stream_of(events: Vec<CompletionEvent>) -> CompletionEventStream {
        Box::pin(tokio_stream::iter(events))
    }

    #[tokio::test]
    async fn test_collect_done() {
        let stream = stream_of(vec![
            CompletionEvent::Start {
                model: "gemini-2.5-flash".into(),
            },
            CompletionEvent::TextDelta { delta: "Sys".into() },
            CompletionEvent::TextDelta { delta: "tems go".into() },
            CompletionEvent::Done {
                text: "Systems go".into(),
                stop_reason: StopReason::Stop,
                usage: Usage { input: 10, output: 2 },
            },
        ]);
        let completion = collect(stream, "fallback").await.unwrap();
        assert_eq!(completion.text, "Systems go");
        assert_eq!(completion.model, "gemini-2.5-flash");
        assert_eq!(completion.usage.output, 2);
    }

    #[tokio::test]
    async fn test_collect_without_done_uses_deltas() {
        let stream = stream_of(vec![
            CompletionEvent::TextDelta { delta: "partial".into() },
        ]);
        let completion = collect(stream, "gemini-pro").await.unwrap();
        assert_eq!(completion.text, "partial");
        assert_eq!(completion.model, "gemini-pro");
    }

    #[tokio::test]
    async fn test_collect_error_event() {
        let stream = stream_of(vec![CompletionEvent::Error {
            message: "quota exceeded".into(),
            status: None,
        }]);
        let err = collect(stream, "gemini-pro").await.unwrap_err();
        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn test_collect_classifies_status() {
        let stream = stream_of(vec![
            CompletionEvent::Start {
                model: "gemini-2.5-flash".into(),
            },
            CompletionEvent::Error {
                message: "Resource has been exhausted".into(),
                status: Some(429),
            },
        ]);
        let err = collect(stream, "gemini-2.5-flash").await.unwrap_err();
        assert!(matches!(err, Error::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_collect_empty_reply() {
        let stream = stream_of(vec![CompletionEvent::Done {
            text: "  ".into(),
            stop_reason: StopReason::Filtered,
            usage: Usage::default(),
        }]);
        assert!(matches!(
            collect(stream, "gemini-pro").await,
            Err(Error::EmptyResponse)
        ));
    }

    #[test]
    fn test_terminal_events() {
        assert!(CompletionEvent::Error {
            message: "x".into(),
            status: None
        }
        .is_terminal());
        assert!(!CompletionEvent::TextDelta { delta: "x".into() }.is_terminal());
    }
}
