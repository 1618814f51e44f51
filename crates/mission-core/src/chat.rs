//! Per-turn chat pipeline
//!
//! One call to [`ChatPipeline::handle`] takes a raw user message through
//! routing, history compression, the completion oracle and reply
//! sanitizing, and records both sides of the exchange in the history store.

use std::sync::Arc;

use mission_ai::{CompletionOracle, CompletionRequest, Message};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::error::Result;
use crate::events::ChatEvent;
use crate::headroom::{CompressionStats, Headroom, HeadroomConfig};
use crate::history::HistoryStore;
use crate::persona::{Persona, route};
use crate::sanitize::sanitize;

/// Name recorded on user turns in history
pub const USER_NAME: &str = "USER";

/// Pipeline configuration
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatConfig {
    /// How many stored messages are read back per turn
    pub history_window: usize,
    /// Compression settings for the history window
    pub headroom: HeadroomConfig,
    /// Maximum tokens the oracle may generate
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature passed to the oracle
    pub temperature: Option<f32>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_window: 20,
            headroom: HeadroomConfig::default(),
            max_output_tokens: None,
            temperature: None,
        }
    }
}

/// Outcome of a successful turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    pub persona: Persona,
    /// Sanitized reply text, as stored in history
    pub reply: String,
    /// Compression applied to the history window
    pub stats: CompressionStats,
    /// Model that answered
    pub model: String,
}

/// Wires router, compressor, oracle and sanitizer together
pub struct ChatPipeline {
    config: ChatConfig,
    headroom: Headroom,
    oracle: Arc<dyn CompletionOracle>,
    history: Arc<dyn HistoryStore>,
    event_tx: broadcast::Sender<ChatEvent>,
}

impl ChatPipeline {
    /// Create a pipeline over an oracle and a history store
    pub fn new(
        config: ChatConfig,
        oracle: Arc<dyn CompletionOracle>,
        history: Arc<dyn HistoryStore>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            headroom: Headroom::new(config.headroom),
            oracle,
            history,
            event_tx,
        }
    }

    /// Subscribe to pipeline events
    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.event_tx.subscribe()
    }

    /// Get the pipeline config
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    /// Run one turn for a raw user message.
    ///
    /// The user message is stored before the oracle is called, so it stays
    /// in history even when the oracle fails. On failure an
    /// [`ChatEvent::Error`] is emitted and the error is returned; nothing is
    /// stored for the reply.
    pub async fn handle(&self, text: &str) -> Result<ChatReply> {
        let persona = route(text);
        self.emit(ChatEvent::Routed { persona });

        let recent = self.history.recent(self.config.history_window).await?;
        let compressed = self.headroom.compress(&recent);
        tracing::debug!(
            "History window: {} messages, {} -> {} chars",
            recent.len(),
            compressed.stats.original_chars,
            compressed.stats.compressed_chars
        );
        self.emit(ChatEvent::Compressed {
            stats: compressed.stats.clone(),
        });

        let user_message = Message::user(text).with_name(USER_NAME);
        self.history.append(user_message.clone()).await?;

        let mut request = CompletionRequest::with_system(persona.system_instruction());
        request.messages = compressed.messages;
        request.push(user_message);
        request.max_output_tokens = self.config.max_output_tokens;
        request.temperature = self.config.temperature;

        let completion = match self.oracle.complete(&request).await {
            Ok(completion) => completion,
            Err(e) => {
                tracing::warn!("Completion failed for {}: {}", persona, e);
                self.emit(ChatEvent::Error {
                    message: e.to_string(),
                });
                return Err(e.into());
            }
        };

        let reply = sanitize(&completion.text);
        self.history
            .append(Message::model(reply.clone()).with_name(persona.key()))
            .await?;

        tracing::info!(
            "{} replied via {} ({} chars)",
            persona,
            completion.model,
            reply.chars().count()
        );
        self.emit(ChatEvent::Replied {
            persona,
            reply: reply.clone(),
        });

        Ok(ChatReply {
            persona,
            reply,
            stats: compressed.stats,
            model: completion.model,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headroom::CompressionMethod;
    use crate::history::InMemoryHistory;
    use async_trait::async_trait;
    use mission_ai::{Completion, Role, Usage};
    use parking_lot::Mutex;

    /// Oracle that replays canned replies and records every request
    struct MockOracle {
        replies: Mutex<Vec<mission_ai::Result<String>>>,
        requests: Mutex<Vec<CompletionRequest>>,
    }

    impl MockOracle {
        fn new(replies: Vec<mission_ai::Result<String>>) -> Self {
            Self {
                replies: Mutex::new(replies),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<CompletionRequest> {
            self.requests.lock().clone()
        }
    }

    #[async_trait]
    impl CompletionOracle for MockOracle {
        async fn complete(&self, request: &CompletionRequest) -> mission_ai::Result<Completion> {
            self.requests.lock().push(request.clone());
            let reply = {
                let mut replies = self.replies.lock();
                if replies.is_empty() {
                    Ok("done".to_string())
                } else {
                    replies.remove(0)
                }
            };
            reply.map(|text| Completion {
                text,
                model: "mock-model".into(),
                usage: Usage::default(),
            })
        }
    }

    fn pipeline(
        oracle: Arc<MockOracle>,
        history: Arc<InMemoryHistory>,
    ) -> ChatPipeline {
        ChatPipeline::new(ChatConfig::default(), oracle, history)
    }

    #[tokio::test]
    async fn test_turn_routes_and_sanitizes() {
        let oracle = Arc::new(MockOracle::new(vec![Ok(
            "The Boss: Fleet is on schedule.".to_string()
        )]));
        let history = Arc::new(InMemoryHistory::new());
        let chat = pipeline(oracle.clone(), history.clone());

        let reply = chat.handle("@boss status report").await.unwrap();
        assert_eq!(reply.persona, Persona::Boss);
        assert_eq!(reply.reply, "Fleet is on schedule.");
        assert_eq!(reply.model, "mock-model");

        let requests = oracle.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].system_instruction.as_deref(),
            Some(Persona::Boss.system_instruction())
        );
        assert_eq!(requests[0].messages.len(), 1);
        assert_eq!(requests[0].messages[0].content, "@boss status report");
    }

    #[tokio::test]
    async fn test_turn_records_both_sides() {
        let oracle = Arc::new(MockOracle::new(vec![Ok("Swarm: online".to_string())]));
        let history = Arc::new(InMemoryHistory::new());
        let chat = pipeline(oracle, history.clone());

        chat.handle("hello").await.unwrap();

        let stored = history.snapshot();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].role, Role::User);
        assert_eq!(stored[0].name.as_deref(), Some(USER_NAME));
        assert_eq!(stored[0].content, "hello");
        assert_eq!(stored[1].role, Role::Model);
        assert_eq!(stored[1].name.as_deref(), Some("THE SWARM"));
        assert_eq!(stored[1].content, "online");
    }

    #[tokio::test]
    async fn test_long_history_is_compressed() {
        let mut seeded = vec![Message::user("anchor").with_name(USER_NAME)];
        for i in 0..19 {
            if i % 2 == 0 {
                seeded.push(Message::user(format!("{} {}", i, "u".repeat(120))));
            } else {
                seeded.push(Message::model(format!("{} {}", i, "m".repeat(120))));
            }
        }
        let oracle = Arc::new(MockOracle::new(vec![]));
        let history = Arc::new(InMemoryHistory::with_messages(seeded));
        let chat = pipeline(oracle.clone(), history);

        let reply = chat.handle("@engineer summary?").await.unwrap();
        assert_eq!(reply.persona, Persona::Engineer);
        assert!(reply.stats.savings_percent > 0);
        assert!(
            reply
                .stats
                .methods_used
                .contains(&CompressionMethod::TieredRetention)
        );

        let sent = &oracle.requests()[0].messages;
        // 20 message window plus the new turn
        assert_eq!(sent.len(), 21);
        assert!(sent[1].content.ends_with("..."));
        assert_eq!(sent[20].content, "@engineer summary?");
    }

    #[tokio::test]
    async fn test_history_window_limits_read() {
        let seeded = (0..30).map(|i| Message::user(format!("m{}", i))).collect();
        let oracle = Arc::new(MockOracle::new(vec![]));
        let history = Arc::new(InMemoryHistory::with_messages(seeded));
        let config = ChatConfig {
            history_window: 5,
            ..Default::default()
        };
        let chat = ChatPipeline::new(config, oracle.clone(), history);

        chat.handle("next").await.unwrap();
        let sent = &oracle.requests()[0].messages;
        assert_eq!(sent.len(), 6);
        assert_eq!(sent[0].content, "m25");
    }

    #[tokio::test]
    async fn test_generation_settings_forwarded() {
        let oracle = Arc::new(MockOracle::new(vec![]));
        let history = Arc::new(InMemoryHistory::new());
        let config = ChatConfig {
            max_output_tokens: Some(256),
            temperature: Some(0.4),
            ..Default::default()
        };
        let chat = ChatPipeline::new(config, oracle.clone(), history);

        chat.handle("hi").await.unwrap();
        let request = &oracle.requests()[0];
        assert_eq!(request.max_output_tokens, Some(256));
        assert_eq!(request.temperature, Some(0.4));
    }

    #[tokio::test]
    async fn test_oracle_failure() {
        let oracle = Arc::new(MockOracle::new(vec![Err(mission_ai::Error::AllModelsFailed(
            "[gemini-2.5-flash]: quota... \n".into(),
        ))]));
        let history = Arc::new(InMemoryHistory::new());
        let chat = pipeline(oracle, history.clone());
        let mut events = chat.subscribe();

        let err = chat.handle("@deployer ship it").await.unwrap_err();
        assert!(err.to_string().contains("All models failed"));

        // User turn is kept, no reply stored
        let stored = history.snapshot();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].role, Role::User);

        let mut saw_error = false;
        while let Ok(event) = events.try_recv() {
            if let ChatEvent::Error { .. } = event {
                saw_error = true;
            }
        }
        assert!(saw_error);
    }

    #[tokio::test]
    async fn test_events_in_order() {
        let oracle = Arc::new(MockOracle::new(vec![Ok("ok".to_string())]));
        let history = Arc::new(InMemoryHistory::new());
        let chat = pipeline(oracle, history);
        let mut events = chat.subscribe();

        chat.handle("@analyst trends").await.unwrap();

        let mut seen = Vec::new();
        while let Ok(event) = events.try_recv() {
            seen.push(event);
        }
        assert_eq!(seen.len(), 3);
        assert!(matches!(
            seen[0],
            ChatEvent::Routed {
                persona: Persona::Analyst
            }
        ));
        assert!(matches!(seen[1], ChatEvent::Compressed { .. }));
        assert!(seen[2].is_terminal());
    }
}
