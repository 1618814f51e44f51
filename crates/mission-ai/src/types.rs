//! Core types for chat turns and completions

use serde::{Deserialize, Serialize};

/// Who produced a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The human operator
    User,
    /// Any agent or persona reply
    #[serde(alias = "assistant", alias = "agent")]
    Model,
}

impl Role {
    /// Get the role as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Model => "model",
        }
    }
}

/// One turn in a conversation.
///
/// Messages are values: nothing in the core mutates one in place, every
/// transformation builds a new `Message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    /// Text body. Records without content deserialize to the empty string.
    #[serde(default)]
    pub content: String,
    /// Originating identity (persona key or "USER"), display only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Message {
    /// Create a message with the given role and content
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            name: None,
        }
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create a model message
    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }

    /// Attach an originating identity
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Same role and name, different content
    pub fn with_content(&self, content: impl Into<String>) -> Self {
        Self {
            role: self.role,
            content: content.into(),
            name: self.name.clone(),
        }
    }

    /// Content length in characters (Unicode scalar values)
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Token usage reported by the oracle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub input: u32,
    pub output: u32,
}

/// A single completion request
#[derive(Debug, Clone, Default)]
pub struct CompletionRequest {
    /// System instruction sent out-of-band from the messages
    pub system_instruction: Option<String>,
    /// Conversation messages, oldest first
    pub messages: Vec<Message>,
    /// Maximum tokens to generate
    pub max_output_tokens: Option<u32>,
    /// Temperature (0.0 - 2.0)
    pub temperature: Option<f32>,
}

impl CompletionRequest {
    /// Create a request with a system instruction
    pub fn with_system(system_instruction: impl Into<String>) -> Self {
        Self {
            system_instruction: Some(system_instruction.into()),
            ..Default::default()
        }
    }

    /// Add a message to the request
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }
}

/// The oracle's answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Completion {
    /// Raw reply text
    pub text: String,
    /// Model id that produced the reply
    pub model: String,
    #[serde(default)]
    pub usage: Usage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_aliases() {
        let m: Message = serde_json::from_str(r#"{"role":"assistant","content":"hi"}"#).unwrap();
        assert_eq!(m.role, Role::Model);
        let m: Message = serde_json::from_str(r#"{"role":"agent","content":"hi"}"#).unwrap();
        assert_eq!(m.role, Role::Model);
    }

    #[test]
    fn test_missing_content_is_empty() {
        let m: Message = serde_json::from_str(r#"{"role":"user"}"#).unwrap();
        assert_eq!(m.content, "");
        assert!(m.name.is_none());
    }

    #[test]
    fn test_serialize_shape() {
        let m = Message::model("ok").with_name("THE BOSS");
        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"role": "model", "content": "ok", "name": "THE BOSS"})
        );

        let json = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(json.get("name").is_none());
    }

    #[test]
    fn test_char_len_counts_chars_not_bytes() {
        assert_eq!(Message::user("héllo").char_len(), 5);
        assert_eq!(Message::user("").char_len(), 0);
    }

    #[test]
    fn test_with_content_keeps_role_and_name() {
        let m = Message::user("long text").with_name("USER");
        let short = m.with_content("long...");
        assert_eq!(short.role, Role::User);
        assert_eq!(short.name.as_deref(), Some("USER"));
        assert_eq!(m.content, "long text");
    }
}
