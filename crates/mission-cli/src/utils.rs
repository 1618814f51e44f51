//! Shared utilities

use anyhow::Context;
use mission_ai::Message;
use std::path::Path;

/// Truncate a string to `max` characters, appending "..." if truncated.
/// Operates on Unicode char boundaries, not bytes.
pub fn truncate_chars(s: &str, max: usize) -> String {
    let mut chars = s.chars();
    let truncated: String = chars.by_ref().take(max).collect();
    if chars.next().is_some() {
        format!("{}...", truncated)
    } else {
        truncated
    }
}

/// Parse messages from a JSON array or from JSONL (one message per line)
pub fn parse_messages(input: &str) -> anyhow::Result<Vec<Message>> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Invalid JSON message array");
    }

    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid message on line {}", i + 1))
        })
        .collect()
}

/// Read a messages file
pub fn read_messages(path: &Path) -> anyhow::Result<Vec<Message>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    parse_messages(&content)
}

/// One-line rendering of a stored message
pub fn format_message(message: &Message) -> String {
    let who = message
        .name
        .as_deref()
        .unwrap_or_else(|| message.role.as_str());
    format!("[{}] {}", who, truncate_chars(&message.content, 200))
}

#[cfg(test)]
mod tests {
    use super::*;
    use mission_ai::Role;

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello", 10), "hello");
        assert_eq!(truncate_chars("hello world", 5), "hello...");
        assert_eq!(truncate_chars("héllo", 2), "hé...");
    }

    #[test]
    fn test_parse_json_array() {
        let messages = parse_messages(
            r#"[{"role":"user","content":"a"},{"role":"model","content":"b","name":"THE BOSS"}]"#,
        )
        .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Model);
    }

    #[test]
    fn test_parse_jsonl() {
        let messages = parse_messages(
            "{\"role\":\"user\",\"content\":\"a\"}\n\n{\"role\":\"agent\",\"content\":\"b\"}\n",
        )
        .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].role, Role::Model);
    }

    #[test]
    fn test_parse_reports_line() {
        let err = parse_messages("{\"role\":\"user\"}\nnope\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_format_message() {
        assert_eq!(
            format_message(&Message::model("hi").with_name("THE BOSS")),
            "[THE BOSS] hi"
        );
        assert_eq!(format_message(&Message::user("yo")), "[user] yo");
    }
}
