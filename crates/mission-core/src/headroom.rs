//! Headroom: tiered-retention compression of chat history
//!
//! Before a conversation goes to the model, the history is split into three
//! zones:
//!
//! - **anchor**: the first message, pinned verbatim when `keep_system` is set
//! - **history**: everything between the anchor and the recent window,
//!   truncated per role
//! - **recent**: the trailing `keep_recent_count` messages, kept verbatim
//!
//! Short histories (at most `keep_recent_count + 1` messages) bypass
//! compression entirely. All lengths are counted in characters of `content`
//! only; role and name do not count.

use mission_ai::{Message, Role};
use serde::{Deserialize, Serialize};

/// User turns longer than this are truncated in the history zone
const USER_TRUNCATE_THRESHOLD: usize = 50;
/// Characters of a user turn kept when truncating
const USER_KEEP_CHARS: usize = 40;
/// Model turns longer than this are wrapped in the history zone
const MODEL_TRUNCATE_THRESHOLD: usize = 100;
/// Characters of a model turn kept inside the wrapper
const MODEL_KEEP_CHARS: usize = 50;

const ELLIPSIS: &str = "...";
const MODEL_WRAPPER_PREFIX: &str = "[Compressed Context: ";
const MODEL_WRAPPER_SUFFIX: &str = "...]";

/// Configuration for tiered retention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeadroomConfig {
    /// Number of most-recent messages kept verbatim
    pub keep_recent_count: usize,
    /// Whether the first message is a pinned anchor kept verbatim
    pub keep_system: bool,
}

impl Default for HeadroomConfig {
    fn default() -> Self {
        Self {
            keep_recent_count: 4,
            keep_system: true,
        }
    }
}

/// Strategy tag recorded in [`CompressionStats::methods_used`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionMethod {
    /// Short-history bypass, nothing was compressed
    None,
    /// Anchor / history / recent zoning
    TieredRetention,
    /// Role-dependent truncation of the history zone
    VariableTruncation,
}

impl CompressionMethod {
    /// Get the tag as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionMethod::None => "none",
            CompressionMethod::TieredRetention => "tiered_retention",
            CompressionMethod::VariableTruncation => "variable_truncation",
        }
    }
}

/// Statistics for one compression run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompressionStats {
    /// Total content characters across the input
    pub original_chars: usize,
    /// Total content characters across the output
    pub compressed_chars: usize,
    /// Rounded percentage reduction, 0 when nothing was saved
    pub savings_percent: u32,
    pub methods_used: Vec<CompressionMethod>,
}

impl CompressionStats {
    fn bypass(chars: usize) -> Self {
        Self {
            original_chars: chars,
            compressed_chars: chars,
            savings_percent: 0,
            methods_used: vec![CompressionMethod::None],
        }
    }

    /// Whether any compression strategy ran
    pub fn compressed(&self) -> bool {
        !self.methods_used.contains(&CompressionMethod::None)
    }
}

/// Output of [`Headroom::compress`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Compressed {
    pub messages: Vec<Message>,
    pub stats: CompressionStats,
}

/// Tiered-retention compressor.
///
/// Holds only its configuration; `compress` is a pure function of its input
/// and may be called concurrently.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Headroom {
    config: HeadroomConfig,
}

impl Headroom {
    /// Create a compressor with the given configuration
    pub fn new(config: HeadroomConfig) -> Self {
        Self { config }
    }

    /// Get the configuration
    pub fn config(&self) -> &HeadroomConfig {
        &self.config
    }

    /// Compress a conversation, returning new messages and statistics.
    ///
    /// The input is never modified.
    pub fn compress(&self, messages: &[Message]) -> Compressed {
        let original_chars = total_chars(messages);
        let keep_recent = self.config.keep_recent_count;

        if messages.len() <= keep_recent.saturating_add(1) {
            return Compressed {
                messages: messages.to_vec(),
                stats: CompressionStats::bypass(original_chars),
            };
        }

        let history_start = usize::from(self.config.keep_system);
        let recent_start = messages.len() - keep_recent;

        let mut compressed = Vec::with_capacity(messages.len());
        compressed.extend_from_slice(&messages[..history_start]);
        compressed.extend(messages[history_start..recent_start].iter().map(crush_message));
        compressed.extend_from_slice(&messages[recent_start..]);

        let compressed_chars = total_chars(&compressed);
        let stats = CompressionStats {
            original_chars,
            compressed_chars,
            savings_percent: savings_percent(original_chars, compressed_chars),
            methods_used: vec![
                CompressionMethod::TieredRetention,
                CompressionMethod::VariableTruncation,
            ],
        };

        tracing::debug!(
            "Headroom compressed {} messages: {} -> {} chars ({}% saved)",
            messages.len(),
            stats.original_chars,
            stats.compressed_chars,
            stats.savings_percent
        );

        Compressed {
            messages: compressed,
            stats,
        }
    }
}

/// Truncate one history-zone message according to its role
fn crush_message(message: &Message) -> Message {
    let len = message.char_len();
    match message.role {
        Role::User if len > USER_TRUNCATE_THRESHOLD => {
            let head = take_chars(&message.content, USER_KEEP_CHARS);
            message.with_content(format!("{}{}", head, ELLIPSIS))
        }
        Role::Model if len > MODEL_TRUNCATE_THRESHOLD => {
            let head = take_chars(&message.content, MODEL_KEEP_CHARS);
            message.with_content(format!(
                "{}{}{}",
                MODEL_WRAPPER_PREFIX, head, MODEL_WRAPPER_SUFFIX
            ))
        }
        _ => message.clone(),
    }
}

fn take_chars(s: &str, n: usize) -> &str {
    match s.char_indices().nth(n) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

fn total_chars(messages: &[Message]) -> usize {
    messages.iter().map(Message::char_len).sum()
}

fn savings_percent(original: usize, compressed: usize) -> u32 {
    if original == 0 {
        return 0;
    }
    let savings = (1.0 - compressed as f64 / original as f64) * 100.0;
    savings.max(0.0).round() as u32
}
