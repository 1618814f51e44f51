//! SmartCrusher: budgeted compression of a single block of context text
//!
//! Where [`crate::headroom`] works on a list of chat turns, the crusher works
//! on one large blob (tool output, logs, a JSON dump) in three stages:
//!
//! 1. Cache alignment: dynamic tokens (timestamps, UUIDs, request and session
//!    ids) are replaced by fixed placeholders so repeated prompts hash alike.
//! 2. Smart crush: repeated lines are collapsed into an omission marker while
//!    lines carrying a critical signal are always kept.
//! 3. Context fit: if still over budget, keep the head and tail and replace
//!    the middle with a marker.
//!
//! Originals are kept in memory by hash so callers can fetch the full text
//! back with [`SmartCrusher::retrieve`]. Only the most recent
//! [`MAX_RETAINED_ORIGINALS`] are kept; older ones are evicted first.

use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::LazyLock;

/// Default character budget
pub const DEFAULT_MAX_CHARS: usize = 4000;

/// Originals kept for [`SmartCrusher::retrieve`] before the oldest is evicted
pub const MAX_RETAINED_ORIGINALS: usize = 128;

/// Texts with this many lines or fewer skip the smart-crush stage
const MIN_LINES_TO_CRUSH: usize = 10;

/// Words that mark a line as worth keeping no matter what
const CRITICAL_SIGNALS: &[&str] = &[
    "error",
    "fatal",
    "critical",
    "fail",
    "exception",
    "crash",
    "warning",
    "timeout",
    "denied",
    "unauthorized",
    "rejected",
    "decision",
    "approved",
    "important",
    "required",
    "must",
];

static DYNAMIC_PATTERNS: LazyLock<Vec<(Regex, &'static str)>> = LazyLock::new(|| {
    [
        (
            r"\b\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}[.\d]*Z?\b",
            "[TIMESTAMP]",
        ),
        (
            r"\b[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}\b",
            "[UUID]",
        ),
        (r"req-\d+", "[REQ_ID]"),
        (r"session_[a-zA-Z0-9]+", "[SESSION_ID]"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| (Regex::new(pattern).unwrap(), replacement))
    .collect()
});

static DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

/// Result of crushing one block of text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrushResult {
    pub original_chars: usize,
    pub crushed_chars: usize,
    /// Percentage saved, one decimal place
    pub savings_pct: f64,
    pub content: String,
    /// Key for [`SmartCrusher::retrieve`]
    pub originals_hash: String,
}

/// Raw texts by hash, in insertion order
#[derive(Default)]
struct Originals {
    by_hash: HashMap<String, String>,
    order: VecDeque<String>,
}

impl Originals {
    fn insert(&mut self, hash: String, raw: &str, limit: usize) {
        if self.by_hash.contains_key(&hash) {
            return;
        }
        while self.order.len() >= limit {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.by_hash.remove(&oldest);
                }
                None => break,
            }
        }
        if limit == 0 {
            return;
        }
        self.by_hash.insert(hash.clone(), raw.to_string());
        self.order.push_back(hash);
    }
}

/// Compresses context text under a character budget
pub struct SmartCrusher {
    max_chars: usize,
    retain_limit: usize,
    originals: Mutex<Originals>,
}

impl Default for SmartCrusher {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CHARS)
    }
}

impl SmartCrusher {
    /// Create a crusher with a character budget
    pub fn new(max_chars: usize) -> Self {
        Self {
            max_chars,
            retain_limit: MAX_RETAINED_ORIGINALS,
            originals: Mutex::new(Originals::default()),
        }
    }

    /// Crush a structured value, rendered as pretty JSON first
    pub fn crush_json(&self, value: &serde_json::Value) -> CrushResult {
        let raw = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
        self.crush(&raw)
    }

    /// Run all three stages over `raw`
    pub fn crush(&self, raw: &str) -> CrushResult {
        let original_chars = raw.chars().count();

        let aligned = align_cache(raw);
        let crushed = smart_crush(&aligned);
        let fitted = fit_context(&crushed, self.max_chars);

        let originals_hash = content_hash(raw);
        self.originals
            .lock()
            .insert(originals_hash.clone(), raw, self.retain_limit);

        let crushed_chars = fitted.chars().count();
        let savings_pct = if original_chars > 0 {
            let pct = (original_chars as f64 - crushed_chars as f64) / original_chars as f64 * 100.0;
            (pct * 10.0).round() / 10.0
        } else {
            0.0
        };

        tracing::debug!(
            "SmartCrusher: {} -> {} chars ({}% saved, hash {})",
            original_chars,
            crushed_chars,
            savings_pct,
            originals_hash
        );

        CrushResult {
            original_chars,
            crushed_chars,
            savings_pct,
            content: fitted,
            originals_hash,
        }
    }

    /// Fetch the uncompressed text of an earlier crush
    pub fn retrieve(&self, hash: &str) -> Option<String> {
        self.originals.lock().by_hash.get(hash).cloned()
    }
}

/// First 12 hex chars of the SHA-256 of the text
fn content_hash(text: &str) -> String {
    let digest = format!("{:x}", Sha256::digest(text.as_bytes()));
    digest[..12].to_string()
}

fn align_cache(text: &str) -> String {
    let mut result = text.to_string();
    for (re, replacement) in DYNAMIC_PATTERNS.iter() {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    result
}

fn omitted_marker(count: usize) -> String {
    format!("  [... {} similar entries omitted ...]", count)
}

fn smart_crush(text: &str) -> String {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= MIN_LINES_TO_CRUSH {
        return text.to_string();
    }

    let mut seen_patterns: HashSet<String> = HashSet::new();
    let mut kept_lines: Vec<String> = Vec::new();
    let mut skipped_count = 0usize;

    for line in lines {
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }

        let lower = stripped.to_lowercase();
        let is_critical = CRITICAL_SIGNALS.iter().any(|signal| lower.contains(signal));

        if !is_critical {
            let normalized = DIGITS.replace_all(stripped, "N").into_owned();
            if !seen_patterns.insert(normalized) {
                skipped_count += 1;
                continue;
            }
        }

        if skipped_count > 0 {
            kept_lines.push(omitted_marker(skipped_count));
            skipped_count = 0;
        }
        kept_lines.push(line.to_string());
    }

    if skipped_count > 0 {
        kept_lines.push(omitted_marker(skipped_count));
    }

    kept_lines.join("\n")
}

fn fit_context(text: &str, max_chars: usize) -> String {
    let total = text.chars().count();
    if total <= max_chars {
        return text.to_string();
    }

    let first_cut = (max_chars as f64 * 0.3) as usize;
    let last_cut = (max_chars as f64 * 0.2) as usize;

    let first: String = text.chars().take(first_cut).collect();
    let last: String = text.chars().skip(total - last_cut).collect();
    let middle_chars = total - first_cut - last_cut;

    format!("{}\n[... {} chars compressed ...]\n{}", first, middle_chars, last)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align_cache() {
        let text = "at 2024-05-01T12:30:45.123Z req-42 in session_abc123 id 123e4567-e89b-12d3-a456-426614174000";
        assert_eq!(
            align_cache(text),
            "at [TIMESTAMP] [REQ_ID] in [SESSION_ID] id [UUID]"
        );
    }

    #[test]
    fn test_short_text_not_crushed() {
        let text = "a\na\na\na";
        assert_eq!(smart_crush(text), text);
    }

    #[test]
    fn test_dedupes_numbered_lines() {
        let text = (0..20)
            .map(|i| format!("GET /api/items/{} 200", i))
            .collect::<Vec<_>>()
            .join("\n");
        let crushed = smart_crush(&text);
        assert_eq!(
            crushed,
            "GET /api/items/0 200\n  [... 19 similar entries omitted ...]"
        );
    }

    #[test]
    fn test_critical_lines_always_kept() {
        let mut lines: Vec<String> = (0..6).map(|i| format!("tick {}", i)).collect();
        lines.push("ERROR disk full".to_string());
        lines.push("ERROR disk full".to_string());
        lines.extend((6..10).map(|i| format!("tick {}", i)));

        let crushed = smart_crush(&lines.join("\n"));
        assert_eq!(
            crushed,
            "tick 0\n  [... 5 similar entries omitted ...]\nERROR disk full\nERROR disk full\n  [... 4 similar entries omitted ...]"
        );
    }

    #[test]
    fn test_blank_lines_dropped() {
        let text = "one\n\n\ntwo\n \nthree\nfour\nfive\nsix\nseven\neight\nnine";
        assert_eq!(
            smart_crush(text),
            "one\ntwo\nthree\nfour\nfive\nsix\nseven\neight\nnine"
        );
    }

    #[test]
    fn test_fit_context_under_budget() {
        assert_eq!(fit_context("short", 100), "short");
    }

    #[test]
    fn test_fit_context_keeps_head_and_tail() {
        let text = format!("{}{}{}", "a".repeat(300), "b".repeat(400), "c".repeat(300));
        let fitted = fit_context(&text, 100);
        assert_eq!(
            fitted,
            format!(
                "{}\n[... 950 chars compressed ...]\n{}",
                "a".repeat(30),
                "c".repeat(20)
            )
        );
    }

    #[test]
    fn test_crush_and_retrieve() {
        let crusher = SmartCrusher::new(200);
        let raw = (0..50)
            .map(|i| format!("worker {} heartbeat ok", i))
            .collect::<Vec<_>>()
            .join("\n");

        let result = crusher.crush(&raw);
        assert_eq!(result.original_chars, raw.chars().count());
        assert!(result.crushed_chars < result.original_chars);
        assert!(result.savings_pct > 0.0);
        assert_eq!(result.originals_hash.len(), 12);
        assert_eq!(crusher.retrieve(&result.originals_hash), Some(raw));
        assert_eq!(crusher.retrieve("000000000000"), None);
    }

    #[test]
    fn test_oldest_original_evicted() {
        let mut crusher = SmartCrusher::default();
        crusher.retain_limit = 2;

        let first = crusher.crush("first").originals_hash;
        let second = crusher.crush("second").originals_hash;
        // Same text again does not refresh or duplicate the entry
        crusher.crush("first");
        let third = crusher.crush("third").originals_hash;

        assert_eq!(crusher.retrieve(&first), None);
        assert_eq!(crusher.retrieve(&second).as_deref(), Some("second"));
        assert_eq!(crusher.retrieve(&third).as_deref(), Some("third"));
        assert_eq!(crusher.originals.lock().order.len(), 2);
    }

    #[test]
    fn test_crush_empty() {
        let result = SmartCrusher::default().crush("");
        assert_eq!(result.original_chars, 0);
        assert_eq!(result.savings_pct, 0.0);
        assert_eq!(result.content, "");
    }

    #[test]
    fn test_crush_json_renders_pretty() {
        let crusher = SmartCrusher::default();
        let value = serde_json::json!({"status": "RUNNING"});
        let result = crusher.crush_json(&value);
        assert_eq!(result.content, "{\n  \"status\": \"RUNNING\"\n}");
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(content_hash("abc"), "ba7816bf8f01");
    }
}
