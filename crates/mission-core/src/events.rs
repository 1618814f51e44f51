//! Chat pipeline event types

use serde::{Deserialize, Serialize};

use crate::headroom::CompressionStats;
use crate::persona::Persona;

/// Events emitted while a turn moves through the pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// The router picked a persona for the incoming message
    Routed { persona: Persona },

    /// History was compressed before being sent to the oracle
    Compressed { stats: CompressionStats },

    /// A sanitized reply was stored and is ready for display
    Replied { persona: Persona, reply: String },

    /// The turn failed
    Error { message: String },
}

impl ChatEvent {
    /// Check if this is a terminal event
    pub fn is_terminal(&self) -> bool {
        matches!(self, ChatEvent::Replied { .. } | ChatEvent::Error { .. })
    }
}
