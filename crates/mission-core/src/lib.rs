//! mission-core: the chat core of Mission Control
//!
//! Shrinks chat history before it reaches the model (Headroom tiered
//! retention), decides which persona answers a message, strips persona
//! salutations from replies, and wires those steps into a per-turn
//! pipeline around an external history store and completion oracle.

pub mod chat;
pub mod crusher;
pub mod error;
pub mod events;
pub mod headroom;
pub mod history;
pub mod persona;
pub mod sanitize;

pub use chat::{ChatConfig, ChatPipeline, ChatReply};
pub use crusher::{CrushResult, SmartCrusher};
pub use error::{Error, Result};
pub use events::ChatEvent;
pub use headroom::{CompressionMethod, CompressionStats, Compressed, Headroom, HeadroomConfig};
pub use history::{HistoryStore, InMemoryHistory};
pub use persona::{Persona, instruction_for, route};
pub use sanitize::sanitize;
