//! mission-ai: Message model and completion oracle for Mission Control
//!
//! This crate defines the chat turn shape shared by the history store and the
//! compressor, plus the text-completion oracle the chat pipeline forwards to
//! (Google Gemini with model fallback).

pub mod error;
pub mod oracle;
pub mod providers;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
pub use oracle::CompletionOracle;
pub use stream::CompletionEventStream;
pub use types::*;
