//! The completion oracle seam

use async_trait::async_trait;

use crate::{Completion, CompletionRequest, Result};

/// A text-completion service: system instruction plus messages in, free
/// text out. Only success or failure is part of the contract.
#[async_trait]
pub trait CompletionOracle: Send + Sync {
    /// Produce a completion for the request
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion>;
}
