// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AI completion provider trait.

use async_trait::async_trait;

use crate::error::SendloopError;

/// A single-capability abstraction over an AI completion provider.
///
/// The inbound router only needs `complete(prompt) -> text`; it does not
/// care which provider implements it, only that the call can fail and that
/// failure must be absorbed into a static fallback reply.
#[async_trait]
pub trait CompletionProvider: Send + Sync + 'static {
    /// Generates a bounded-length reply to the given prompt.
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, SendloopError>;
}
