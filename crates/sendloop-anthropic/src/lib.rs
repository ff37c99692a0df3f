// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Anthropic Claude completion provider for Sendloop auto-replies.
//!
//! Wraps the Messages API behind the `CompletionProvider` trait so the
//! inbound router stays provider-agnostic.

pub mod client;
pub mod types;

use async_trait::async_trait;
use sendloop_config::model::AnthropicConfig;
use sendloop_core::{CompletionProvider, SendloopError};

pub use client::AnthropicClient;

use types::{ApiMessage, MessageRequest};

/// System prompt framing auto-replies. Kept short: the tenant's knowledge
/// base handles anything domain-specific before the AI is consulted.
const SYSTEM_PROMPT: &str = "You are a helpful assistant answering customer messages \
on behalf of a business. Reply concisely in the language of the incoming message. \
If you do not know the answer, say so and offer to connect the customer with a person.";

/// `CompletionProvider` backed by the Anthropic Messages API.
pub struct AnthropicCompleter {
    client: AnthropicClient,
}

impl AnthropicCompleter {
    /// Build a completer from config. The API key comes from config or the
    /// `ANTHROPIC_API_KEY` environment variable.
    pub fn from_config(config: &AnthropicConfig) -> Result<Self, SendloopError> {
        let api_key = match &config.api_key {
            Some(key) => key.clone(),
            None => std::env::var("ANTHROPIC_API_KEY").map_err(|_| {
                SendloopError::Config(
                    "no Anthropic API key: set anthropic.api_key or ANTHROPIC_API_KEY".to_string(),
                )
            })?,
        };
        let client = AnthropicClient::new(
            api_key,
            config.api_version.clone(),
            config.model.clone(),
            config.timeout_secs,
        )?;
        Ok(Self { client })
    }

    /// Wrap an existing client (used by tests).
    pub fn with_client(client: AnthropicClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CompletionProvider for AnthropicCompleter {
    async fn complete(&self, prompt: &str, max_tokens: u32) -> Result<String, SendloopError> {
        let request = MessageRequest {
            model: self.client.default_model().to_string(),
            messages: vec![ApiMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            system: Some(SYSTEM_PROMPT.to_string()),
            max_tokens,
        };
        let response = self.client.complete_message(&request).await?;
        let text = response.text();
        if text.trim().is_empty() {
            return Err(SendloopError::Provider {
                message: "completion response contained no text".to_string(),
                source: None,
            });
        }
        Ok(text)
    }
}
