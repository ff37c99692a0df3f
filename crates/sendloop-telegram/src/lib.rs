// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram bot channel adapter for Sendloop.
//!
//! Implements [`ChannelConnector`] and [`ChannelClient`] for the Telegram Bot
//! API via teloxide. Credentials are the bot token; there is no interactive
//! pairing flow, so `begin_login` directs the caller to register a token.

pub mod event;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use sendloop_core::{
    Channel, ChannelClient, ChannelConnector, InboundEvent, LoginFlow, MediaKind, MediaPayload,
    SendloopError, TenantId,
};
use teloxide::prelude::*;
use teloxide::types::{ChatId, InputFile, Recipient};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Inbound buffer between the polling task and `next_event` callers.
const INBOUND_BUFFER: usize = 100;

/// Connector for tenant bots on the Telegram Bot API.
#[derive(Default)]
pub struct TelegramBotConnector;

impl TelegramBotConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ChannelConnector for TelegramBotConnector {
    fn channel(&self) -> Channel {
        Channel::TelegramBot
    }

    async fn restore(
        &self,
        tenant: &TenantId,
        credentials: &str,
    ) -> Result<Arc<dyn ChannelClient>, SendloopError> {
        let token = credentials.trim();
        if token.is_empty() {
            return Err(SendloopError::Config(
                "telegram-bot credentials must be a non-empty bot token".into(),
            ));
        }

        let bot = Bot::new(token);
        let me = bot.get_me().await.map_err(|e| SendloopError::Channel {
            message: format!("telegram bot token rejected: {e}"),
            source: Some(Box::new(e)),
        })?;

        info!(tenant = %tenant, bot = %me.username(), "telegram bot connected");
        Ok(Arc::new(TelegramBotClient::start(bot, me.id.0)))
    }

    async fn begin_login(&self, tenant: &TenantId) -> Result<LoginFlow, SendloopError> {
        debug!(tenant = %tenant, "fresh telegram-bot login requested");
        Err(SendloopError::Config(
            "telegram-bot has no interactive login: register a bot token as credentials \
             for this tenant, then start the session again"
                .into(),
        ))
    }
}

/// Live client for one tenant's Telegram bot.
pub struct TelegramBotClient {
    bot: Bot,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
    polling: tokio::task::AbortHandle,
}

impl TelegramBotClient {
    /// Spawn the long-polling task and return a connected client.
    fn start(bot: Bot, bot_user_id: u64) -> Self {
        let (tx, rx) = mpsc::channel(INBOUND_BUFFER);

        let handler = Update::filter_message().endpoint(move |msg: Message| {
            let tx = tx.clone();
            async move {
                if let Some(inbound) = event::to_inbound_event(&msg, bot_user_id) {
                    if tx.send(inbound).await.is_err() {
                        warn!("inbound channel closed, dropping message");
                    }
                }
                respond(())
            }
        });

        let polling_bot = bot.clone();
        let handle = tokio::spawn(async move {
            Dispatcher::builder(polling_bot, handler)
                .default_handler(|_| async {}) // Silently ignore non-message updates
                .build()
                .dispatch()
                .await;
        });

        Self {
            bot,
            inbound_rx: tokio::sync::Mutex::new(rx),
            polling: handle.abort_handle(),
        }
    }

    fn parse_chat(recipient: &str) -> Result<ChatId, SendloopError> {
        recipient
            .parse::<i64>()
            .map(ChatId)
            .map_err(|e| SendloopError::Channel {
                message: format!("invalid telegram chat id `{recipient}`: {e}"),
                source: None,
            })
    }

    fn input_file(media: &MediaPayload) -> Result<InputFile, SendloopError> {
        if media.path.starts_with("http://") || media.path.starts_with("https://") {
            let url = url::Url::parse(&media.path).map_err(|e| SendloopError::Channel {
                message: format!("invalid media url `{}`: {e}", media.path),
                source: None,
            })?;
            Ok(InputFile::url(url))
        } else {
            Ok(InputFile::file(PathBuf::from(&media.path)))
        }
    }
}

#[async_trait]
impl ChannelClient for TelegramBotClient {
    fn channel(&self) -> Channel {
        Channel::TelegramBot
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<String, SendloopError> {
        let chat = Self::parse_chat(recipient)?;
        let sent = self
            .bot
            .send_message(Recipient::Id(chat), text)
            .await
            .map_err(|e| SendloopError::Channel {
                message: format!("failed to send telegram message: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(sent.id.0.to_string())
    }

    async fn send_media(
        &self,
        recipient: &str,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<String, SendloopError> {
        let chat = Self::parse_chat(recipient)?;
        let file = Self::input_file(media)?;

        let map_err = |e: teloxide::RequestError| SendloopError::Channel {
            message: format!("failed to send telegram media: {e}"),
            source: Some(Box::new(e)),
        };

        let sent = match media.kind {
            MediaKind::Image => {
                let mut req = self.bot.send_photo(Recipient::Id(chat), file);
                if let Some(c) = caption {
                    req = req.caption(c.to_string());
                }
                req.await.map_err(map_err)?
            }
            MediaKind::Video => {
                let mut req = self.bot.send_video(Recipient::Id(chat), file);
                if let Some(c) = caption {
                    req = req.caption(c.to_string());
                }
                req.await.map_err(map_err)?
            }
            MediaKind::Document => {
                let mut req = self.bot.send_document(Recipient::Id(chat), file);
                if let Some(c) = caption {
                    req = req.caption(c.to_string());
                }
                req.await.map_err(map_err)?
            }
        };
        Ok(sent.id.0.to_string())
    }

    async fn next_event(&self) -> Result<InboundEvent, SendloopError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| SendloopError::Channel {
            message: "telegram inbound channel closed".into(),
            source: None,
        })
    }

    async fn disconnect(&self) -> Result<(), SendloopError> {
        debug!("stopping telegram long polling");
        self.polling.abort();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_chat_accepts_numeric_ids() {
        assert_eq!(TelegramBotClient::parse_chat("12345").unwrap(), ChatId(12345));
        assert_eq!(
            TelegramBotClient::parse_chat("-100123").unwrap(),
            ChatId(-100123)
        );
        assert!(TelegramBotClient::parse_chat("alice").is_err());
    }

    #[test]
    fn input_file_distinguishes_urls_from_paths() {
        let url_media = MediaPayload::new("https://cdn.example.com/banner.png");
        assert!(TelegramBotClient::input_file(&url_media).is_ok());

        let path_media = MediaPayload::new("/tmp/price-list.pdf");
        assert!(TelegramBotClient::input_file(&path_media).is_ok());

        let bad = MediaPayload {
            path: "https://".to_string(),
            kind: MediaKind::Image,
        };
        assert!(TelegramBotClient::input_file(&bad).is_err());
    }

    #[tokio::test]
    async fn begin_login_directs_to_credential_registration() {
        let connector = TelegramBotConnector::new();
        let result = connector.begin_login(&TenantId::from("acme")).await;
        match result {
            Err(SendloopError::Config(msg)) => assert!(msg.contains("bot token")),
            other => panic!("expected Config error, got {:?}", other.is_ok()),
        }
    }

    #[tokio::test]
    async fn restore_rejects_empty_credentials() {
        let connector = TelegramBotConnector::new();
        let result = connector.restore(&TenantId::from("acme"), "  ").await;
        assert!(matches!(result, Err(SendloopError::Config(_))));
    }
}
