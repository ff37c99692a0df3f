// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API channel adapter for Sendloop.
//!
//! Implements [`ChannelConnector`] and [`ChannelClient`] against Meta's Graph
//! API. Credentials are a JSON blob holding the access token and phone number
//! id; inbound traffic arrives via webhooks and is fed to the client through
//! [`WhatsappClient::ingest_webhook`].

pub mod webhook;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sendloop_config::model::WhatsappConfig;
use sendloop_core::{
    Channel, ChannelClient, ChannelConnector, InboundEvent, LoginFlow, MediaKind, MediaPayload,
    SendloopError, TenantId,
};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use webhook::WebhookPayload;

/// Inbound buffer between webhook ingestion and `next_event` callers.
const INBOUND_BUFFER: usize = 100;

/// Persisted credentials for one tenant's WhatsApp Business number.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsappCredentials {
    pub access_token: String,
    pub phone_number_id: String,
}

impl WhatsappCredentials {
    pub fn parse(raw: &str) -> Result<Self, SendloopError> {
        serde_json::from_str(raw).map_err(|e| {
            SendloopError::Config(format!(
                "whatsapp credentials must be JSON with access_token and phone_number_id: {e}"
            ))
        })
    }
}

/// Connector for tenant numbers on the WhatsApp Cloud API.
pub struct WhatsappConnector {
    config: WhatsappConfig,
}

impl WhatsappConnector {
    pub fn new(config: WhatsappConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ChannelConnector for WhatsappConnector {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    async fn restore(
        &self,
        tenant: &TenantId,
        credentials: &str,
    ) -> Result<Arc<dyn ChannelClient>, SendloopError> {
        let creds = WhatsappCredentials::parse(credentials)?;
        let client = WhatsappClient::new(&self.config, creds)?;
        client.validate().await?;
        info!(tenant = %tenant, phone_number_id = %client.phone_number_id, "whatsapp number connected");
        Ok(Arc::new(client))
    }

    async fn begin_login(&self, tenant: &TenantId) -> Result<LoginFlow, SendloopError> {
        debug!(tenant = %tenant, "fresh whatsapp login requested");
        Err(SendloopError::Config(
            "whatsapp has no interactive login: register Cloud API credentials \
             (access_token, phone_number_id) for this tenant, then start the session again"
                .into(),
        ))
    }
}

/// Live client for one tenant's WhatsApp Business number.
pub struct WhatsappClient {
    http: reqwest::Client,
    api_base: String,
    access_token: String,
    phone_number_id: String,
    inbound_tx: mpsc::Sender<InboundEvent>,
    inbound_rx: tokio::sync::Mutex<mpsc::Receiver<InboundEvent>>,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    messages: Vec<SentMessageId>,
}

#[derive(Debug, Deserialize)]
struct SentMessageId {
    id: String,
}

impl WhatsappClient {
    fn new(config: &WhatsappConfig, creds: WhatsappCredentials) -> Result<Self, SendloopError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SendloopError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        let (inbound_tx, inbound_rx) = mpsc::channel(INBOUND_BUFFER);
        Ok(Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            access_token: creds.access_token,
            phone_number_id: creds.phone_number_id,
            inbound_tx,
            inbound_rx: tokio::sync::Mutex::new(inbound_rx),
        })
    }

    /// Cheap credentials check: fetch the phone number object.
    async fn validate(&self) -> Result<(), SendloopError> {
        let url = format!("{}/{}?fields=id", self.api_base, self.phone_number_id);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| SendloopError::Channel {
                message: format!("whatsapp credential check failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SendloopError::Channel {
                message: format!("whatsapp credentials rejected ({status}): {body}"),
                source: None,
            });
        }
        Ok(())
    }

    /// Feed a webhook POST body into the inbound stream. Events addressed to
    /// other phone numbers are ignored.
    pub async fn ingest_webhook(&self, payload: &WebhookPayload) {
        for event in webhook::events_from_payload(payload, &self.phone_number_id) {
            if self.inbound_tx.send(event).await.is_err() {
                warn!("inbound channel closed, dropping webhook message");
            }
        }
    }

    async fn post_message(&self, body: serde_json::Value) -> Result<String, SendloopError> {
        let url = format!("{}/{}/messages", self.api_base, self.phone_number_id);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await
            .map_err(|e| SendloopError::Channel {
                message: format!("whatsapp send failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SendloopError::Channel {
                message: format!("whatsapp API error ({status}): {body}"),
                source: None,
            });
        }

        let parsed: SendResponse =
            response.json().await.map_err(|e| SendloopError::Channel {
                message: format!("failed to parse whatsapp send response: {e}"),
                source: Some(Box::new(e)),
            })?;
        parsed
            .messages
            .into_iter()
            .next()
            .map(|m| m.id)
            .ok_or_else(|| SendloopError::Channel {
                message: "whatsapp send response contained no message id".into(),
                source: None,
            })
    }
}

#[async_trait]
impl ChannelClient for WhatsappClient {
    fn channel(&self) -> Channel {
        Channel::Whatsapp
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<String, SendloopError> {
        self.post_message(serde_json::json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": "text",
            "text": {"body": text},
        }))
        .await
    }

    async fn send_media(
        &self,
        recipient: &str,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<String, SendloopError> {
        // The Cloud API takes media by public link; local files would need a
        // separate upload step the engine does not use.
        if !media.path.starts_with("http://") && !media.path.starts_with("https://") {
            return Err(SendloopError::Channel {
                message: format!(
                    "whatsapp media must be a public URL, got `{}`",
                    media.path
                ),
                source: None,
            });
        }

        let kind = match media.kind {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
            MediaKind::Document => "document",
        };
        let mut object = serde_json::json!({"link": media.path});
        if let Some(c) = caption {
            object["caption"] = serde_json::Value::String(c.to_string());
        }
        let mut body = serde_json::json!({
            "messaging_product": "whatsapp",
            "to": recipient,
            "type": kind,
        });
        body[kind] = object;
        self.post_message(body).await
    }

    async fn next_event(&self) -> Result<InboundEvent, SendloopError> {
        let mut rx = self.inbound_rx.lock().await;
        rx.recv().await.ok_or_else(|| SendloopError::Channel {
            message: "whatsapp inbound channel closed".into(),
            source: None,
        })
    }

    async fn disconnect(&self) -> Result<(), SendloopError> {
        debug!(phone_number_id = %self.phone_number_id, "whatsapp client disconnected");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base: &str) -> WhatsappConfig {
        WhatsappConfig {
            api_base: base.to_string(),
            timeout_secs: 5,
        }
    }

    fn test_creds() -> WhatsappCredentials {
        WhatsappCredentials {
            access_token: "token-123".into(),
            phone_number_id: "pn-1".into(),
        }
    }

    #[test]
    fn credentials_parse_and_reject_garbage() {
        let creds =
            WhatsappCredentials::parse(r#"{"access_token":"t","phone_number_id":"p"}"#).unwrap();
        assert_eq!(creds.access_token, "t");
        assert!(WhatsappCredentials::parse("not-json").is_err());
    }

    #[tokio::test]
    async fn send_text_returns_message_id() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pn-1/messages"))
            .and(header("authorization", "Bearer token-123"))
            .and(body_partial_json(serde_json::json!({
                "messaging_product": "whatsapp",
                "to": "5511999",
                "type": "text",
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.out"}]
            })))
            .mount(&server)
            .await;

        let client = WhatsappClient::new(&test_config(&server.uri()), test_creds()).unwrap();
        let id = client.send_text("5511999", "hello").await.unwrap();
        assert_eq!(id, "wamid.out");
    }

    #[tokio::test]
    async fn send_text_surfaces_api_errors() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pn-1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"error":{"message":"Invalid OAuth access token"}}"#,
            ))
            .mount(&server)
            .await;

        let client = WhatsappClient::new(&test_config(&server.uri()), test_creds()).unwrap();
        let err = client.send_text("5511999", "hello").await.unwrap_err();
        assert!(err.to_string().contains("401"), "got: {err}");
    }

    #[tokio::test]
    async fn send_media_requires_public_url() {
        let server = MockServer::start().await;
        let client = WhatsappClient::new(&test_config(&server.uri()), test_creds()).unwrap();

        let local = MediaPayload::new("/tmp/banner.png");
        let err = client.send_media("5511999", &local, None).await.unwrap_err();
        assert!(err.to_string().contains("public URL"), "got: {err}");
    }

    #[tokio::test]
    async fn send_media_uses_kind_specific_object() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/pn-1/messages"))
            .and(body_partial_json(serde_json::json!({
                "type": "image",
                "image": {"link": "https://cdn.example.com/banner.png", "caption": "New!"},
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "wamid.media"}]
            })))
            .mount(&server)
            .await;

        let client = WhatsappClient::new(&test_config(&server.uri()), test_creds()).unwrap();
        let media = MediaPayload::new("https://cdn.example.com/banner.png");
        let id = client
            .send_media("5511999", &media, Some("New!"))
            .await
            .unwrap();
        assert_eq!(id, "wamid.media");
    }

    #[tokio::test]
    async fn restore_validates_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pn-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "pn-1"})))
            .mount(&server)
            .await;

        let connector = WhatsappConnector::new(test_config(&server.uri()));
        let client = connector
            .restore(
                &TenantId::from("acme"),
                r#"{"access_token":"token-123","phone_number_id":"pn-1"}"#,
            )
            .await
            .unwrap();
        assert_eq!(client.channel(), Channel::Whatsapp);
    }

    #[tokio::test]
    async fn restore_rejects_bad_credentials() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/pn-1"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad token"))
            .mount(&server)
            .await;

        let connector = WhatsappConnector::new(test_config(&server.uri()));
        let result = connector
            .restore(
                &TenantId::from("acme"),
                r#"{"access_token":"wrong","phone_number_id":"pn-1"}"#,
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn webhook_ingestion_feeds_next_event() {
        let server = MockServer::start().await;
        let client = WhatsappClient::new(&test_config(&server.uri()), test_creds()).unwrap();

        let payload: WebhookPayload = serde_json::from_value(serde_json::json!({
            "entry": [{
                "id": "biz-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {
                            "display_phone_number": "15550001111",
                            "phone_number_id": "pn-1",
                        },
                        "messages": [{
                            "from": "5511999",
                            "id": "wamid.in",
                            "timestamp": "1700000000",
                            "type": "text",
                            "text": {"body": "hi"},
                        }],
                    },
                }],
            }],
        }))
        .unwrap();

        client.ingest_webhook(&payload).await;
        let event = client.next_event().await.unwrap();
        assert_eq!(event.text, "hi");
        assert_eq!(event.chat_id, "5511999");
    }
}
