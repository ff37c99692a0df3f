// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API webhook payload types and event mapping.
//!
//! The Cloud API delivers inbound traffic as webhook POSTs wrapping messages
//! in entry/changes envelopes. `events_from_payload` flattens one payload
//! into the channel-agnostic inbound events the router consumes.

use chrono::DateTime;
use sendloop_core::{ChatType, InboundEvent};
use serde::{Deserialize, Serialize};

/// Query parameters of Meta's webhook verification handshake (GET).
#[derive(Debug, Deserialize)]
pub struct VerificationParams {
    #[serde(rename = "hub.mode")]
    pub hub_mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub hub_verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub hub_challenge: Option<String>,
}

/// Answer the verification handshake: echo the challenge when the mode and
/// verify token match, `None` otherwise.
pub fn verify_subscription(params: &VerificationParams, expected_token: &str) -> Option<String> {
    match (&params.hub_mode, &params.hub_verify_token, &params.hub_challenge) {
        (Some(mode), Some(token), Some(challenge))
            if mode == "subscribe" && token == expected_token =>
        {
            Some(challenge.clone())
        }
        _ => None,
    }
}

/// Top-level webhook payload (POST body).
#[derive(Debug, Deserialize, Serialize)]
pub struct WebhookPayload {
    pub entry: Vec<WebhookEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WebhookEntry {
    pub id: String,
    pub changes: Vec<WebhookChange>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WebhookChange {
    pub value: WebhookValue,
    pub field: String,
}

/// The slice of the Cloud API change payload the router needs. Extra keys
/// the API sends (contact profiles, delivery statuses) are ignored by serde.
#[derive(Debug, Deserialize, Serialize)]
pub struct WebhookValue {
    pub messaging_product: String,
    pub metadata: WebhookMetadata,
    #[serde(default)]
    pub messages: Option<Vec<IncomingMessage>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct WebhookMetadata {
    pub display_phone_number: String,
    pub phone_number_id: String,
}

/// One inbound message from the webhook. Only text is routed; other kinds
/// are acknowledged and dropped.
#[derive(Debug, Deserialize, Serialize)]
pub struct IncomingMessage {
    pub from: String,
    pub id: String,
    /// Unix epoch seconds as a string, per the Cloud API.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub text: Option<TextBody>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TextBody {
    pub body: String,
}

/// Flatten a webhook payload into inbound events, scoped to the given
/// phone number id (each tenant has their own webhook subscription, but a
/// shared endpoint may receive traffic for several numbers).
pub fn events_from_payload(payload: &WebhookPayload, phone_number_id: &str) -> Vec<InboundEvent> {
    let mut events = Vec::new();
    for entry in &payload.entry {
        for change in &entry.changes {
            if change.field != "messages" {
                continue;
            }
            if change.value.metadata.phone_number_id != phone_number_id {
                continue;
            }
            let Some(messages) = &change.value.messages else {
                continue;
            };
            for message in messages {
                if message.msg_type != "text" {
                    continue;
                }
                let Some(text) = &message.text else { continue };
                events.push(InboundEvent {
                    chat_id: message.from.clone(),
                    chat_type: ChatType::Private,
                    sender_id: message.from.clone(),
                    text: text.body.clone(),
                    // The Cloud API never echoes the business's own sends
                    // through the messages webhook.
                    from_self: false,
                    external_id: Some(message.id.clone()),
                    timestamp: epoch_to_rfc3339(&message.timestamp),
                });
            }
        }
    }
    events
}

fn epoch_to_rfc3339(epoch: &str) -> String {
    epoch
        .parse::<i64>()
        .ok()
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| epoch.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_payload(phone_number_id: &str) -> WebhookPayload {
        serde_json::from_value(serde_json::json!({
            "entry": [{
                "id": "biz-1",
                "changes": [{
                    "field": "messages",
                    "value": {
                        "messaging_product": "whatsapp",
                        "metadata": {
                            "display_phone_number": "15550001111",
                            "phone_number_id": phone_number_id,
                        },
                        "contacts": [{"profile": {"name": "Alice"}, "wa_id": "5511999"}],
                        "messages": [{
                            "from": "5511999",
                            "id": "wamid.abc",
                            "timestamp": "1700000000",
                            "type": "text",
                            "text": {"body": "what are your prices?"},
                        }],
                    },
                }],
            }],
        }))
        .unwrap()
    }

    #[test]
    fn text_message_becomes_inbound_event() {
        let payload = sample_payload("pn-1");
        let events = events_from_payload(&payload, "pn-1");
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.chat_id, "5511999");
        assert_eq!(event.chat_type, ChatType::Private);
        assert_eq!(event.text, "what are your prices?");
        assert!(!event.from_self);
        assert_eq!(event.external_id.as_deref(), Some("wamid.abc"));
        assert!(event.timestamp.starts_with("2023-11-14T"));
    }

    #[test]
    fn other_phone_numbers_are_filtered_out() {
        let payload = sample_payload("pn-other");
        let events = events_from_payload(&payload, "pn-1");
        assert!(events.is_empty());
    }

    #[test]
    fn non_text_messages_are_dropped() {
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
                            "id": "wamid.img",
                            "timestamp": "1700000000",
                            "type": "image",
                        }],
                    },
                }],
            }],
        }))
        .unwrap();
        assert!(events_from_payload(&payload, "pn-1").is_empty());
    }

    #[test]
    fn verification_echoes_challenge_on_match() {
        let params = VerificationParams {
            hub_mode: Some("subscribe".into()),
            hub_verify_token: Some("secret".into()),
            hub_challenge: Some("12345".into()),
        };
        assert_eq!(verify_subscription(&params, "secret").as_deref(), Some("12345"));
        assert!(verify_subscription(&params, "wrong").is_none());
    }
}
