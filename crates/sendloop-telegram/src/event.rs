// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telegram update to [`InboundEvent`] mapping.

use sendloop_core::{ChatType, InboundEvent};
use teloxide::prelude::*;
use teloxide::types::ChatKind;

/// Classify a Telegram chat for the chat log.
pub fn classify_chat(msg: &Message) -> ChatType {
    match msg.chat.kind {
        ChatKind::Private(_) => ChatType::Private,
        _ if msg.chat.is_channel() => ChatType::Channel,
        _ => ChatType::Group,
    }
}

/// Convert a Telegram message into a channel-agnostic inbound event.
///
/// Returns `None` for non-text messages (stickers, media, service messages);
/// the router only auto-replies to text.
pub fn to_inbound_event(msg: &Message, bot_user_id: u64) -> Option<InboundEvent> {
    let text = msg.text()?.to_string();

    let sender_id = msg
        .from
        .as_ref()
        .map(|u| u.id.0.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    let from_self = msg.from.as_ref().is_some_and(|u| u.id.0 == bot_user_id);

    Some(InboundEvent {
        chat_id: msg.chat.id.0.to_string(),
        chat_type: classify_chat(msg),
        sender_id,
        text,
        from_self,
        external_id: Some(msg.id.0.to_string()),
        timestamp: msg.date.to_rfc3339(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Build a mock message from JSON, matching Telegram Bot API structure.
    fn make_message(chat: serde_json::Value, from_id: u64, text: &str) -> Message {
        let json = serde_json::json!({
            "message_id": 7,
            "date": 1700000000i64,
            "chat": chat,
            "from": {
                "id": from_id,
                "is_bot": false,
                "first_name": "Test",
            },
            "text": text,
        });
        serde_json::from_value(json).expect("failed to deserialize mock message")
    }

    fn private_chat(id: i64) -> serde_json::Value {
        serde_json::json!({"id": id, "type": "private", "first_name": "Test"})
    }

    #[test]
    fn maps_private_text_message() {
        let msg = make_message(private_chat(12345), 12345, "hello");
        let event = to_inbound_event(&msg, 999).unwrap();

        assert_eq!(event.chat_id, "12345");
        assert_eq!(event.chat_type, ChatType::Private);
        assert_eq!(event.sender_id, "12345");
        assert_eq!(event.text, "hello");
        assert!(!event.from_self);
        assert_eq!(event.external_id.as_deref(), Some("7"));
    }

    #[test]
    fn detects_own_messages() {
        let msg = make_message(private_chat(12345), 999, "echo");
        let event = to_inbound_event(&msg, 999).unwrap();
        assert!(event.from_self);
    }

    #[test]
    fn classifies_group_chats() {
        let chat = serde_json::json!({
            "id": -100123i64,
            "type": "supergroup",
            "title": "Test Group",
        });
        let msg = make_message(chat, 12345, "hi all");
        let event = to_inbound_event(&msg, 999).unwrap();
        assert_eq!(event.chat_type, ChatType::Group);
        assert_eq!(event.chat_id, "-100123");
    }

    #[test]
    fn skips_non_text_messages() {
        let json = serde_json::json!({
            "message_id": 8,
            "date": 1700000000i64,
            "chat": private_chat(12345),
            "from": {"id": 12345u64, "is_bot": false, "first_name": "Test"},
            "sticker": {
                "file_id": "abc",
                "file_unique_id": "def",
                "type": "regular",
                "width": 512,
                "height": 512,
                "is_animated": false,
                "is_video": false,
            },
        });
        let msg: Message = serde_json::from_value(json).unwrap();
        assert!(to_inbound_event(&msg, 999).is_none());
    }
}
