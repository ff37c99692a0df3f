// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound message routing: knowledge-base match, AI fallback, reply.
//!
//! Every inbound event is handled to completion before the next one for the
//! same handle is processed; the session manager's event loop calls
//! [`InboundRouter::handle_event`] sequentially per client. The router never
//! returns an error: all failures degrade to the static fallback reply or to
//! a logged warning.

use std::sync::Arc;
use std::time::Duration;

use sendloop_config::model::RouterConfig;
use sendloop_core::{
    Channel, ChannelClient, CompletionProvider, Direction, InboundEvent, ResponseSource, TenantId,
};
use sendloop_storage::{NewChatEntry, Store};
use strsim::jaro_winkler;
use tracing::{debug, warn};

/// A reply picked for one inbound message.
struct Reply {
    text: String,
    source: ResponseSource,
    matched_keyword: Option<String>,
}

/// Routes inbound events to knowledge-base or AI-generated replies.
pub struct InboundRouter {
    store: Store,
    completer: Arc<dyn CompletionProvider>,
    cfg: RouterConfig,
}

impl InboundRouter {
    pub fn new(store: Store, completer: Arc<dyn CompletionProvider>, cfg: RouterConfig) -> Arc<Self> {
        Arc::new(Self {
            store,
            completer,
            cfg,
        })
    }

    /// Handles one inbound event: log it, pick a reply, send it, log that.
    pub async fn handle_event(
        &self,
        tenant: &TenantId,
        channel: Channel,
        client: &dyn ChannelClient,
        event: InboundEvent,
    ) {
        if event.from_self {
            return;
        }

        // Log before replying; a logging failure must not block the reply.
        if let Err(e) = self
            .store
            .append_chat(NewChatEntry {
                tenant_id: tenant.clone(),
                channel,
                chat_id: event.chat_id.clone(),
                chat_type: event.chat_type,
                direction: Direction::Incoming,
                content: event.text.clone(),
                external_id: event.external_id.clone(),
                response_source: None,
                matched_keyword: None,
            })
            .await
        {
            warn!(tenant = %tenant, channel = %channel, error = %e, "chat log append failed");
        }

        let reply = self.resolve_reply(tenant, &event.text).await;
        debug!(
            tenant = %tenant,
            channel = %channel,
            chat_id = %event.chat_id,
            source = %reply.source,
            "reply resolved"
        );

        tokio::time::sleep(Duration::from_secs(self.cfg.reply_delay_secs)).await;

        match client.send_text(&event.chat_id, &reply.text).await {
            Ok(external_id) => {
                if let Err(e) = self
                    .store
                    .append_chat(NewChatEntry {
                        tenant_id: tenant.clone(),
                        channel,
                        chat_id: event.chat_id.clone(),
                        chat_type: event.chat_type,
                        direction: Direction::Outgoing,
                        content: reply.text,
                        external_id: Some(external_id),
                        response_source: Some(reply.source),
                        matched_keyword: reply.matched_keyword,
                    })
                    .await
                {
                    warn!(tenant = %tenant, channel = %channel, error = %e, "chat log append failed");
                }
            }
            Err(e) => {
                warn!(
                    tenant = %tenant,
                    channel = %channel,
                    chat_id = %event.chat_id,
                    error = %e,
                    "auto-reply send failed"
                );
            }
        }
    }

    /// Knowledge base first; AI only when nothing clears the threshold; the
    /// static fallback when the AI call fails or times out.
    async fn resolve_reply(&self, tenant: &TenantId, text: &str) -> Reply {
        match self.store.active_knowledge(tenant).await {
            Ok(entries) => {
                let mut best: Option<(f64, &str, &str)> = None;
                for entry in &entries {
                    let score = fuzzy_score(text, &entry.keyword);
                    if best.map_or(true, |(s, _, _)| score > s) {
                        best = Some((score, &entry.keyword, &entry.answer));
                    }
                }
                if let Some((score, keyword, answer)) = best {
                    if score >= self.cfg.match_threshold {
                        return Reply {
                            text: answer.to_string(),
                            source: ResponseSource::KnowledgeBase,
                            matched_keyword: Some(keyword.to_string()),
                        };
                    }
                }
            }
            Err(e) => {
                warn!(tenant = %tenant, error = %e, "knowledge lookup failed");
            }
        }

        let timeout = Duration::from_secs(self.cfg.ai_timeout_secs);
        match tokio::time::timeout(
            timeout,
            self.completer.complete(text, self.cfg.ai_max_tokens),
        )
        .await
        {
            Ok(Ok(reply)) => Reply {
                text: reply,
                source: ResponseSource::Ai,
                matched_keyword: None,
            },
            Ok(Err(e)) => {
                warn!(tenant = %tenant, error = %e, "completion failed, using fallback reply");
                self.fallback()
            }
            Err(_) => {
                warn!(tenant = %tenant, timeout = ?timeout, "completion timed out, using fallback reply");
                self.fallback()
            }
        }
    }

    fn fallback(&self) -> Reply {
        Reply {
            text: self.cfg.fallback_reply.clone(),
            source: ResponseSource::Fallback,
            matched_keyword: None,
        }
    }
}

/// Similarity between an inbound text and a knowledge keyword, 0.0..=1.0.
///
/// Containment counts as an exact hit so "what is your pricing?" matches the
/// keyword "pricing". Otherwise the score is the best Jaro-Winkler similarity
/// of the keyword against the whole text and against each word, which
/// tolerates typos like "pricng".
pub(crate) fn fuzzy_score(text: &str, keyword: &str) -> f64 {
    let text = text.to_lowercase();
    let keyword = keyword.to_lowercase();
    if keyword.is_empty() {
        return 0.0;
    }
    if text.contains(&keyword) {
        return 1.0;
    }
    let mut best = jaro_winkler(&text, &keyword);
    for word in text.split_whitespace() {
        let score = jaro_winkler(word, &keyword);
        if score > best {
            best = score;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containment_is_exact_hit() {
        assert_eq!(fuzzy_score("what is your PRICING today", "pricing"), 1.0);
    }

    #[test]
    fn typo_scores_high_but_below_exact() {
        let score = fuzzy_score("tell me about pricng", "pricing");
        assert!(score > 0.9, "got {score}");
        assert!(score < 1.0);
    }

    #[test]
    fn unrelated_text_scores_low() {
        let score = fuzzy_score("good morning everyone", "refund policy");
        assert!(score < 0.84, "got {score}");
    }

    #[test]
    fn empty_keyword_never_matches() {
        assert_eq!(fuzzy_score("anything", ""), 0.0);
    }
}
