// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound sends through a tenant's live handle.
//!
//! Sends for one handle are strictly sequential with a mandatory
//! inter-message delay. That throttling is the primary defense against the
//! channel provider rate-limiting or banning the tenant's session, so it is
//! enforced here rather than left to callers.

use std::sync::Arc;
use std::time::Duration;

use sendloop_config::model::DispatcherConfig;
use sendloop_core::{BatchSummary, Channel, ChannelClient, MediaPayload, TenantId};
use tracing::{debug, warn};

use crate::session::SessionManager;

/// Sends single messages and throttled batches.
pub struct OutboundDispatcher {
    sessions: Arc<SessionManager>,
    cfg: DispatcherConfig,
}

impl OutboundDispatcher {
    pub fn new(sessions: Arc<SessionManager>, cfg: DispatcherConfig) -> Self {
        Self { sessions, cfg }
    }

    /// Sends one message to one recipient or group. Returns `true` only on
    /// confirmed acceptance by the transport; "not connected" is `false`,
    /// never an error.
    pub async fn send(
        &self,
        tenant: &TenantId,
        channel: Channel,
        recipient: &str,
        text: &str,
        media: Option<&MediaPayload>,
    ) -> bool {
        let Some(client) = self.sessions.get_or_restore(tenant, channel).await else {
            warn!(tenant = %tenant, channel = %channel, "send skipped: tenant session not connected");
            return false;
        };
        match send_one(client.as_ref(), recipient, text, media, self.send_timeout()).await {
            Ok(external_id) => {
                debug!(tenant = %tenant, channel = %channel, recipient, %external_id, "sent");
                true
            }
            Err(reason) => {
                warn!(tenant = %tenant, channel = %channel, recipient, %reason, "send failed");
                false
            }
        }
    }

    /// Sends the same message to many recipients sequentially, sleeping
    /// `delay_ms` between sends. One recipient's failure never aborts the
    /// rest of the batch.
    pub async fn send_to_many(
        &self,
        tenant: &TenantId,
        channel: Channel,
        recipients: &[String],
        text: &str,
        media: Option<&MediaPayload>,
        delay_ms: u64,
    ) -> BatchSummary {
        let Some(client) = self.sessions.get_or_restore(tenant, channel).await else {
            warn!(tenant = %tenant, channel = %channel, "batch skipped: tenant session not connected");
            let mut summary = BatchSummary::default();
            for recipient in recipients {
                summary.record_failure(recipient, "tenant session not connected");
            }
            return summary;
        };
        let items: Vec<(String, String)> = recipients
            .iter()
            .map(|r| (r.clone(), text.to_string()))
            .collect();
        send_batch(client.as_ref(), &items, media, delay_ms, self.send_timeout()).await
    }

    fn send_timeout(&self) -> Duration {
        Duration::from_secs(self.cfg.send_timeout_secs)
    }
}

/// One send with a bounded timeout. The error is a display string destined
/// for logs and batch summaries.
async fn send_one(
    client: &dyn ChannelClient,
    recipient: &str,
    text: &str,
    media: Option<&MediaPayload>,
    timeout: Duration,
) -> Result<String, String> {
    let send = async {
        match media {
            Some(media) => {
                let caption = (!text.is_empty()).then_some(text);
                client.send_media(recipient, media, caption).await
            }
            None => client.send_text(recipient, text).await,
        }
    };
    match tokio::time::timeout(timeout, send).await {
        Ok(Ok(external_id)) => Ok(external_id),
        Ok(Err(e)) => Err(e.to_string()),
        Err(_) => Err(format!("send timed out after {timeout:?}")),
    }
}

/// Sequential batch send over `(recipient, text)` pairs with per-recipient
/// throttling. Shared by `send_to_many` and the schedule dispatcher, which
/// already holds a claimed handle.
pub(crate) async fn send_batch(
    client: &dyn ChannelClient,
    items: &[(String, String)],
    media: Option<&MediaPayload>,
    delay_ms: u64,
    timeout: Duration,
) -> BatchSummary {
    let mut summary = BatchSummary::default();
    for (i, (recipient, text)) in items.iter().enumerate() {
        if i > 0 && delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        match send_one(client, recipient, text, media, timeout).await {
            Ok(_) => summary.record_sent(),
            Err(reason) => {
                warn!(%recipient, %reason, "batch send failed for recipient");
                summary.record_failure(recipient, reason);
            }
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use sendloop_test_utils::MockClient;

    #[tokio::test]
    async fn batch_isolates_individual_failures() {
        let client = MockClient::new(Channel::Whatsapp);
        client.fail_recipient("r3").await;
        let items: Vec<(String, String)> = ["r1", "r2", "r3", "r4", "r5"]
            .iter()
            .map(|r| (r.to_string(), "hello".to_string()))
            .collect();

        let summary =
            send_batch(client.as_ref(), &items, None, 0, Duration::from_secs(5)).await;

        assert_eq!(summary.sent, 4);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.failures[0].recipient, "r3");
        // r4 and r5 still went out after r3 failed.
        let sent = client.sent().await;
        assert_eq!(sent.len(), 4);
        assert_eq!(sent[2].recipient, "r4");
        assert_eq!(sent[3].recipient, "r5");
    }

    #[tokio::test]
    async fn media_send_carries_caption() {
        let client = MockClient::new(Channel::Whatsapp);
        let media = MediaPayload::new("https://cdn.example.com/banner.png");
        let items = vec![("r1".to_string(), "spring sale".to_string())];

        let summary =
            send_batch(client.as_ref(), &items, Some(&media), 0, Duration::from_secs(5)).await;

        assert_eq!(summary.sent, 1);
        let sent = client.sent().await;
        assert_eq!(sent[0].caption.as_deref(), Some("spring sale"));
        assert!(sent[0].media.is_some());
    }
}
