// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel client for deterministic testing.
//!
//! `MockClient` implements `ChannelClient` with injectable inbound events and
//! captured outbound sends for assertion in tests. Individual recipients can
//! be scripted to fail.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use sendloop_core::{
    Channel, ChannelClient, InboundEvent, MediaPayload, SendloopError,
};
use tokio::sync::{Mutex, Notify};

/// One captured outbound send.
#[derive(Debug, Clone)]
pub struct SentRecord {
    pub recipient: String,
    pub text: String,
    pub media: Option<MediaPayload>,
    pub caption: Option<String>,
}

/// A mock channel client for testing.
///
/// Provides two queues:
/// - **inbound**: events injected via `inject()` are returned by `next_event()`
/// - **sent**: sends are captured and retrievable via `sent()`
pub struct MockClient {
    channel: Channel,
    inbound: Mutex<VecDeque<InboundEvent>>,
    notify: Notify,
    sent: Mutex<Vec<SentRecord>>,
    failing_recipients: Mutex<HashSet<String>>,
    fail_all: AtomicBool,
    closed: AtomicBool,
    disconnects: AtomicUsize,
    fail_disconnect: AtomicBool,
}

impl MockClient {
    pub fn new(channel: Channel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            inbound: Mutex::new(VecDeque::new()),
            notify: Notify::new(),
            sent: Mutex::new(Vec::new()),
            failing_recipients: Mutex::new(HashSet::new()),
            fail_all: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            disconnects: AtomicUsize::new(0),
            fail_disconnect: AtomicBool::new(false),
        })
    }

    /// Inject an inbound event. The next call to `next_event()` returns it.
    pub async fn inject(&self, event: InboundEvent) {
        self.inbound.lock().await.push_back(event);
        self.notify.notify_one();
    }

    /// All captured sends, in order.
    pub async fn sent(&self) -> Vec<SentRecord> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }

    /// Script sends to `recipient` to fail.
    pub async fn fail_recipient(&self, recipient: &str) {
        self.failing_recipients
            .lock()
            .await
            .insert(recipient.to_string());
    }

    /// Script every send to fail.
    pub fn set_fail_all(&self, fail: bool) {
        self.fail_all.store(fail, Ordering::SeqCst);
    }

    /// Close the inbound stream: pending and future `next_event()` calls
    /// return an error, as a real client does when its connection drops.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// How many times `disconnect()` has been called.
    pub fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    /// Script `disconnect()` to fail with a `Teardown` error.
    pub fn set_fail_disconnect(&self, fail: bool) {
        self.fail_disconnect.store(fail, Ordering::SeqCst);
    }

    async fn check_send(&self, recipient: &str) -> Result<(), SendloopError> {
        if self.fail_all.load(Ordering::SeqCst)
            || self.failing_recipients.lock().await.contains(recipient)
        {
            return Err(SendloopError::Channel {
                message: format!("mock send failure for {recipient}"),
                source: None,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ChannelClient for MockClient {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn send_text(&self, recipient: &str, text: &str) -> Result<String, SendloopError> {
        self.check_send(recipient).await?;
        self.sent.lock().await.push(SentRecord {
            recipient: recipient.to_string(),
            text: text.to_string(),
            media: None,
            caption: None,
        });
        Ok(format!("mock-{}", uuid::Uuid::new_v4()))
    }

    async fn send_media(
        &self,
        recipient: &str,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<String, SendloopError> {
        self.check_send(recipient).await?;
        self.sent.lock().await.push(SentRecord {
            recipient: recipient.to_string(),
            text: String::new(),
            media: Some(media.clone()),
            caption: caption.map(|c| c.to_string()),
        });
        Ok(format!("mock-{}", uuid::Uuid::new_v4()))
    }

    async fn next_event(&self) -> Result<InboundEvent, SendloopError> {
        loop {
            if self.closed.load(Ordering::SeqCst) {
                return Err(SendloopError::Channel {
                    message: "mock inbound stream closed".into(),
                    source: None,
                });
            }
            {
                let mut queue = self.inbound.lock().await;
                if let Some(event) = queue.pop_front() {
                    return Ok(event);
                }
            }
            self.notify.notified().await;
        }
    }

    async fn disconnect(&self) -> Result<(), SendloopError> {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
        self.close();
        if self.fail_disconnect.load(Ordering::SeqCst) {
            return Err(SendloopError::Teardown {
                channel: self.channel.to_string(),
                source: Box::new(std::io::Error::other("mock teardown failure")),
            });
        }
        Ok(())
    }
}
