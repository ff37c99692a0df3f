// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter traits.
//!
//! Every messaging provider implements exactly two seams: [`ChannelConnector`]
//! (how a live client is created from credentials or a fresh login) and
//! [`ChannelClient`] (what a live client can do). The session manager,
//! inbound router, and dispatchers are written once against these traits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use crate::error::SendloopError;
use crate::types::{Channel, InboundEvent, MediaPayload, PairingArtifact, TenantId};

/// A connected, live client for one tenant on one channel.
///
/// Implementations must tolerate concurrent calls from multiple tasks.
/// Sends within one outbound batch are issued sequentially with a throttle
/// delay, but a batch can overlap with auto-replies from the inbound loop
/// on the same handle.
#[async_trait]
pub trait ChannelClient: Send + Sync + 'static {
    /// The channel this client speaks.
    fn channel(&self) -> Channel;

    /// Sends a text message to a recipient or group identifier.
    /// Returns the channel-native message id on confirmed acceptance.
    async fn send_text(&self, recipient: &str, text: &str) -> Result<String, SendloopError>;

    /// Sends a media attachment (image/video/document) with an optional caption.
    async fn send_media(
        &self,
        recipient: &str,
        media: &MediaPayload,
        caption: Option<&str>,
    ) -> Result<String, SendloopError>;

    /// Waits for the next inbound event from the channel.
    ///
    /// Returns an error only when the underlying event stream has closed;
    /// callers treat that as "this client is done" and exit their loop.
    async fn next_event(&self) -> Result<InboundEvent, SendloopError>;

    /// Tears down the connection. Failures are reported as
    /// [`SendloopError::Teardown`] so the session manager can log and
    /// swallow them.
    async fn disconnect(&self) -> Result<(), SendloopError>;
}

/// Result of a pairing-based login completing in the background.
pub struct PairingOutcome {
    pub client: Arc<dyn ChannelClient>,
    /// Serialized credentials to persist for future restores.
    pub credentials: String,
}

/// What a fresh login produced.
///
/// Token-credential channels connect immediately; QR/pairing channels hand
/// back an artifact plus a oneshot that resolves when the user completes
/// pairing on their device.
pub enum LoginFlow {
    Connected {
        client: Arc<dyn ChannelClient>,
        credentials: String,
    },
    Pairing {
        artifact: PairingArtifact,
        completion: oneshot::Receiver<Result<PairingOutcome, SendloopError>>,
    },
}

/// Creates live clients for one channel.
#[async_trait]
pub trait ChannelConnector: Send + Sync + 'static {
    /// The channel this connector serves.
    fn channel(&self) -> Channel;

    /// One-shot restore of a live client from persisted credentials.
    ///
    /// No interactive login: either the credentials still work and a client
    /// comes back, or this fails and the caller falls through to a fresh
    /// login (or reports "cannot send").
    async fn restore(
        &self,
        tenant: &TenantId,
        credentials: &str,
    ) -> Result<Arc<dyn ChannelClient>, SendloopError>;

    /// Begins a fresh login flow for a tenant with no usable credentials.
    async fn begin_login(&self, tenant: &TenantId) -> Result<LoginFlow, SendloopError>;
}
