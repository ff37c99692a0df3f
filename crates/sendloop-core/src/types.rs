// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared across the Sendloop workspace.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Identifies one subscriber/account of the platform. The unit of isolation
/// for sessions, schedules, and message logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A messaging provider integration. Tenant sessions, live handles, and
/// scheduled jobs are all keyed by tenant x channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum Channel {
    Whatsapp,
    TelegramBot,
    TelegramPersonal,
    TelegramWeb,
}

/// Connection status for a tenant x channel session, as reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Connected,
    Initializing,
    Disconnected,
    Error,
}

/// The kind of one-time code used to authenticate a fresh session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PairingKind {
    QrCode,
    PairingCode,
}

/// A QR code or pairing code produced by a fresh login flow, cached by the
/// session manager until the login completes or the artifact expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairingArtifact {
    pub kind: PairingKind,
    /// Raw artifact payload (QR content string or numeric pairing code).
    pub data: String,
    pub issued_at: DateTime<Utc>,
}

/// Chat classification on the underlying channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChatType {
    Private,
    Group,
    Channel,
}

/// Message direction in the chat log.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Incoming,
    Outgoing,
}

/// Where an auto-reply's text came from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ResponseSource {
    KnowledgeBase,
    Ai,
    Fallback,
}

/// An inbound message event delivered by a live channel client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundEvent {
    /// Channel-native chat identifier used to reply.
    pub chat_id: String,
    pub chat_type: ChatType,
    pub sender_id: String,
    pub text: String,
    /// True when the tenant's own account originated the message (echo).
    pub from_self: bool,
    /// Channel-native message id, when the provider exposes one.
    pub external_id: Option<String>,
    /// RFC3339 timestamp from the provider.
    pub timestamp: String,
}

/// Coarse media classification used to pick the channel send primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

impl MediaKind {
    /// Classifies a file path or URL by extension. Anything unrecognized is
    /// sent as a document, which every supported channel accepts.
    pub fn from_path(path: &str) -> Self {
        let ext = Path::new(path)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        match ext.as_str() {
            "jpg" | "jpeg" | "png" | "gif" | "webp" => MediaKind::Image,
            "mp4" | "mov" | "mkv" | "webm" | "3gp" => MediaKind::Video,
            _ => MediaKind::Document,
        }
    }
}

/// A media attachment referenced by path or URL. Bytes are read by the
/// channel adapter at send time; storage lifecycle is owned elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaPayload {
    pub path: String,
    pub kind: MediaKind,
}

impl MediaPayload {
    pub fn new(path: impl Into<String>) -> Self {
        let path = path.into();
        let kind = MediaKind::from_path(&path);
        Self { path, kind }
    }
}

/// One recipient that could not be delivered to during a batch send.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendFailure {
    pub recipient: String,
    pub reason: String,
}

/// Outcome of a batch send. Individual failures never abort the batch, so
/// `sent + failed == total` always holds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchSummary {
    pub sent: usize,
    pub failed: usize,
    pub total: usize,
    pub failures: Vec<SendFailure>,
}

impl BatchSummary {
    pub fn record_sent(&mut self) {
        self.sent += 1;
        self.total += 1;
    }

    pub fn record_failure(&mut self, recipient: &str, reason: impl Into<String>) {
        self.failed += 1;
        self.total += 1;
        self.failures.push(SendFailure {
            recipient: recipient.to_string(),
            reason: reason.into(),
        });
    }
}

/// Deferred unit of work: a flat bulk send or a row-driven campaign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Bulk,
    Campaign,
}

/// Scheduled-job lifecycle. Transitions are monotonic:
/// pending -> running -> {completed, failed}, with pending -> cancelled as
/// the only other legal move.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}
