// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row structs mapping directly to table columns.
//!
//! Timestamps are stored as RFC3339 UTC strings; enum-valued columns hold the
//! snake_case/kebab-case string form of the corresponding `sendloop-core`
//! type. Conversion happens at the query layer.

use serde::{Deserialize, Serialize};

/// One row of `tenant_sessions`: persisted login state for a tenant on one
/// channel. At most one row per (tenant_id, channel).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantSessionRow {
    pub id: String,
    pub tenant_id: String,
    pub channel: String,
    /// Serialized channel credentials, absent until a login completes.
    pub credentials: Option<String>,
    pub is_active: bool,
    pub last_sync_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One row of `chat_log`. Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatLogRow {
    pub id: i64,
    pub tenant_id: String,
    pub channel: String,
    pub chat_id: String,
    pub chat_type: String,
    pub direction: String,
    pub content: String,
    pub external_id: Option<String>,
    /// For outgoing auto-replies: where the text came from.
    pub response_source: Option<String>,
    /// For knowledge-base replies: the keyword that matched.
    pub matched_keyword: Option<String>,
    pub created_at: String,
}

/// One row of `knowledge_entries`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntryRow {
    pub id: String,
    pub tenant_id: String,
    pub keyword: String,
    pub answer: String,
    pub is_active: bool,
    pub created_at: String,
}

/// One row of `scheduled_jobs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledJobRow {
    pub id: String,
    pub tenant_id: String,
    pub channel: String,
    pub kind: String,
    /// JSON payload: recipient list for bulk, row objects for campaigns.
    pub payload: String,
    pub template: String,
    pub media_path: Option<String>,
    pub scheduled_at_utc: String,
    pub status: String,
    pub per_recipient_delay_ms: i64,
    pub daily_cap: Option<i64>,
    /// JSON batch summary, set when the job completes.
    pub result_summary: Option<String>,
    pub failure_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A distinct conversation partner seen in the chat log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactRow {
    pub chat_id: String,
    pub chat_type: String,
    pub last_message_at: String,
}

/// Aggregate counts over a tenant's chat log.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatStats {
    pub incoming: i64,
    pub outgoing: i64,
    pub auto_replies: i64,
    pub distinct_chats: i64,
}
