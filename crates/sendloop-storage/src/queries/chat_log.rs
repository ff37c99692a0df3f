// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Append-only chat log with read-only projections.

use rusqlite::params;
use sendloop_core::{Channel, ChatType, Direction, ResponseSource, SendloopError, TenantId};

use crate::database::Database;
use crate::models::{ChatLogRow, ChatStats, ContactRow};

/// Parameters for one chat log entry.
#[derive(Debug, Clone)]
pub struct NewChatEntry {
    pub tenant_id: TenantId,
    pub channel: Channel,
    pub chat_id: String,
    pub chat_type: ChatType,
    pub direction: Direction,
    pub content: String,
    pub external_id: Option<String>,
    pub response_source: Option<ResponseSource>,
    pub matched_keyword: Option<String>,
}

/// Append one entry. Returns the rowid.
pub async fn append(db: &Database, entry: NewChatEntry) -> Result<i64, SendloopError> {
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO chat_log (tenant_id, channel, chat_id, chat_type, direction,
                                       content, external_id, response_source, matched_keyword)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    entry.tenant_id.as_str(),
                    entry.channel.to_string(),
                    entry.chat_id,
                    entry.chat_type.to_string(),
                    entry.direction.to_string(),
                    entry.content,
                    entry.external_id,
                    entry.response_source.map(|s| s.to_string()),
                    entry.matched_keyword,
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Message history for one chat, newest last, capped at `limit`.
pub async fn history(
    db: &Database,
    tenant: &TenantId,
    channel: Channel,
    chat_id: &str,
    limit: u32,
) -> Result<Vec<ChatLogRow>, SendloopError> {
    let tenant = tenant.as_str().to_string();
    let channel = channel.to_string();
    let chat_id = chat_id.to_string();
    db.connection()
        .call(move |conn| {
            // Take the newest N then flip so callers read oldest-first.
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, channel, chat_id, chat_type, direction, content,
                        external_id, response_source, matched_keyword, created_at
                 FROM chat_log
                 WHERE tenant_id = ?1 AND channel = ?2 AND chat_id = ?3
                 ORDER BY id DESC LIMIT ?4",
            )?;
            let rows = stmt.query_map(params![tenant, channel, chat_id, limit], row_to_entry)?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            entries.reverse();
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Distinct chats the tenant has talked to on a channel, most recent first.
pub async fn contacts(
    db: &Database,
    tenant: &TenantId,
    channel: Channel,
) -> Result<Vec<ContactRow>, SendloopError> {
    let tenant = tenant.as_str().to_string();
    let channel = channel.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT chat_id, chat_type, MAX(created_at) AS last_message_at
                 FROM chat_log
                 WHERE tenant_id = ?1 AND channel = ?2
                 GROUP BY chat_id, chat_type
                 ORDER BY last_message_at DESC",
            )?;
            let rows = stmt.query_map(params![tenant, channel], |row| {
                Ok(ContactRow {
                    chat_id: row.get(0)?,
                    chat_type: row.get(1)?,
                    last_message_at: row.get(2)?,
                })
            })?;
            let mut contacts = Vec::new();
            for row in rows {
                contacts.push(row?);
            }
            Ok(contacts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Aggregate counts over a tenant's whole chat log.
pub async fn stats(db: &Database, tenant: &TenantId) -> Result<ChatStats, SendloopError> {
    let tenant = tenant.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let stats = conn.query_row(
                "SELECT
                     COUNT(*) FILTER (WHERE direction = 'incoming'),
                     COUNT(*) FILTER (WHERE direction = 'outgoing'),
                     COUNT(*) FILTER (WHERE response_source IS NOT NULL),
                     COUNT(DISTINCT chat_id)
                 FROM chat_log WHERE tenant_id = ?1",
                params![tenant],
                |row| {
                    Ok(ChatStats {
                        incoming: row.get(0)?,
                        outgoing: row.get(1)?,
                        auto_replies: row.get(2)?,
                        distinct_chats: row.get(3)?,
                    })
                },
            )?;
            Ok(stats)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_entry(row: &rusqlite::Row<'_>) -> Result<ChatLogRow, rusqlite::Error> {
    Ok(ChatLogRow {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel: row.get(2)?,
        chat_id: row.get(3)?,
        chat_type: row.get(4)?,
        direction: row.get(5)?,
        content: row.get(6)?,
        external_id: row.get(7)?,
        response_source: row.get(8)?,
        matched_keyword: row.get(9)?,
        created_at: row.get(10)?,
    })
}
