// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tenant session persistence.
//!
//! One row per (tenant, channel). `upsert_credentials` is the only write path
//! that stores login material; the UNIQUE constraint guarantees a second
//! login for the same pair updates in place instead of inserting a sibling.

use rusqlite::params;
use sendloop_core::{Channel, SendloopError, TenantId};
use uuid::Uuid;

use crate::database::Database;
use crate::models::TenantSessionRow;

/// Persist credentials after a login completes, activating the session.
pub async fn upsert_credentials(
    db: &Database,
    tenant: &TenantId,
    channel: Channel,
    credentials: &str,
) -> Result<(), SendloopError> {
    let id = Uuid::new_v4().to_string();
    let tenant = tenant.as_str().to_string();
    let channel = channel.to_string();
    let credentials = credentials.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO tenant_sessions (id, tenant_id, channel, credentials, is_active, last_sync_at)
                 VALUES (?1, ?2, ?3, ?4, 1, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
                 ON CONFLICT (tenant_id, channel) DO UPDATE SET
                     credentials = excluded.credentials,
                     is_active = 1,
                     last_sync_at = excluded.last_sync_at,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
                params![id, tenant, channel, credentials],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get the persisted session for a tenant on a channel, if any.
pub async fn get_session(
    db: &Database,
    tenant: &TenantId,
    channel: Channel,
) -> Result<Option<TenantSessionRow>, SendloopError> {
    let tenant = tenant.as_str().to_string();
    let channel = channel.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, channel, credentials, is_active, last_sync_at,
                        created_at, updated_at
                 FROM tenant_sessions WHERE tenant_id = ?1 AND channel = ?2",
            )?;
            let result = stmt.query_row(params![tenant, channel], row_to_session);
            match result {
                Ok(row) => Ok(Some(row)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Mark a session inactive. The credentials stay on the row so a later start
/// can attempt a restore.
pub async fn deactivate(
    db: &Database,
    tenant: &TenantId,
    channel: Channel,
) -> Result<(), SendloopError> {
    let tenant = tenant.as_str().to_string();
    let channel = channel.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE tenant_sessions SET is_active = 0,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE tenant_id = ?1 AND channel = ?2",
                params![tenant, channel],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All active sessions, for restore-at-boot.
pub async fn list_active(db: &Database) -> Result<Vec<TenantSessionRow>, SendloopError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, channel, credentials, is_active, last_sync_at,
                        created_at, updated_at
                 FROM tenant_sessions WHERE is_active = 1 ORDER BY tenant_id, channel",
            )?;
            let rows = stmt.query_map([], row_to_session)?;
            let mut sessions = Vec::new();
            for row in rows {
                sessions.push(row?);
            }
            Ok(sessions)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_session(row: &rusqlite::Row<'_>) -> Result<TenantSessionRow, rusqlite::Error> {
    Ok(TenantSessionRow {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel: row.get(2)?,
        credentials: row.get(3)?,
        is_active: row.get::<_, i64>(4)? != 0,
        last_sync_at: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn upsert_then_get_roundtrips() {
        let (db, _dir) = setup_db().await;
        let tenant = TenantId::from("acme");

        upsert_credentials(&db, &tenant, Channel::TelegramBot, "token-1")
            .await
            .unwrap();

        let row = get_session(&db, &tenant, Channel::TelegramBot)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.tenant_id, "acme");
        assert_eq!(row.channel, "telegram-bot");
        assert_eq!(row.credentials.as_deref(), Some("token-1"));
        assert!(row.is_active);
        assert!(row.last_sync_at.is_some());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_login_updates_in_place() {
        let (db, _dir) = setup_db().await;
        let tenant = TenantId::from("acme");

        upsert_credentials(&db, &tenant, Channel::Whatsapp, "creds-old")
            .await
            .unwrap();
        upsert_credentials(&db, &tenant, Channel::Whatsapp, "creds-new")
            .await
            .unwrap();

        // Exactly one row for the pair, holding the latest credentials.
        let count: i64 = db
            .connection()
            .call(|conn| -> Result<i64, tokio_rusqlite::Error> {
                let n = conn.query_row(
                    "SELECT COUNT(*) FROM tenant_sessions WHERE tenant_id = 'acme' AND channel = 'whatsapp'",
                    [],
                    |row| row.get(0),
                )?;
                Ok(n)
            })
            .await
            .unwrap();
        assert_eq!(count, 1);

        let row = get_session(&db, &tenant, Channel::Whatsapp)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.credentials.as_deref(), Some("creds-new"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn deactivate_keeps_credentials() {
        let (db, _dir) = setup_db().await;
        let tenant = TenantId::from("acme");

        upsert_credentials(&db, &tenant, Channel::TelegramBot, "token")
            .await
            .unwrap();
        deactivate(&db, &tenant, Channel::TelegramBot).await.unwrap();

        let row = get_session(&db, &tenant, Channel::TelegramBot)
            .await
            .unwrap()
            .unwrap();
        assert!(!row.is_active);
        assert_eq!(row.credentials.as_deref(), Some("token"));

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_active_skips_deactivated() {
        let (db, _dir) = setup_db().await;

        upsert_credentials(&db, &TenantId::from("a"), Channel::TelegramBot, "t1")
            .await
            .unwrap();
        upsert_credentials(&db, &TenantId::from("b"), Channel::Whatsapp, "t2")
            .await
            .unwrap();
        deactivate(&db, &TenantId::from("a"), Channel::TelegramBot)
            .await
            .unwrap();

        let active = list_active(&db).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].tenant_id, "b");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn same_tenant_different_channels_coexist() {
        let (db, _dir) = setup_db().await;
        let tenant = TenantId::from("acme");

        upsert_credentials(&db, &tenant, Channel::TelegramBot, "t")
            .await
            .unwrap();
        upsert_credentials(&db, &tenant, Channel::Whatsapp, "w")
            .await
            .unwrap();

        let active = list_active(&db).await.unwrap();
        assert_eq!(active.len(), 2);

        db.close().await.unwrap();
    }
}
