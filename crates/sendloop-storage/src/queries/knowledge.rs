// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Knowledge base lookup. The router only ever reads active entries; rows are
//! seeded by external tooling or tests.

use rusqlite::params;
use sendloop_core::{SendloopError, TenantId};
use uuid::Uuid;

use crate::database::Database;
use crate::models::KnowledgeEntryRow;

/// All active entries for a tenant, insertion order.
pub async fn active_entries(
    db: &Database,
    tenant: &TenantId,
) -> Result<Vec<KnowledgeEntryRow>, SendloopError> {
    let tenant = tenant.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, keyword, answer, is_active, created_at
                 FROM knowledge_entries
                 WHERE tenant_id = ?1 AND is_active = 1
                 ORDER BY created_at, id",
            )?;
            let rows = stmt.query_map(params![tenant], |row| {
                Ok(KnowledgeEntryRow {
                    id: row.get(0)?,
                    tenant_id: row.get(1)?,
                    keyword: row.get(2)?,
                    answer: row.get(3)?,
                    is_active: row.get::<_, i64>(4)? != 0,
                    created_at: row.get(5)?,
                })
            })?;
            let mut entries = Vec::new();
            for row in rows {
                entries.push(row?);
            }
            Ok(entries)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Insert one entry. Returns its generated id.
pub async fn insert_entry(
    db: &Database,
    tenant: &TenantId,
    keyword: &str,
    answer: &str,
) -> Result<String, SendloopError> {
    let id = Uuid::new_v4().to_string();
    let returned = id.clone();
    let tenant = tenant.as_str().to_string();
    let keyword = keyword.to_string();
    let answer = answer.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO knowledge_entries (id, tenant_id, keyword, answer)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id, tenant, keyword, answer],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(returned)
}

/// Soft-delete an entry. Returns false when the id is unknown.
pub async fn deactivate_entry(db: &Database, id: &str) -> Result<bool, SendloopError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE knowledge_entries SET is_active = 0 WHERE id = ?1",
                params![id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
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
    async fn insert_then_list_active() {
        let (db, _dir) = setup_db().await;
        let tenant = TenantId::from("acme");

        insert_entry(&db, &tenant, "pricing", "Our plans start at $10/mo.")
            .await
            .unwrap();
        insert_entry(&db, &tenant, "hours", "We're open 9-5 weekdays.")
            .await
            .unwrap();

        let entries = active_entries(&db, &tenant).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].keyword, "pricing");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn deactivated_entries_are_hidden() {
        let (db, _dir) = setup_db().await;
        let tenant = TenantId::from("acme");

        let id = insert_entry(&db, &tenant, "pricing", "answer").await.unwrap();
        assert!(deactivate_entry(&db, &id).await.unwrap());
        assert!(!deactivate_entry(&db, "no-such-id").await.unwrap());

        let entries = active_entries(&db, &tenant).await.unwrap();
        assert!(entries.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn entries_are_tenant_scoped() {
        let (db, _dir) = setup_db().await;

        insert_entry(&db, &TenantId::from("a"), "kw", "ans").await.unwrap();

        let entries = active_entries(&db, &TenantId::from("b")).await.unwrap();
        assert!(entries.is_empty());

        db.close().await.unwrap();
    }
}
