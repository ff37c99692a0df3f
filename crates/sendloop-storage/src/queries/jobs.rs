// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scheduled job store.
//!
//! Status transitions are monotonic: `pending -> running -> {completed,
//! failed}` and `pending -> cancelled`. Every transition out of `pending` is
//! a conditional UPDATE guarded by `status = 'pending'`, so two dispatchers
//! racing for the same job can never both win.

use rusqlite::params;
use sendloop_core::{Channel, JobKind, SendloopError, TenantId};
use uuid::Uuid;

use crate::database::Database;
use crate::models::ScheduledJobRow;

/// Parameters for a new scheduled job.
#[derive(Debug, Clone)]
pub struct NewJob {
    pub tenant_id: TenantId,
    pub channel: Channel,
    pub kind: JobKind,
    /// JSON payload: recipient array for bulk, row objects for campaigns.
    pub payload: String,
    pub template: String,
    pub media_path: Option<String>,
    /// RFC3339 UTC instant at which the job becomes due.
    pub scheduled_at_utc: String,
    pub per_recipient_delay_ms: i64,
    pub daily_cap: Option<i64>,
}

/// Insert a pending job. Returns its generated id.
pub async fn insert(db: &Database, job: NewJob) -> Result<String, SendloopError> {
    let id = Uuid::new_v4().to_string();
    let returned = id.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO scheduled_jobs (id, tenant_id, channel, kind, payload, template,
                                             media_path, scheduled_at_utc, per_recipient_delay_ms,
                                             daily_cap)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    id,
                    job.tenant_id.as_str(),
                    job.channel.to_string(),
                    job.kind.to_string(),
                    job.payload,
                    job.template,
                    job.media_path,
                    job.scheduled_at_utc,
                    job.per_recipient_delay_ms,
                    job.daily_cap,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)?;
    Ok(returned)
}

/// Atomically claim every job due at or before `now` (RFC3339 UTC).
///
/// Each claimed job is moved to `running` before being returned; a job whose
/// status changed between select and update is silently skipped, so each due
/// job is returned to exactly one caller.
pub async fn claim_due(db: &Database, now: &str) -> Result<Vec<ScheduledJobRow>, SendloopError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            let due: Vec<ScheduledJobRow> = {
                let mut stmt = tx.prepare(
                    "SELECT id, tenant_id, channel, kind, payload, template, media_path,
                            scheduled_at_utc, status, per_recipient_delay_ms, daily_cap,
                            result_summary, failure_reason, created_at, updated_at
                     FROM scheduled_jobs
                     WHERE status = 'pending' AND scheduled_at_utc <= ?1
                     ORDER BY scheduled_at_utc, id",
                )?;
                let rows = stmt.query_map(params![now], row_to_job)?;
                let mut due = Vec::new();
                for row in rows {
                    due.push(row?);
                }
                due
            };

            let mut claimed = Vec::new();
            for mut job in due {
                let changed = tx.execute(
                    "UPDATE scheduled_jobs SET status = 'running',
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                     WHERE id = ?1 AND status = 'pending'",
                    params![job.id],
                )?;
                if changed == 1 {
                    job.status = "running".to_string();
                    claimed.push(job);
                }
            }
            tx.commit()?;
            Ok(claimed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Finish a running job with a result summary (JSON). Partial failures still
/// complete; only jobs that never got to send anything are failed.
pub async fn mark_completed(db: &Database, id: &str, summary: &str) -> Result<(), SendloopError> {
    let id = id.to_string();
    let summary = summary.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scheduled_jobs SET status = 'completed', result_summary = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND status = 'running'",
                params![summary, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fail a running job with a reason.
pub async fn mark_failed(db: &Database, id: &str, reason: &str) -> Result<(), SendloopError> {
    let id = id.to_string();
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE scheduled_jobs SET status = 'failed', failure_reason = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND status = 'running'",
                params![reason, id],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Cancel a job that has not started. Returns false once the job is running
/// or finished.
pub async fn cancel_if_pending(db: &Database, id: &str) -> Result<bool, SendloopError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE scheduled_jobs SET status = 'cancelled',
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?1 AND status = 'pending'",
                params![id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Move a pending job to a new due instant. Returns false once the job has
/// left `pending`.
pub async fn reschedule_if_pending(
    db: &Database,
    id: &str,
    scheduled_at_utc: &str,
) -> Result<bool, SendloopError> {
    let id = id.to_string();
    let scheduled_at_utc = scheduled_at_utc.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE scheduled_jobs SET scheduled_at_utc = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?2 AND status = 'pending'",
                params![scheduled_at_utc, id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Hard-delete a pending job. Returns false once the job has left `pending`.
pub async fn delete_if_pending(db: &Database, id: &str) -> Result<bool, SendloopError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "DELETE FROM scheduled_jobs WHERE id = ?1 AND status = 'pending'",
                params![id],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get one job by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<ScheduledJobRow>, SendloopError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, channel, kind, payload, template, media_path,
                        scheduled_at_utc, status, per_recipient_delay_ms, daily_cap,
                        result_summary, failure_reason, created_at, updated_at
                 FROM scheduled_jobs WHERE id = ?1",
            )?;
            let result = stmt.query_row(params![id], row_to_job);
            match result {
                Ok(job) => Ok(Some(job)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// All jobs for a tenant, newest first.
pub async fn list_for_tenant(
    db: &Database,
    tenant: &TenantId,
) -> Result<Vec<ScheduledJobRow>, SendloopError> {
    let tenant = tenant.as_str().to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tenant_id, channel, kind, payload, template, media_path,
                        scheduled_at_utc, status, per_recipient_delay_ms, daily_cap,
                        result_summary, failure_reason, created_at, updated_at
                 FROM scheduled_jobs WHERE tenant_id = ?1 ORDER BY created_at DESC, id",
            )?;
            let rows = stmt.query_map(params![tenant], row_to_job)?;
            let mut jobs = Vec::new();
            for row in rows {
                jobs.push(row?);
            }
            Ok(jobs)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fail every job stuck in `running`, used at boot after an unclean
/// shutdown. Returns how many rows were touched.
pub async fn fail_running(db: &Database, reason: &str) -> Result<usize, SendloopError> {
    let reason = reason.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE scheduled_jobs SET status = 'failed', failure_reason = ?1,
                 updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE status = 'running'",
                params![reason],
            )?;
            Ok(changed)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Job counts per status across all tenants, as `(status, count)` pairs.
pub async fn count_by_status(db: &Database) -> Result<Vec<(String, i64)>, SendloopError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT status, COUNT(*) FROM scheduled_jobs GROUP BY status ORDER BY status",
            )?;
            let rows = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
            let mut counts = Vec::new();
            for row in rows {
                counts.push(row?);
            }
            Ok(counts)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

fn row_to_job(row: &rusqlite::Row<'_>) -> Result<ScheduledJobRow, rusqlite::Error> {
    Ok(ScheduledJobRow {
        id: row.get(0)?,
        tenant_id: row.get(1)?,
        channel: row.get(2)?,
        kind: row.get(3)?,
        payload: row.get(4)?,
        template: row.get(5)?,
        media_path: row.get(6)?,
        scheduled_at_utc: row.get(7)?,
        status: row.get(8)?,
        per_recipient_delay_ms: row.get(9)?,
        daily_cap: row.get(10)?,
        result_summary: row.get(11)?,
        failure_reason: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
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

    fn bulk_job(at: &str) -> NewJob {
        NewJob {
            tenant_id: TenantId::from("acme"),
            channel: Channel::Whatsapp,
            kind: JobKind::Bulk,
            payload: r#"["5511999","5511888"]"#.to_string(),
            template: "Hello!".to_string(),
            media_path: None,
            scheduled_at_utc: at.to_string(),
            per_recipient_delay_ms: 0,
            daily_cap: None,
        }
    }

    #[tokio::test]
    async fn claim_due_skips_future_jobs() {
        let (db, _dir) = setup_db().await;

        let due = insert(&db, bulk_job("2026-01-01T00:00:00Z")).await.unwrap();
        let _future = insert(&db, bulk_job("2027-01-01T00:00:00Z")).await.unwrap();

        let claimed = claim_due(&db, "2026-06-01T00:00:00Z").await.unwrap();
        assert_eq!(claimed.len(), 1);
        assert_eq!(claimed[0].id, due);
        assert_eq!(claimed[0].status, "running");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claimed_job_cannot_be_claimed_again() {
        let (db, _dir) = setup_db().await;

        insert(&db, bulk_job("2026-01-01T00:00:00Z")).await.unwrap();

        let first = claim_due(&db, "2026-06-01T00:00:00Z").await.unwrap();
        assert_eq!(first.len(), 1);

        let second = claim_due(&db, "2026-06-01T00:00:00Z").await.unwrap();
        assert!(second.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cancel_only_works_while_pending() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, bulk_job("2026-01-01T00:00:00Z")).await.unwrap();
        let _claimed = claim_due(&db, "2026-06-01T00:00:00Z").await.unwrap();

        // Running jobs cannot be cancelled, rescheduled, or deleted.
        assert!(!cancel_if_pending(&db, &id).await.unwrap());
        assert!(!reschedule_if_pending(&db, &id, "2027-01-01T00:00:00Z")
            .await
            .unwrap());
        assert!(!delete_if_pending(&db, &id).await.unwrap());

        let job = get(&db, &id).await.unwrap().unwrap();
        assert_eq!(job.status, "running");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_job_is_never_claimed() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, bulk_job("2026-01-01T00:00:00Z")).await.unwrap();
        assert!(cancel_if_pending(&db, &id).await.unwrap());

        let claimed = claim_due(&db, "2026-06-01T00:00:00Z").await.unwrap();
        assert!(claimed.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn completion_records_summary() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, bulk_job("2026-01-01T00:00:00Z")).await.unwrap();
        let _claimed = claim_due(&db, "2026-06-01T00:00:00Z").await.unwrap();
        mark_completed(&db, &id, r#"{"sent":4,"failed":1,"total":5}"#)
            .await
            .unwrap();

        let job = get(&db, &id).await.unwrap().unwrap();
        assert_eq!(job.status, "completed");
        assert!(job.result_summary.unwrap().contains("\"sent\":4"));

        // Completed is terminal.
        mark_failed(&db, &id, "too late").await.unwrap();
        let job = get(&db, &id).await.unwrap().unwrap();
        assert_eq!(job.status, "completed");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn reschedule_moves_due_instant() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, bulk_job("2026-01-01T00:00:00Z")).await.unwrap();
        assert!(reschedule_if_pending(&db, &id, "2028-01-01T00:00:00Z")
            .await
            .unwrap());

        let claimed = claim_due(&db, "2027-01-01T00:00:00Z").await.unwrap();
        assert!(claimed.is_empty());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn fail_running_recovers_interrupted_jobs() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, bulk_job("2026-01-01T00:00:00Z")).await.unwrap();
        let pending = insert(&db, bulk_job("2027-01-01T00:00:00Z")).await.unwrap();
        let _claimed = claim_due(&db, "2026-06-01T00:00:00Z").await.unwrap();

        let touched = fail_running(&db, "interrupted by restart").await.unwrap();
        assert_eq!(touched, 1);

        let job = get(&db, &id).await.unwrap().unwrap();
        assert_eq!(job.status, "failed");
        assert_eq!(job.failure_reason.as_deref(), Some("interrupted by restart"));

        // Pending jobs are untouched.
        let other = get(&db, &pending).await.unwrap().unwrap();
        assert_eq!(other.status, "pending");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn delete_removes_pending_job() {
        let (db, _dir) = setup_db().await;

        let id = insert(&db, bulk_job("2026-01-01T00:00:00Z")).await.unwrap();
        assert!(delete_if_pending(&db, &id).await.unwrap());
        assert!(get(&db, &id).await.unwrap().is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_for_tenant_is_scoped() {
        let (db, _dir) = setup_db().await;

        insert(&db, bulk_job("2026-01-01T00:00:00Z")).await.unwrap();
        let mut other = bulk_job("2026-01-01T00:00:00Z");
        other.tenant_id = TenantId::from("other");
        insert(&db, other).await.unwrap();

        let jobs = list_for_tenant(&db, &TenantId::from("acme")).await.unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].tenant_id, "acme");

        db.close().await.unwrap();
    }
}
