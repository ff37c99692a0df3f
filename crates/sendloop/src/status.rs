// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sendloop status` command implementation.
//!
//! Reads the store directly and reports persisted session state and
//! scheduled-job counts. This shows what survives a restart, not live
//! connection state; `connected` is only knowable inside a running server.

use sendloop_config::model::SendloopConfig;
use sendloop_core::SendloopError;
use sendloop_storage::Store;
use serde::Serialize;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub active_sessions: Vec<SessionStatusLine>,
    pub job_counts: Vec<JobCountLine>,
}

#[derive(Debug, Serialize)]
pub struct SessionStatusLine {
    pub tenant_id: String,
    pub channel: String,
    pub last_sync_at: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JobCountLine {
    pub status: String,
    pub count: i64,
}

/// Runs the `sendloop status` command.
pub async fn run_status(config: &SendloopConfig, json: bool) -> Result<(), SendloopError> {
    let store =
        Store::open_with(&config.storage.database_path, config.storage.wal_mode).await?;

    let active_sessions = store
        .list_active_sessions()
        .await?
        .into_iter()
        .map(|row| SessionStatusLine {
            tenant_id: row.tenant_id,
            channel: row.channel,
            last_sync_at: row.last_sync_at,
        })
        .collect();
    let job_counts = store
        .job_counts()
        .await?
        .into_iter()
        .map(|(status, count)| JobCountLine { status, count })
        .collect();
    store.close().await?;

    let response = StatusResponse {
        database_path: config.storage.database_path.clone(),
        active_sessions,
        job_counts,
    };

    if json {
        let rendered = serde_json::to_string_pretty(&response)
            .map_err(|e| SendloopError::Internal(e.to_string()))?;
        println!("{rendered}");
        return Ok(());
    }

    println!("database: {}", response.database_path);
    if response.active_sessions.is_empty() {
        println!("sessions: none active");
    } else {
        println!("sessions:");
        for session in &response.active_sessions {
            let last_sync = session.last_sync_at.as_deref().unwrap_or("never");
            println!(
                "  {} / {} (last sync: {last_sync})",
                session.tenant_id, session.channel
            );
        }
    }
    if response.job_counts.is_empty() {
        println!("jobs: none");
    } else {
        println!("jobs:");
        for line in &response.job_counts {
            println!("  {}: {}", line.status, line.count);
        }
    }
    Ok(())
}
