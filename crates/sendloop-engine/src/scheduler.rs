// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Polling loop that claims due jobs and executes them.
//!
//! A single dispatcher instance per process. Claims go through an atomic
//! conditional update in storage, so a second tick (or a second process)
//! observing the same due job loses the claim and skips it. Once claimed, a
//! job runs to completion; there is no mid-flight cancellation.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sendloop_config::model::DispatcherConfig;
use sendloop_core::{BatchSummary, Channel, JobKind, MediaPayload, TenantId};
use sendloop_storage::{ScheduledJobRow, Store};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::outbound;
use crate::planner;
use crate::session::SessionManager;

/// Polls the schedule store and runs due jobs through the tenant's handle.
pub struct ScheduleDispatcher {
    store: Store,
    sessions: Arc<SessionManager>,
    cfg: DispatcherConfig,
}

impl ScheduleDispatcher {
    pub fn new(store: Store, sessions: Arc<SessionManager>, cfg: DispatcherConfig) -> Self {
        Self {
            store,
            sessions,
            cfg,
        }
    }

    /// Runs the polling loop until `shutdown` fires. A job in flight when
    /// shutdown arrives finishes its current tick.
    pub async fn run(&self, shutdown: CancellationToken) {
        let mut interval =
            tokio::time::interval(Duration::from_secs(self.cfg.poll_interval_secs));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("schedule dispatcher stopping");
                    return;
                }
                _ = interval.tick() => {
                    let now = planner::format_utc(Utc::now());
                    match self.tick(&now).await {
                        Ok(0) => {}
                        Ok(n) => info!(jobs = n, "dispatch tick complete"),
                        Err(e) => warn!(error = %e, "dispatch tick failed"),
                    }
                }
            }
        }
    }

    /// One poll: claim everything due at `now` and execute it. Exposed so
    /// tests can drive ticks deterministically. Returns how many jobs were
    /// claimed.
    pub async fn tick(&self, now: &str) -> Result<usize, sendloop_core::SendloopError> {
        let claimed = self.store.claim_due_jobs(now).await?;
        let count = claimed.len();
        for job in claimed {
            self.execute(job).await;
        }
        Ok(count)
    }

    /// Runs one claimed job to a terminal state. Partial per-recipient
    /// failures still complete the job, with detail in the summary; only a
    /// job that could not run at all is marked failed.
    async fn execute(&self, job: ScheduledJobRow) {
        let job_id = job.id.clone();
        let tenant = TenantId(job.tenant_id.clone());

        let parsed = Channel::from_str(&job.channel)
            .map_err(|_| format!("unknown channel '{}'", job.channel))
            .and_then(|channel| {
                JobKind::from_str(&job.kind)
                    .map_err(|_| format!("unknown job kind '{}'", job.kind))
                    .map(|kind| (channel, kind))
            })
            .and_then(|(channel, kind)| {
                planner::decode_payload(kind, &job.payload).map(|targets| (channel, kind, targets))
            });
        let (channel, kind, targets) = match parsed {
            Ok(parts) => parts,
            Err(reason) => {
                warn!(job_id = %job_id, tenant = %tenant, %reason, "job payload rejected");
                self.mark_failed(&job_id, &reason).await;
                return;
            }
        };

        let Some(client) = self.sessions.get_or_restore(&tenant, channel).await else {
            warn!(job_id = %job_id, tenant = %tenant, channel = %channel, "job failed: tenant session not connected");
            self.mark_failed(&job_id, "tenant session not connected").await;
            return;
        };

        let media = job.media_path.as_deref().map(MediaPayload::new);
        let delay_ms = job.per_recipient_delay_ms.max(0) as u64;
        let timeout = Duration::from_secs(self.cfg.send_timeout_secs);

        let items: Vec<(String, String)> = match kind {
            JobKind::Bulk => targets
                .iter()
                .map(|t| (t.recipient.clone(), job.template.clone()))
                .collect(),
            JobKind::Campaign => targets
                .iter()
                .map(|t| (t.recipient.clone(), planner::render_template(&job.template, t)))
                .collect(),
        };

        let summary =
            outbound::send_batch(client.as_ref(), &items, media.as_ref(), delay_ms, timeout).await;
        info!(
            job_id = %job_id,
            tenant = %tenant,
            channel = %channel,
            kind = %kind,
            sent = summary.sent,
            failed = summary.failed,
            "job executed"
        );
        self.mark_completed(&job_id, &summary).await;
    }

    async fn mark_completed(&self, job_id: &str, summary: &BatchSummary) {
        let encoded = match serde_json::to_string(summary) {
            Ok(encoded) => encoded,
            Err(e) => {
                warn!(job_id, error = %e, "summary encoding failed");
                format!(r#"{{"sent":{},"failed":{},"total":{}}}"#, summary.sent, summary.failed, summary.total)
            }
        };
        if let Err(e) = self.store.complete_job(job_id, &encoded).await {
            warn!(job_id, error = %e, "marking job completed failed");
        }
    }

    async fn mark_failed(&self, job_id: &str, reason: &str) {
        if let Err(e) = self.store.fail_job(job_id, reason).await {
            warn!(job_id, error = %e, "marking job failed failed");
        }
    }
}
