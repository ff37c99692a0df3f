// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! High-level storage facade handed to the engine.
//!
//! Thin typed delegation over the query modules so engine code deals with a
//! single value instead of a `Database` plus free functions.

use sendloop_core::{Channel, SendloopError, TenantId};

use crate::database::Database;
use crate::models::{ChatLogRow, ChatStats, ContactRow, KnowledgeEntryRow, ScheduledJobRow, TenantSessionRow};
use crate::queries::{chat_log, jobs, knowledge, sessions};

pub use crate::queries::chat_log::NewChatEntry;
pub use crate::queries::jobs::NewJob;

/// Shared storage handle. Cheap to clone.
#[derive(Clone)]
pub struct Store {
    db: Database,
}

impl Store {
    /// Open the database at `path` in WAL mode, running migrations.
    pub async fn open(path: &str) -> Result<Self, SendloopError> {
        let db = Database::open(path).await?;
        Ok(Self { db })
    }

    /// Open with the journal mode chosen by the caller (`storage.wal_mode`).
    pub async fn open_with(path: &str, wal_mode: bool) -> Result<Self, SendloopError> {
        let db = Database::open_with(path, wal_mode).await?;
        Ok(Self { db })
    }

    /// The underlying database, for callers that need raw access (tests).
    pub fn database(&self) -> &Database {
        &self.db
    }

    pub async fn close(&self) -> Result<(), SendloopError> {
        self.db.close().await
    }

    // -- tenant sessions --

    pub async fn upsert_credentials(
        &self,
        tenant: &TenantId,
        channel: Channel,
        credentials: &str,
    ) -> Result<(), SendloopError> {
        sessions::upsert_credentials(&self.db, tenant, channel, credentials).await
    }

    pub async fn get_session(
        &self,
        tenant: &TenantId,
        channel: Channel,
    ) -> Result<Option<TenantSessionRow>, SendloopError> {
        sessions::get_session(&self.db, tenant, channel).await
    }

    pub async fn deactivate_session(
        &self,
        tenant: &TenantId,
        channel: Channel,
    ) -> Result<(), SendloopError> {
        sessions::deactivate(&self.db, tenant, channel).await
    }

    pub async fn list_active_sessions(&self) -> Result<Vec<TenantSessionRow>, SendloopError> {
        sessions::list_active(&self.db).await
    }

    // -- chat log --

    pub async fn append_chat(&self, entry: NewChatEntry) -> Result<i64, SendloopError> {
        chat_log::append(&self.db, entry).await
    }

    pub async fn chat_history(
        &self,
        tenant: &TenantId,
        channel: Channel,
        chat_id: &str,
        limit: u32,
    ) -> Result<Vec<ChatLogRow>, SendloopError> {
        chat_log::history(&self.db, tenant, channel, chat_id, limit).await
    }

    pub async fn contacts(
        &self,
        tenant: &TenantId,
        channel: Channel,
    ) -> Result<Vec<ContactRow>, SendloopError> {
        chat_log::contacts(&self.db, tenant, channel).await
    }

    pub async fn chat_stats(&self, tenant: &TenantId) -> Result<ChatStats, SendloopError> {
        chat_log::stats(&self.db, tenant).await
    }

    // -- knowledge base --

    pub async fn active_knowledge(
        &self,
        tenant: &TenantId,
    ) -> Result<Vec<KnowledgeEntryRow>, SendloopError> {
        knowledge::active_entries(&self.db, tenant).await
    }

    pub async fn insert_knowledge(
        &self,
        tenant: &TenantId,
        keyword: &str,
        answer: &str,
    ) -> Result<String, SendloopError> {
        knowledge::insert_entry(&self.db, tenant, keyword, answer).await
    }

    pub async fn deactivate_knowledge(&self, id: &str) -> Result<bool, SendloopError> {
        knowledge::deactivate_entry(&self.db, id).await
    }

    // -- scheduled jobs --

    pub async fn insert_job(&self, job: NewJob) -> Result<String, SendloopError> {
        jobs::insert(&self.db, job).await
    }

    pub async fn claim_due_jobs(&self, now: &str) -> Result<Vec<ScheduledJobRow>, SendloopError> {
        jobs::claim_due(&self.db, now).await
    }

    pub async fn complete_job(&self, id: &str, summary: &str) -> Result<(), SendloopError> {
        jobs::mark_completed(&self.db, id, summary).await
    }

    pub async fn fail_job(&self, id: &str, reason: &str) -> Result<(), SendloopError> {
        jobs::mark_failed(&self.db, id, reason).await
    }

    pub async fn cancel_job(&self, id: &str) -> Result<bool, SendloopError> {
        jobs::cancel_if_pending(&self.db, id).await
    }

    pub async fn reschedule_job(
        &self,
        id: &str,
        scheduled_at_utc: &str,
    ) -> Result<bool, SendloopError> {
        jobs::reschedule_if_pending(&self.db, id, scheduled_at_utc).await
    }

    pub async fn delete_job(&self, id: &str) -> Result<bool, SendloopError> {
        jobs::delete_if_pending(&self.db, id).await
    }

    pub async fn get_job(&self, id: &str) -> Result<Option<ScheduledJobRow>, SendloopError> {
        jobs::get(&self.db, id).await
    }

    pub async fn list_jobs(&self, tenant: &TenantId) -> Result<Vec<ScheduledJobRow>, SendloopError> {
        jobs::list_for_tenant(&self.db, tenant).await
    }

    pub async fn job_counts(&self) -> Result<Vec<(String, i64)>, SendloopError> {
        jobs::count_by_status(&self.db).await
    }

    /// Boot-time recovery: jobs left `running` by a crash become `failed`.
    pub async fn recover_interrupted_jobs(&self) -> Result<usize, SendloopError> {
        jobs::fail_running(&self.db, "interrupted by restart").await
    }
}
