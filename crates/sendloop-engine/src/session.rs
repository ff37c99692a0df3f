// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session lifecycle for tenant x channel connections.
//!
//! The [`SessionManager`] owns the in-memory map of live client handles.
//! Each (tenant, channel) key maps to a slot guarded by its own mutex, so
//! two concurrent `start_session` calls for the same key serialize and the
//! second observes the in-flight state instead of spawning a duplicate
//! handle. Connection and login failures surface as a status, never as a
//! panic or an error bubbling out of `start_session`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use sendloop_config::model::SessionConfig;
use sendloop_core::{
    Channel, ChannelClient, ChannelConnector, LoginFlow, PairingArtifact, SendloopError,
    SessionStatus, TenantId,
};
use sendloop_storage::Store;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::router::InboundRouter;

/// What `start_session` reports back to the caller.
#[derive(Debug, Clone)]
pub struct StartOutcome {
    pub status: SessionStatus,
    /// Present while a fresh login is waiting on the user to scan/enter it.
    pub pairing: Option<PairingArtifact>,
}

enum SlotState {
    Empty,
    Initializing {
        artifact: Option<PairingArtifact>,
        started_at: Instant,
    },
    Connected {
        client: Arc<dyn ChannelClient>,
        event_task: JoinHandle<()>,
    },
    Failed {
        reason: String,
    },
}

type Slot = Arc<Mutex<SlotState>>;

/// Owns live handles and drives login, restore, and teardown.
pub struct SessionManager {
    store: Store,
    connectors: HashMap<Channel, Arc<dyn ChannelConnector>>,
    slots: DashMap<(TenantId, Channel), Slot>,
    router: Arc<InboundRouter>,
    cfg: SessionConfig,
}

impl SessionManager {
    pub fn new(
        store: Store,
        connectors: Vec<Arc<dyn ChannelConnector>>,
        router: Arc<InboundRouter>,
        cfg: SessionConfig,
    ) -> Arc<Self> {
        let connectors = connectors
            .into_iter()
            .map(|c| (c.channel(), c))
            .collect();
        Arc::new(Self {
            store,
            connectors,
            slots: DashMap::new(),
            router,
            cfg,
        })
    }

    fn slot(&self, tenant: &TenantId, channel: Channel) -> Slot {
        self.slots
            .entry((tenant.clone(), channel))
            .or_insert_with(|| Arc::new(Mutex::new(SlotState::Empty)))
            .clone()
    }

    fn pairing_expired(&self, started_at: Instant) -> bool {
        started_at.elapsed() > Duration::from_secs(self.cfg.pairing_ttl_secs)
    }

    /// Starts (or reports on) the session for one tenant x channel.
    ///
    /// Idempotent: an already-connected session returns `connected` and an
    /// in-flight login returns `initializing` without side effects. Fresh
    /// pairing-based logins return immediately with the artifact; completion
    /// happens in the background.
    pub async fn start_session(&self, tenant: &TenantId, channel: Channel) -> StartOutcome {
        let slot = self.slot(tenant, channel);
        let mut state = slot.lock().await;

        match &*state {
            SlotState::Connected { .. } => {
                return StartOutcome {
                    status: SessionStatus::Connected,
                    pairing: None,
                };
            }
            SlotState::Initializing {
                artifact,
                started_at,
            } if !self.pairing_expired(*started_at) => {
                return StartOutcome {
                    status: SessionStatus::Initializing,
                    pairing: artifact.clone(),
                };
            }
            // Empty, Failed, or an Initializing whose artifact expired: try
            // again from scratch.
            _ => {}
        }

        let Some(connector) = self.connectors.get(&channel) else {
            let reason = format!("no connector registered for channel {channel}");
            warn!(tenant = %tenant, channel = %channel, "{reason}");
            *state = SlotState::Failed { reason };
            return StartOutcome {
                status: SessionStatus::Error,
                pairing: None,
            };
        };

        // Prefer restoring from persisted credentials over a fresh login.
        match self.store.get_session(tenant, channel).await {
            Ok(Some(row)) => {
                if let Some(credentials) = row.credentials.as_deref() {
                    match self.try_restore(connector, tenant, channel, credentials).await {
                        Ok(client) => {
                            self.install_connected(&mut state, &slot, tenant, channel, client);
                            return StartOutcome {
                                status: SessionStatus::Connected,
                                pairing: None,
                            };
                        }
                        Err(e) => {
                            debug!(
                                tenant = %tenant, channel = %channel, error = %e,
                                "restore failed, falling through to fresh login"
                            );
                        }
                    }
                }
            }
            Ok(None) => {}
            Err(e) => {
                warn!(tenant = %tenant, channel = %channel, error = %e, "session lookup failed");
            }
        }

        match connector.begin_login(tenant).await {
            Ok(LoginFlow::Connected {
                client,
                credentials,
            }) => {
                if let Err(e) = self.store.upsert_credentials(tenant, channel, &credentials).await
                {
                    warn!(tenant = %tenant, channel = %channel, error = %e, "persisting credentials failed");
                }
                self.install_connected(&mut state, &slot, tenant, channel, client);
                StartOutcome {
                    status: SessionStatus::Connected,
                    pairing: None,
                }
            }
            Ok(LoginFlow::Pairing {
                artifact,
                completion,
            }) => {
                *state = SlotState::Initializing {
                    artifact: Some(artifact.clone()),
                    started_at: Instant::now(),
                };
                self.spawn_pairing_completion(slot.clone(), tenant.clone(), channel, completion);
                StartOutcome {
                    status: SessionStatus::Initializing,
                    pairing: Some(artifact),
                }
            }
            Err(e) => {
                warn!(tenant = %tenant, channel = %channel, error = %e, "fresh login failed");
                *state = SlotState::Failed {
                    reason: e.to_string(),
                };
                StartOutcome {
                    status: SessionStatus::Error,
                    pairing: None,
                }
            }
        }
    }

    /// The cached pairing artifact, if a login is waiting on one. Absence is
    /// a normal state, not an error.
    pub async fn pairing_artifact(
        &self,
        tenant: &TenantId,
        channel: Channel,
    ) -> Option<PairingArtifact> {
        let slot = self.slot(tenant, channel);
        let state = slot.lock().await;
        match &*state {
            SlotState::Initializing {
                artifact,
                started_at,
            } if !self.pairing_expired(*started_at) => artifact.clone(),
            _ => None,
        }
    }

    /// Current status for one tenant x channel.
    pub async fn status(&self, tenant: &TenantId, channel: Channel) -> SessionStatus {
        let slot = self.slot(tenant, channel);
        let state = slot.lock().await;
        match &*state {
            SlotState::Connected { .. } => SessionStatus::Connected,
            SlotState::Initializing { started_at, .. } => {
                if self.pairing_expired(*started_at) {
                    SessionStatus::Error
                } else {
                    SessionStatus::Initializing
                }
            }
            SlotState::Failed { .. } => SessionStatus::Error,
            SlotState::Empty => SessionStatus::Disconnected,
        }
    }

    /// Tears down the live handle and marks the persisted row inactive.
    ///
    /// Idempotent. Transport errors during teardown are logged and swallowed;
    /// only storage failures propagate.
    pub async fn stop_session(
        &self,
        tenant: &TenantId,
        channel: Channel,
    ) -> Result<(), SendloopError> {
        let slot = self.slot(tenant, channel);
        {
            let mut state = slot.lock().await;
            let previous = std::mem::replace(&mut *state, SlotState::Empty);
            if let SlotState::Connected { client, event_task } = previous {
                event_task.abort();
                if let Err(e) = client.disconnect().await {
                    warn!(tenant = %tenant, channel = %channel, error = %e, "teardown error ignored");
                }
                info!(tenant = %tenant, channel = %channel, "session stopped");
            }
        }
        self.store.deactivate_session(tenant, channel).await
    }

    /// Returns the live handle, restoring one from persisted credentials if
    /// needed. `None` means "cannot send": no credentials, or restore failed.
    /// Never initiates a fresh interactive login.
    pub async fn get_or_restore(
        &self,
        tenant: &TenantId,
        channel: Channel,
    ) -> Option<Arc<dyn ChannelClient>> {
        let slot = self.slot(tenant, channel);
        let mut state = slot.lock().await;

        if let SlotState::Connected { client, .. } = &*state {
            return Some(client.clone());
        }

        let connector = self.connectors.get(&channel)?;
        let row = match self.store.get_session(tenant, channel).await {
            Ok(Some(row)) => row,
            Ok(None) => return None,
            Err(e) => {
                warn!(tenant = %tenant, channel = %channel, error = %e, "session lookup failed");
                return None;
            }
        };
        let credentials = row.credentials.as_deref()?;

        match self.try_restore(connector, tenant, channel, credentials).await {
            Ok(client) => {
                self.install_connected(&mut state, &slot, tenant, channel, client.clone());
                Some(client)
            }
            Err(e) => {
                debug!(tenant = %tenant, channel = %channel, error = %e, "one-shot restore failed");
                None
            }
        }
    }

    /// Best-effort reconnect of every persisted active session at boot.
    pub async fn restore_persisted(&self) {
        let rows = match self.store.list_active_sessions().await {
            Ok(rows) => rows,
            Err(e) => {
                warn!(error = %e, "listing active sessions failed");
                return;
            }
        };
        for row in rows {
            let Ok(channel) = row.channel.parse::<Channel>() else {
                warn!(channel = %row.channel, "unknown channel in session store");
                continue;
            };
            let tenant = TenantId(row.tenant_id);
            if self.get_or_restore(&tenant, channel).await.is_some() {
                info!(tenant = %tenant, channel = %channel, "session restored");
            }
        }
    }

    /// Tears down every live handle. Used on process shutdown; persisted
    /// rows stay active so sessions restore on the next boot.
    pub async fn shutdown(&self) {
        let keys: Vec<(TenantId, Channel)> =
            self.slots.iter().map(|e| e.key().clone()).collect();
        for (tenant, channel) in keys {
            let slot = self.slot(&tenant, channel);
            let mut state = slot.lock().await;
            let previous = std::mem::replace(&mut *state, SlotState::Empty);
            if let SlotState::Connected { client, event_task } = previous {
                event_task.abort();
                if let Err(e) = client.disconnect().await {
                    warn!(tenant = %tenant, channel = %channel, error = %e, "teardown error ignored");
                }
            }
        }
    }

    async fn try_restore(
        &self,
        connector: &Arc<dyn ChannelConnector>,
        tenant: &TenantId,
        channel: Channel,
        credentials: &str,
    ) -> Result<Arc<dyn ChannelClient>, SendloopError> {
        let timeout = Duration::from_secs(self.cfg.connect_timeout_secs);
        match tokio::time::timeout(timeout, connector.restore(tenant, credentials)).await {
            Ok(result) => result,
            Err(_) => Err(SendloopError::Timeout { duration: timeout }),
        }
    }

    fn install_connected(
        &self,
        state: &mut SlotState,
        slot: &Slot,
        tenant: &TenantId,
        channel: Channel,
        client: Arc<dyn ChannelClient>,
    ) {
        let event_task = spawn_event_loop(
            self.router.clone(),
            tenant.clone(),
            channel,
            client.clone(),
            slot.clone(),
        );
        *state = SlotState::Connected { client, event_task };
        info!(tenant = %tenant, channel = %channel, "session connected");
    }

    fn spawn_pairing_completion(
        &self,
        slot: Slot,
        tenant: TenantId,
        channel: Channel,
        completion: tokio::sync::oneshot::Receiver<
            Result<sendloop_core::PairingOutcome, SendloopError>,
        >,
    ) {
        let store = self.store.clone();
        let router = self.router.clone();
        tokio::spawn(async move {
            match completion.await {
                Ok(Ok(outcome)) => {
                    if let Err(e) = store
                        .upsert_credentials(&tenant, channel, &outcome.credentials)
                        .await
                    {
                        warn!(tenant = %tenant, channel = %channel, error = %e, "persisting credentials failed");
                    }
                    let mut state = slot.lock().await;
                    if matches!(&*state, SlotState::Initializing { .. }) {
                        let event_task = spawn_event_loop(
                            router,
                            tenant.clone(),
                            channel,
                            outcome.client.clone(),
                            slot.clone(),
                        );
                        *state = SlotState::Connected {
                            client: outcome.client,
                            event_task,
                        };
                        info!(tenant = %tenant, channel = %channel, "pairing completed, session connected");
                    } else {
                        // Stopped while pairing was in flight.
                        drop(state);
                        if let Err(e) = outcome.client.disconnect().await {
                            warn!(tenant = %tenant, channel = %channel, error = %e, "teardown error ignored");
                        }
                    }
                }
                Ok(Err(e)) => {
                    warn!(tenant = %tenant, channel = %channel, error = %e, "pairing failed");
                    let mut state = slot.lock().await;
                    if matches!(&*state, SlotState::Initializing { .. }) {
                        *state = SlotState::Failed {
                            reason: e.to_string(),
                        };
                    }
                }
                Err(_) => {
                    warn!(tenant = %tenant, channel = %channel, "login flow aborted by connector");
                    let mut state = slot.lock().await;
                    if matches!(&*state, SlotState::Initializing { .. }) {
                        *state = SlotState::Failed {
                            reason: "login flow aborted".to_string(),
                        };
                    }
                }
            }
        });
    }
}

/// Drains a live client's inbound events into the router until the stream
/// closes, then marks the slot failed so the next start can reconnect.
fn spawn_event_loop(
    router: Arc<InboundRouter>,
    tenant: TenantId,
    channel: Channel,
    client: Arc<dyn ChannelClient>,
    slot: Slot,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match client.next_event().await {
                Ok(event) => {
                    router
                        .handle_event(&tenant, channel, client.as_ref(), event)
                        .await;
                }
                Err(e) => {
                    debug!(tenant = %tenant, channel = %channel, error = %e, "inbound stream closed");
                    break;
                }
            }
        }
        let mut state = slot.lock().await;
        if let SlotState::Connected { client: current, .. } = &*state {
            if Arc::ptr_eq(current, &client) {
                *state = SlotState::Failed {
                    reason: "connection closed".to_string(),
                };
            }
        }
    })
}
