// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock channel connector for session manager tests.
//!
//! Supports three scripted login behaviors: refuse (token-credential
//! channels), connect immediately, or hand out a pairing artifact whose
//! completion the test drives via `complete_pairing` / `fail_pairing`.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sendloop_core::{
    Channel, ChannelClient, ChannelConnector, LoginFlow, PairingArtifact, PairingKind,
    PairingOutcome, SendloopError, TenantId,
};
use tokio::sync::{oneshot, Mutex};

use crate::mock_client::MockClient;

/// Scripted behavior for `begin_login`.
pub enum LoginScript {
    /// Refuse with a `Config` error, like token-credential channels do.
    Refused(String),
    /// Connect immediately without pairing.
    Immediate {
        client: Arc<MockClient>,
        credentials: String,
    },
    /// Hand out a QR artifact; the test resolves it later.
    Pairing { artifact_data: String },
}

/// A mock connector with scriptable restore and login behavior.
pub struct MockConnector {
    channel: Channel,
    restore_client: Mutex<Option<Arc<MockClient>>>,
    login: Mutex<LoginScript>,
    pending: Mutex<Option<oneshot::Sender<Result<PairingOutcome, SendloopError>>>>,
    restore_calls: AtomicUsize,
    login_calls: AtomicUsize,
    restored_credentials: Mutex<Vec<String>>,
}

impl MockConnector {
    pub fn new(channel: Channel) -> Arc<Self> {
        Arc::new(Self {
            channel,
            restore_client: Mutex::new(None),
            login: Mutex::new(LoginScript::Refused(
                "no login scripted for mock connector".to_string(),
            )),
            pending: Mutex::new(None),
            restore_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            restored_credentials: Mutex::new(Vec::new()),
        })
    }

    /// Script `restore` to succeed with this client. `None` makes it fail.
    pub async fn set_restore_client(&self, client: Option<Arc<MockClient>>) {
        *self.restore_client.lock().await = client;
    }

    /// Script the `begin_login` behavior.
    pub async fn set_login(&self, script: LoginScript) {
        *self.login.lock().await = script;
    }

    /// How many times `restore` has been called.
    pub fn restore_count(&self) -> usize {
        self.restore_calls.load(Ordering::SeqCst)
    }

    /// How many times `begin_login` has been called.
    pub fn login_count(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    /// Credentials passed to `restore`, in order.
    pub async fn restored_credentials(&self) -> Vec<String> {
        self.restored_credentials.lock().await.clone()
    }

    /// Resolve an outstanding pairing flow successfully.
    ///
    /// Panics if no pairing is in flight (a test bug).
    pub async fn complete_pairing(&self, client: Arc<MockClient>, credentials: &str) {
        let sender = self
            .pending
            .lock()
            .await
            .take()
            .expect("no pairing in flight");
        let _ = sender.send(Ok(PairingOutcome {
            client,
            credentials: credentials.to_string(),
        }));
    }

    /// Resolve an outstanding pairing flow with an error.
    pub async fn fail_pairing(&self, reason: &str) {
        let sender = self
            .pending
            .lock()
            .await
            .take()
            .expect("no pairing in flight");
        let _ = sender.send(Err(SendloopError::Channel {
            message: reason.to_string(),
            source: None,
        }));
    }
}

#[async_trait]
impl ChannelConnector for MockConnector {
    fn channel(&self) -> Channel {
        self.channel
    }

    async fn restore(
        &self,
        _tenant: &TenantId,
        credentials: &str,
    ) -> Result<Arc<dyn ChannelClient>, SendloopError> {
        self.restore_calls.fetch_add(1, Ordering::SeqCst);
        self.restored_credentials
            .lock()
            .await
            .push(credentials.to_string());
        match self.restore_client.lock().await.as_ref() {
            Some(client) => Ok(client.clone()),
            None => Err(SendloopError::Channel {
                message: "mock restore failure".into(),
                source: None,
            }),
        }
    }

    async fn begin_login(&self, _tenant: &TenantId) -> Result<LoginFlow, SendloopError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.login.lock().await {
            LoginScript::Refused(message) => Err(SendloopError::Config(message.clone())),
            LoginScript::Immediate {
                client,
                credentials,
            } => Ok(LoginFlow::Connected {
                client: client.clone(),
                credentials: credentials.clone(),
            }),
            LoginScript::Pairing { artifact_data } => {
                let (tx, rx) = oneshot::channel();
                *self.pending.lock().await = Some(tx);
                Ok(LoginFlow::Pairing {
                    artifact: PairingArtifact {
                        kind: PairingKind::QrCode,
                        data: artifact_data.clone(),
                        issued_at: Utc::now(),
                    },
                    completion: rx,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn restore_uses_scripted_client() {
        let connector = MockConnector::new(Channel::Whatsapp);
        let tenant = TenantId::from("acme");

        assert!(connector.restore(&tenant, "creds").await.is_err());

        let client = MockClient::new(Channel::Whatsapp);
        connector.set_restore_client(Some(client)).await;
        assert!(connector.restore(&tenant, "creds").await.is_ok());

        assert_eq!(connector.restore_count(), 2);
        assert_eq!(connector.restored_credentials().await, vec!["creds", "creds"]);
    }

    #[tokio::test]
    async fn pairing_flow_resolves_through_completion() {
        let connector = MockConnector::new(Channel::Whatsapp);
        connector
            .set_login(LoginScript::Pairing {
                artifact_data: "qr-payload".to_string(),
            })
            .await;

        let flow = connector
            .begin_login(&TenantId::from("acme"))
            .await
            .unwrap();
        let LoginFlow::Pairing { artifact, completion } = flow else {
            panic!("expected pairing flow");
        };
        assert_eq!(artifact.data, "qr-payload");

        let client = MockClient::new(Channel::Whatsapp);
        connector.complete_pairing(client, "fresh-creds").await;

        let outcome = completion.await.unwrap().unwrap();
        assert_eq!(outcome.credentials, "fresh-creds");
    }
}
