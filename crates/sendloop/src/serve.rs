// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `sendloop serve` command implementation.
//!
//! Wires the engine together: SQLite storage, the Anthropic completion
//! provider, the WhatsApp Cloud API and Telegram bot connectors, the session
//! manager with its inbound router, and the schedule dispatcher loop.
//! Supports graceful shutdown via signal handlers.

use std::sync::Arc;

use sendloop_anthropic::AnthropicCompleter;
use sendloop_config::model::SendloopConfig;
use sendloop_core::{ChannelConnector, CompletionProvider, SendloopError};
use sendloop_engine::{InboundRouter, ScheduleDispatcher, SessionManager};
use sendloop_storage::Store;
use sendloop_telegram::TelegramBotConnector;
use sendloop_whatsapp::WhatsappConnector;
use tracing::info;

use crate::shutdown;

/// Runs the `sendloop serve` command.
pub async fn run_serve(config: SendloopConfig) -> Result<(), SendloopError> {
    init_tracing(&config.engine.log_level);

    info!("starting sendloop serve");

    let store =
        Store::open_with(&config.storage.database_path, config.storage.wal_mode).await?;

    // Crash recovery: jobs left running by a previous process are terminal.
    let recovered = store.recover_interrupted_jobs().await?;
    if recovered > 0 {
        info!(jobs = recovered, "interrupted jobs marked failed");
    }

    let completer: Arc<dyn CompletionProvider> =
        Arc::new(AnthropicCompleter::from_config(&config.anthropic)?);
    let router = InboundRouter::new(store.clone(), completer, config.router.clone());

    let connectors: Vec<Arc<dyn ChannelConnector>> = vec![
        Arc::new(TelegramBotConnector::new()),
        Arc::new(WhatsappConnector::new(config.whatsapp.clone())),
    ];
    let sessions = SessionManager::new(
        store.clone(),
        connectors,
        router,
        config.session.clone(),
    );

    // Reconnect every tenant that was active before the restart.
    sessions.restore_persisted().await;

    let cancel = shutdown::install_signal_handler();

    let scheduler = ScheduleDispatcher::new(
        store.clone(),
        sessions.clone(),
        config.dispatcher.clone(),
    );
    info!(
        poll_interval_secs = config.dispatcher.poll_interval_secs,
        "schedule dispatcher starting"
    );
    scheduler.run(cancel).await;

    sessions.shutdown().await;
    store.close().await?;

    info!("sendloop serve shutdown complete");
    Ok(())
}

fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sendloop={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
