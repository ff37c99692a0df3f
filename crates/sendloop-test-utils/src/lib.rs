// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Sendloop integration tests.
//!
//! Provides mock channel and provider implementations for fast,
//! deterministic, CI-runnable tests without external services.
//!
//! # Components
//!
//! - [`MockClient`] - mock channel client with event injection and send capture
//! - [`MockConnector`] - mock connector with scriptable restore/login flows
//! - [`MockCompleter`] - mock completion provider with a failure switch

pub mod mock_client;
pub mod mock_completer;
pub mod mock_connector;

pub use mock_client::{MockClient, SentRecord};
pub use mock_completer::MockCompleter;
pub use mock_connector::{LoginScript, MockConnector};
