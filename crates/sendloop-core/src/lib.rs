// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Sendloop tenant messaging engine.
//!
//! This crate provides the foundational trait definitions, error types, and
//! common types used throughout the Sendloop workspace. Channel adapters and
//! the AI provider implement traits defined here; the engine crate is
//! written once against those traits.

pub mod error;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::SendloopError;
pub use traits::{ChannelClient, ChannelConnector, CompletionProvider, LoginFlow, PairingOutcome};
pub use types::{
    BatchSummary, Channel, ChatType, Direction, InboundEvent, JobKind, JobStatus, MediaKind,
    MediaPayload, PairingArtifact, PairingKind, ResponseSource, SendFailure, SessionStatus,
    TenantId,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn traits_are_object_safe() {
        // The engine stores adapters as trait objects; this won't compile
        // if object safety regresses.
        fn _client(_: std::sync::Arc<dyn ChannelClient>) {}
        fn _connector(_: std::sync::Arc<dyn ChannelConnector>) {}
        fn _completer(_: std::sync::Arc<dyn CompletionProvider>) {}
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SendloopError>();
    }
}
