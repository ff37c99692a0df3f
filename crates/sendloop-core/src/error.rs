// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Sendloop dispatch engine.

use thiserror::Error;

/// The primary error type used across all Sendloop crates.
///
/// Every external call site (channel transport, AI provider, storage, file
/// I/O) is wrapped and converted into one of these categories at the point
/// of failure. Nothing in the engine relies on string-matching error text.
#[derive(Debug, Error)]
pub enum SendloopError {
    /// Configuration errors (invalid TOML, missing required fields, out-of-range values).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel transport errors (connection failure, send rejected, invalid recipient).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// AI completion provider errors (API failure, quota, malformed response).
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Session teardown failed. Always caught and logged by the session
    /// manager; never propagated to callers of `stop_session`.
    #[error("teardown error on {channel}: {source}")]
    Teardown {
        channel: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Scheduled-job errors (empty target list, malformed stored payload,
    /// illegal status transition).
    #[error("schedule error: {0}")]
    Schedule(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_includes_context() {
        let err = SendloopError::Channel {
            message: "send rejected".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "channel error: send rejected");

        let err = SendloopError::Teardown {
            channel: "telegram-bot".into(),
            source: Box::new(std::io::Error::other("socket closed")),
        };
        assert!(err.to_string().contains("telegram-bot"));
    }

    #[test]
    fn all_variants_constructible() {
        let _ = SendloopError::Config("bad".into());
        let _ = SendloopError::Storage {
            source: Box::new(std::io::Error::other("x")),
        };
        let _ = SendloopError::Provider {
            message: "quota".into(),
            source: None,
        };
        let _ = SendloopError::Schedule("empty target list".into());
        let _ = SendloopError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _ = SendloopError::Internal("x".into());
    }
}
