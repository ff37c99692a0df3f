// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Sendloop messaging engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Sendloop configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SendloopConfig {
    /// Engine-wide settings (logging).
    #[serde(default)]
    pub engine: EngineConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Session manager settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Inbound router settings (knowledge match + AI fallback).
    #[serde(default)]
    pub router: RouterConfig,

    /// Outbound and schedule dispatcher settings.
    #[serde(default)]
    pub dispatcher: DispatcherConfig,

    /// Anthropic API settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// WhatsApp Cloud API settings.
    #[serde(default)]
    pub whatsapp: WhatsappConfig,
}

/// Engine-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL journal mode (recommended).
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("sendloop/sendloop.db").display().to_string())
        .unwrap_or_else(|| "sendloop.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

/// Session manager configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SessionConfig {
    /// How long a QR/pairing artifact stays valid before the session is
    /// considered failed, in seconds.
    #[serde(default = "default_pairing_ttl_secs")]
    pub pairing_ttl_secs: u64,

    /// Timeout for restoring a session from stored credentials, in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            pairing_ttl_secs: default_pairing_ttl_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

fn default_pairing_ttl_secs() -> u64 {
    120
}

fn default_connect_timeout_secs() -> u64 {
    30
}

/// Inbound router configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RouterConfig {
    /// Minimum fuzzy similarity score for a knowledge-base hit, 0.0..=1.0.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Delay before sending an auto-reply, in seconds. Makes replies look
    /// less machine-gun to the person on the other end.
    #[serde(default = "default_reply_delay_secs")]
    pub reply_delay_secs: u64,

    /// Timeout for the AI completion call, in seconds.
    #[serde(default = "default_ai_timeout_secs")]
    pub ai_timeout_secs: u64,

    /// Maximum tokens for AI-generated replies.
    #[serde(default = "default_ai_max_tokens")]
    pub ai_max_tokens: u32,

    /// Reply sent when neither the knowledge base nor the AI produced one.
    #[serde(default = "default_fallback_reply")]
    pub fallback_reply: String,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            reply_delay_secs: default_reply_delay_secs(),
            ai_timeout_secs: default_ai_timeout_secs(),
            ai_max_tokens: default_ai_max_tokens(),
            fallback_reply: default_fallback_reply(),
        }
    }
}

fn default_match_threshold() -> f64 {
    0.84
}

fn default_reply_delay_secs() -> u64 {
    2
}

fn default_ai_timeout_secs() -> u64 {
    30
}

fn default_ai_max_tokens() -> u32 {
    512
}

fn default_fallback_reply() -> String {
    "Sorry, I couldn't process your message right now. A human will get back to you shortly."
        .to_string()
}

/// Outbound and schedule dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatcherConfig {
    /// How often the schedule dispatcher polls for due jobs, in seconds.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Default delay between consecutive recipients in a batch, in
    /// milliseconds. Used when a job does not specify its own.
    #[serde(default = "default_per_recipient_delay_ms")]
    pub default_per_recipient_delay_ms: u64,

    /// Default daily recipient cap for scheduled fan-out. `None` means no cap.
    #[serde(default)]
    pub default_daily_cap: Option<u32>,

    /// Timeout for a single outbound send, in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            default_per_recipient_delay_ms: default_per_recipient_delay_ms(),
            default_daily_cap: None,
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    15
}

fn default_per_recipient_delay_ms() -> u64 {
    3000
}

fn default_send_timeout_secs() -> u64 {
    30
}

/// Anthropic API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AnthropicConfig {
    /// Anthropic API key. `None` requires the `ANTHROPIC_API_KEY` environment
    /// variable at startup.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Model used for auto-reply completions.
    #[serde(default = "default_model")]
    pub model: String,

    /// Anthropic API version string.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_anthropic_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            api_version: default_api_version(),
            timeout_secs: default_anthropic_timeout_secs(),
        }
    }
}

fn default_model() -> String {
    "claude-haiku-4-5-20250901".to_string()
}

fn default_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_anthropic_timeout_secs() -> u64 {
    60
}

/// WhatsApp Cloud API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsappConfig {
    /// Graph API base URL.
    #[serde(default = "default_whatsapp_api_base")]
    pub api_base: String,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_whatsapp_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WhatsappConfig {
    fn default() -> Self {
        Self {
            api_base: default_whatsapp_api_base(),
            timeout_secs: default_whatsapp_timeout_secs(),
        }
    }
}

fn default_whatsapp_api_base() -> String {
    "https://graph.facebook.com/v19.0".to_string()
}

fn default_whatsapp_timeout_secs() -> u64 {
    30
}
