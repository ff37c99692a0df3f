// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./sendloop.toml` > `~/.config/sendloop/sendloop.toml`
//! > `/etc/sendloop/sendloop.toml` with environment variable overrides via the
//! `SENDLOOP_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::SendloopConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/sendloop/sendloop.toml` (system-wide)
/// 3. `~/.config/sendloop/sendloop.toml` (user XDG config)
/// 4. `./sendloop.toml` (local directory)
/// 5. `SENDLOOP_*` environment variables
pub fn load_config() -> Result<SendloopConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SendloopConfig::default()))
        .merge(Toml::file("/etc/sendloop/sendloop.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("sendloop/sendloop.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("sendloop.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<SendloopConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SendloopConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<SendloopConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(SendloopConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names. `SENDLOOP_ROUTER_MATCH_THRESHOLD` must map
/// to `router.match_threshold`, not `router.match.threshold`.
fn env_provider() -> Env {
    Env::prefixed("SENDLOOP_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("engine_", "engine.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("session_", "session.", 1)
            .replacen("router_", "router.", 1)
            .replacen("dispatcher_", "dispatcher.", 1)
            .replacen("anthropic_", "anthropic.", 1)
            .replacen("whatsapp_", "whatsapp.", 1);
        mapped.into()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_string_yields_defaults() {
        let config = load_config_from_str("").unwrap();
        assert_eq!(config.engine.log_level, "info");
    }

    #[test]
    fn toml_string_overrides_defaults() {
        let config = load_config_from_str(
            r#"
[engine]
log_level = "debug"

[dispatcher]
poll_interval_secs = 5
"#,
        )
        .unwrap();
        assert_eq!(config.engine.log_level, "debug");
        assert_eq!(config.dispatcher.poll_interval_secs, 5);
    }
}
