// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, such as value ranges and non-empty paths.

use crate::diagnostic::ConfigError;
use crate::model::SendloopConfig;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &SendloopConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    if !(0.0..=1.0).contains(&config.router.match_threshold) {
        errors.push(ConfigError::Validation {
            message: format!(
                "router.match_threshold must be within 0.0..=1.0, got {}",
                config.router.match_threshold
            ),
        });
    }

    if config.router.ai_max_tokens == 0 {
        errors.push(ConfigError::Validation {
            message: "router.ai_max_tokens must be at least 1".to_string(),
        });
    }

    if config.router.fallback_reply.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "router.fallback_reply must not be empty".to_string(),
        });
    }

    if config.dispatcher.poll_interval_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "dispatcher.poll_interval_secs must be at least 1".to_string(),
        });
    }

    if let Some(cap) = config.dispatcher.default_daily_cap
        && cap == 0
    {
        errors.push(ConfigError::Validation {
            message: "dispatcher.default_daily_cap must be at least 1 when set".to_string(),
        });
    }

    if config.session.pairing_ttl_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "session.pairing_ttl_secs must be at least 1".to_string(),
        });
    }

    if config.whatsapp.api_base.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "whatsapp.api_base must not be empty".to_string(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_validates() {
        let config = SendloopConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = SendloopConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))));
    }

    #[test]
    fn out_of_range_threshold_fails_validation() {
        let mut config = SendloopConfig::default();
        config.router.match_threshold = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("match_threshold"))));
    }

    #[test]
    fn zero_poll_interval_fails_validation() {
        let mut config = SendloopConfig::default();
        config.dispatcher.poll_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("poll_interval_secs"))));
    }

    #[test]
    fn zero_daily_cap_fails_validation() {
        let mut config = SendloopConfig::default();
        config.dispatcher.default_daily_cap = Some(0);
        let errors = validate_config(&config).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains("default_daily_cap"))));
    }

    #[test]
    fn multiple_errors_are_collected() {
        let mut config = SendloopConfig::default();
        config.storage.database_path = "".to_string();
        config.router.match_threshold = -0.1;
        config.dispatcher.poll_interval_secs = 0;
        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 3);
    }
}
