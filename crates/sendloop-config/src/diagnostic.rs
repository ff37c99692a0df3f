// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Figment-to-miette error bridge with fuzzy match suggestions.
//!
//! Turns the figment errors produced by the loader into `ConfigError`
//! diagnostics: unknown keys get a "did you mean?" suggestion and a source
//! span pointing into whichever TOML layer the key came from.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use miette::{Diagnostic, NamedSource, SourceSpan};
use thiserror::Error;

/// Minimum Jaro-Winkler similarity score to suggest a correction.
/// 0.75 catches common typos like `match_treshold` -> `match_threshold`
/// while filtering noise.
const SUGGESTION_THRESHOLD: f64 = 0.75;

/// A configuration error with rich diagnostic information.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// An unknown key was found in the configuration.
    #[error("unknown configuration key `{key}`")]
    #[diagnostic(
        code(sendloop::config::unknown_key),
        help("{}", match suggestion {
            Some(s) => format!("did you mean `{s}`? Valid keys: {valid_keys}"),
            None => format!("valid keys: {valid_keys}"),
        })
    )]
    UnknownKey {
        /// The unrecognized key name.
        key: String,
        /// Suggested correction via fuzzy matching, if any.
        suggestion: Option<String>,
        /// Comma-separated valid keys for the section.
        valid_keys: String,
        #[label("this key is not recognized")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A configuration value has the wrong type.
    #[error("invalid type for key `{key}`: {detail}")]
    #[diagnostic(
        code(sendloop::config::invalid_type),
        help("expected {expected}")
    )]
    InvalidType {
        /// The key with the wrong type, as a dotted path.
        key: String,
        /// Description of the type mismatch.
        detail: String,
        /// What type was expected.
        expected: String,
        #[label("wrong type here")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A required configuration key is missing.
    #[error("missing required key `{key}`")]
    #[diagnostic(
        code(sendloop::config::missing_key),
        help("add `{key} = <value>` to your sendloop.toml")
    )]
    MissingKey { key: String },

    /// A validation error for a config value.
    #[error("validation error: {message}")]
    #[diagnostic(code(sendloop::config::validation))]
    Validation { message: String },

    /// Catch-all for other configuration errors.
    #[error("configuration error: {0}")]
    #[diagnostic(code(sendloop::config::other))]
    Other(String),
}

/// The TOML layers the loader read, as `(path, content)` pairs, used to
/// attach source spans to figment errors. Figment reports which file an
/// error came from but not where in it, so the offending key is located by
/// scanning the file's text.
struct TomlSources<'a>(&'a [(String, String)]);

impl TomlSources<'_> {
    /// Resolve a span and source attachment for `field` under `section`
    /// in the file the error was traced to. Returns `(None, None)` when
    /// the file is not one of ours or the key cannot be located.
    fn locate(
        &self,
        error: &figment::error::Error,
        section: &[String],
        field: &str,
    ) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
        let Some((path, content)) = self.file_for(error) else {
            return (None, None);
        };
        match key_offset(content, section.first().map(String::as_str), field) {
            Some(offset) => (
                Some(SourceSpan::new(offset.into(), field.len())),
                Some(NamedSource::new(path, content.to_string())),
            ),
            None => (None, None),
        }
    }

    fn file_for(&self, error: &figment::error::Error) -> Option<(&str, &str)> {
        let metadata = error.metadata.as_ref()?;
        let figment::Source::File(path) = metadata.source.as_ref()? else {
            return None;
        };
        let wanted = path.display().to_string();
        self.0
            .iter()
            .find(|(p, _)| *p == wanted)
            .map(|(p, c)| (p.as_str(), c.as_str()))
    }
}

/// Convert a `figment::Error` into a list of `ConfigError` diagnostics.
///
/// A figment error can hold several underlying errors (one per bad key);
/// each becomes its own diagnostic so a single run reports everything.
pub fn figment_to_config_errors(
    err: figment::Error,
    toml_sources: &[(String, String)],
) -> Vec<ConfigError> {
    let sources = TomlSources(toml_sources);
    err.into_iter()
        .map(|error| convert_one(error, &sources))
        .collect()
}

fn convert_one(error: figment::error::Error, sources: &TomlSources<'_>) -> ConfigError {
    use figment::error::Kind;

    let path: Vec<String> = error.path.iter().map(|s| s.to_string()).collect();

    match &error.kind {
        Kind::UnknownField(field, expected) => {
            let valid: Vec<&str> = expected.to_vec();
            let (span, src) = sources.locate(&error, &path, field);
            ConfigError::UnknownKey {
                key: field.clone(),
                suggestion: suggest_key(field, &valid),
                valid_keys: valid.join(", "),
                span,
                src,
            }
        }
        Kind::MissingField(field) => ConfigError::MissingKey {
            key: field.clone().into_owned(),
        },
        Kind::InvalidType(actual, expected) => {
            // For type errors the path includes the field itself, so the
            // section is everything before the last segment.
            let (span, src) = match path.split_last() {
                Some((field, section)) => sources.locate(&error, section, field),
                None => (None, None),
            };
            ConfigError::InvalidType {
                key: path.join("."),
                detail: format!("found {actual}, expected {expected}"),
                expected: expected.to_string(),
                span,
                src,
            }
        }
        _ => ConfigError::Other(format!("{error}")),
    }
}

/// Byte offset of `field` within `section` of a TOML document.
///
/// Walks the document line by line tracking the current `[section]` header;
/// `field` only matches inside the requested section, so a key with the same
/// name in a later section is never picked up. `section = None` matches
/// top-level keys before the first header.
fn key_offset(content: &str, section: Option<&str>, field: &str) -> Option<usize> {
    let mut offset = 0;
    let mut current: Option<&str> = None;

    for line in content.lines() {
        let trimmed = line.trim_start();
        if let Some(header) = trimmed.strip_prefix('[') {
            current = header.split(']').next();
        } else if current == section {
            if let Some(rest) = trimmed.strip_prefix(field) {
                if matches!(rest.chars().next(), Some(' ' | '\t' | '=')) {
                    return Some(offset + (line.len() - trimmed.len()));
                }
            }
        }
        offset += line.len() + 1; // +1 for newline
    }

    None
}

/// Suggest the closest valid key by Jaro-Winkler similarity, or `None`
/// when nothing scores above the threshold.
fn suggest_key(unknown: &str, valid_keys: &[&str]) -> Option<String> {
    valid_keys
        .iter()
        .map(|key| (strsim::jaro_winkler(unknown, key), *key))
        .filter(|(score, _)| *score > SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, key)| key.to_string())
}

/// Render diagnostics to stderr using miette's graphical handler.
pub fn render_errors(errors: &[ConfigError]) {
    use miette::GraphicalReportHandler;

    let handler = GraphicalReportHandler::new();
    let mut out = String::new();
    for error in errors {
        if handler
            .render_report(&mut out, error as &dyn Diagnostic)
            .is_err()
        {
            out.push_str(&format!("Error: {error}\n"));
        }
    }
    eprint!("{out}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suggest_treshold_for_threshold() {
        let valid = &["match_threshold", "reply_delay_secs", "fallback_reply"];
        assert_eq!(
            suggest_key("match_treshold", valid),
            Some("match_threshold".to_string())
        );
    }

    #[test]
    fn suggest_picks_closest_of_several_candidates() {
        let valid = &["poll_interval_secs", "poll_batch_size"];
        assert_eq!(
            suggest_key("poll_interval_sec", valid),
            Some("poll_interval_secs".to_string())
        );
    }

    #[test]
    fn no_suggestion_for_distant_typo() {
        let valid = &["match_threshold", "reply_delay_secs"];
        assert_eq!(suggest_key("zzzzzz", valid), None);
    }

    #[test]
    fn key_offset_in_section() {
        let content = "[router]\nmatch_treshold = 0.9\n";
        let offset = key_offset(content, Some("router"), "match_treshold");
        assert!(offset.is_some());
        let o = offset.unwrap();
        assert_eq!(&content[o..o + 14], "match_treshold");
    }

    #[test]
    fn key_offset_skips_same_name_in_other_section() {
        let content = "[storage]\nlimit = 1\n\n[dispatcher]\nlimit = 2\n";
        let offset = key_offset(content, Some("dispatcher"), "limit").unwrap();
        assert_eq!(&content[offset..offset + 9], "limit = 2");
    }

    #[test]
    fn key_offset_for_top_level_key() {
        let content = "stray = true\n\n[router]\nstray = false\n";
        let offset = key_offset(content, None, "stray").unwrap();
        assert_eq!(offset, 0);
    }

    #[test]
    fn key_offset_misses_absent_section() {
        let content = "[router]\nmatch_threshold = 0.9\n";
        assert!(key_offset(content, Some("session"), "match_threshold").is_none());
    }
}
