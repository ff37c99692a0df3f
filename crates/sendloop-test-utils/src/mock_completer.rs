// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider with a scripted reply and failure switch.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use sendloop_core::{CompletionProvider, SendloopError};
use tokio::sync::Mutex;

/// `CompletionProvider` returning a canned reply, with call accounting.
pub struct MockCompleter {
    reply: Mutex<String>,
    fail: AtomicBool,
    calls: AtomicUsize,
    last_prompt: Mutex<Option<String>>,
}

impl MockCompleter {
    pub fn new(reply: &str) -> Self {
        Self {
            reply: Mutex::new(reply.to_string()),
            fail: AtomicBool::new(false),
            calls: AtomicUsize::new(0),
            last_prompt: Mutex::new(None),
        }
    }

    pub async fn set_reply(&self, reply: &str) {
        *self.reply.lock().await = reply.to_string();
    }

    /// Script every `complete` call to fail.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// How many times `complete` has been called.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// The most recent prompt passed to `complete`.
    pub async fn last_prompt(&self) -> Option<String> {
        self.last_prompt.lock().await.clone()
    }
}

#[async_trait]
impl CompletionProvider for MockCompleter {
    async fn complete(&self, prompt: &str, _max_tokens: u32) -> Result<String, SendloopError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_prompt.lock().await = Some(prompt.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(SendloopError::Provider {
                message: "mock completion failure".into(),
                source: None,
            });
        }
        Ok(self.reply.lock().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_scripted_reply_and_counts_calls() {
        let completer = MockCompleter::new("canned answer");
        let reply = completer.complete("what is pricing?", 128).await.unwrap();
        assert_eq!(reply, "canned answer");
        assert_eq!(completer.call_count(), 1);
        assert_eq!(
            completer.last_prompt().await.as_deref(),
            Some("what is pricing?")
        );

        completer.set_fail(true);
        assert!(completer.complete("again", 128).await.is_err());
        assert_eq!(completer.call_count(), 2);
    }
}
