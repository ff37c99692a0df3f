// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait definitions for channel adapters and the AI completion seam.

pub mod channel;
pub mod completion;

pub use channel::{ChannelClient, ChannelConnector, LoginFlow, PairingOutcome};
pub use completion::CompletionProvider;
