// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed query modules, one per table.

pub mod chat_log;
pub mod jobs;
pub mod knowledge;
pub mod sessions;
