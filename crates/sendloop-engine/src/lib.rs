// SPDX-FileCopyrightText: 2026 Sendloop Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The Sendloop engine: session lifecycle, inbound routing, and dispatch.
//!
//! Written once against the channel adapter traits in `sendloop-core`; each
//! concrete channel (WhatsApp Cloud API, Telegram bot) only implements the
//! adapter. Components:
//!
//! - [`SessionManager`] - in-memory map of live client handles, login/restore
//! - [`InboundRouter`] - knowledge-base match, AI fallback, auto-reply
//! - [`OutboundDispatcher`] - throttled immediate sends
//! - [`ScheduleDispatcher`] - polling loop claiming and running due jobs
//! - [`planner`] - job creation: timezone resolution and daily-cap fan-out

pub mod outbound;
pub mod planner;
pub mod router;
pub mod scheduler;
pub mod session;

pub use outbound::OutboundDispatcher;
pub use planner::{JobRequest, JobTarget};
pub use router::InboundRouter;
pub use scheduler::ScheduleDispatcher;
pub use session::{SessionManager, StartOutcome};
