// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Routing core for Omnidesk.
//!
//! Owns the conversation lifecycle (`Queued → Assigned → Finished`), the FIFO
//! waiting queue, agent presence and capacity, settle-delay rechecks, and the
//! bridges that feed webhook payloads and PBX events into one serialized
//! state.

pub mod directory;
pub mod dispatcher;
pub mod engine;
pub mod events;
pub mod queue;
pub mod registry;
pub mod scheduler;
pub mod session;
pub mod store;
pub mod telephony;

pub use dispatcher::{ChannelDispatcher, DispatchOutcome};
pub use engine::{
    AgentStatus, CustomerHistory, DeskSnapshot, IngestOutcome, LoginSnapshot, RestoreSummary,
    RoutingEngine, RoutingSettings,
};
pub use events::PushEvent;
pub use registry::Presence;
pub use session::{ConnectionId, SessionHandle};
pub use telephony::TelephonyBridge;
