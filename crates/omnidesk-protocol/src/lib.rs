// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent session protocol for Omnidesk.
//!
//! Agents hold one long-lived TCP connection carrying newline-delimited
//! JSON. Each line from the agent is a command tagged by `action`; the
//! server answers on the same connection and interleaves push events
//! (`event_*`) produced by the routing engine.

pub mod codec;
pub mod handler;
pub mod server;

pub use codec::{Command, ProtocolError, Reply};
pub use handler::CommandHandler;
pub use server::{serve, start_server};
