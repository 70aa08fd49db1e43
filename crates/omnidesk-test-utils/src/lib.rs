// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Omnidesk integration tests.
//!
//! Provides mock adapters and a desk harness for fast, deterministic tests
//! without provider accounts or a PBX.
//!
//! # Components
//!
//! - [`MockChannel`] - Channel adapter with a JSON test payload and captured sends
//! - [`MockConnector`] - Scripted telephony sessions and recorded manager actions
//! - [`TestDesk`] - Routing engine over a temp SQLite database with seeded agents

pub mod harness;
pub mod mock_channel;
pub mod mock_telephony;

pub use harness::{AgentClient, TestDesk, TestDeskBuilder};
pub use mock_channel::{MockChannel, SentMessage};
pub use mock_telephony::{MockActions, MockConnector, SessionControl};
