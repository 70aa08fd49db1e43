// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Asterisk manager interface client for Omnidesk.
//!
//! Opens a TCP session to the PBX, logs in, subscribes to events and
//! exposes the session as a [`TelephonySession`](omnidesk_core::TelephonySession):
//! manager events and transport failures arrive on channels, actions are
//! correlated to their responses by `ActionID`.

pub mod client;
pub mod packet;

pub use client::{AmiActions, AmiConnector};
