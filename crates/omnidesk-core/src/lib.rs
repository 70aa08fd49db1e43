// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Omnidesk contact-center router.
//!
//! This crate provides the error type, domain types and the adapter traits
//! that messaging channels, storage and telephony collaborators implement.

pub mod error;
pub mod identity;
pub mod traits;
pub mod types;

pub use error::OmnideskError;
pub use identity::conversation_id;
pub use types::{
    ActionOutcome, AdapterType, AgentProfile, AgentRecord, CallRecord, ChannelType, Contact,
    Conversation, ConversationState, HealthStatus, InboundEvent, ManagerEvent, Message,
    MessageKind, MessageStatus, SenderIdentity, SlotEpoch,
};

pub use traits::{
    ChannelAdapter, ManagerActions, PluginAdapter, StorageAdapter, TelephonyConnector,
    TelephonySession,
};
