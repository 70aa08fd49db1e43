// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic conversation identity.

use sha2::{Digest, Sha256};

use crate::types::ChannelType;

/// Derives the conversation id for a sender on a channel.
///
/// `epoch` counts how many conversations for this `(channel, external_id)`
/// slot have already finished; bumping it after a finish yields a fresh id
/// while the live slot keeps a stable one.
pub fn conversation_id(channel: ChannelType, external_id: &str, epoch: u64) -> String {
    let mut hasher = Sha256::new();
    hasher.update(channel.to_string().as_bytes());
    hasher.update(b":");
    hasher.update(external_id.as_bytes());
    hasher.update(b":");
    hasher.update(epoch.to_be_bytes());
    hex::encode(&hasher.finalize()[..16])
}
