// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Omnidesk routing core.

use thiserror::Error;

/// The primary error type shared by every Omnidesk crate.
#[derive(Debug, Error)]
pub enum OmnideskError {
    /// Configuration errors (invalid TOML, missing fields, failed validation).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database open, migration, query failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Channel adapter errors (outbound delivery failure, provider rejection).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// An inbound payload could not be understood.
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    /// No channel is registered for the requested webhook prefix.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// Transport failure on the PBX manager connection.
    #[error("telephony error: {message}")]
    Telephony {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The PBX manager refused the login.
    #[error("telephony login failed: {0}")]
    TelephonyLogin(String),

    /// Agent credentials did not match.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// A referenced agent, conversation or contact does not exist.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// The operation is not valid in the current state.
    #[error("rejected: {0}")]
    Rejected(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl OmnideskError {
    /// Wraps any error as a storage failure.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Builds a channel error without an underlying source.
    pub fn channel(message: impl Into<String>) -> Self {
        Self::Channel {
            message: message.into(),
            source: None,
        }
    }

    /// Builds a telephony transport error without an underlying source.
    pub fn telephony(message: impl Into<String>) -> Self {
        Self::Telephony {
            message: message.into(),
            source: None,
        }
    }

    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Returns true for failures of the PBX transport that warrant a reconnect.
    pub fn is_telephony_transport(&self) -> bool {
        matches!(self, Self::Telephony { .. })
    }
}
