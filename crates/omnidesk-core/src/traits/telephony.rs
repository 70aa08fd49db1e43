// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Telephony connector trait for PBX manager interfaces.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::OmnideskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ActionOutcome, ManagerEvent};

/// Issues manager actions on a live PBX session.
#[async_trait]
pub trait ManagerActions: Send + Sync + 'static {
    /// Runs `name` with the given parameters and waits for its response.
    async fn action(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<ActionOutcome, OmnideskError>;
}

/// A logged-in, event-subscribed manager session.
///
/// Transport failures are delivered on `errors`; a closed `events` channel
/// also means the session is gone.
pub struct TelephonySession {
    pub actions: Arc<dyn ManagerActions>,
    pub events: mpsc::Receiver<ManagerEvent>,
    pub errors: mpsc::Receiver<OmnideskError>,
}

impl std::fmt::Debug for TelephonySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelephonySession").finish_non_exhaustive()
    }
}

/// Opens manager sessions against a configured PBX.
#[async_trait]
pub trait TelephonyConnector: PluginAdapter {
    /// Connects, logs in and subscribes to events.
    ///
    /// Returns [`OmnideskError::TelephonyLogin`] when credentials are refused
    /// and [`OmnideskError::Telephony`] for transport failures.
    async fn connect(&self) -> Result<TelephonySession, OmnideskError>;
}
