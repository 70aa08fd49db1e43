// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Scripted telephony connector.
//!
//! Each `connect()` pops the next scripted result. Tests keep a
//! [`SessionControl`] to feed manager events and transport errors into the
//! session they scripted.

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};

use omnidesk_core::{
    ActionOutcome, AdapterType, HealthStatus, ManagerActions, ManagerEvent, OmnideskError,
    PluginAdapter, TelephonyConnector, TelephonySession,
};

/// A recorded manager action: name plus parameters in call order.
pub type RecordedAction = (String, Vec<(String, String)>);

/// Records actions and refuses the ones marked with [`MockActions::refuse`].
#[derive(Default)]
pub struct MockActions {
    recorded: Mutex<Vec<RecordedAction>>,
    refused: Mutex<HashSet<String>>,
}

impl MockActions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later `name` action come back with `ok = false`.
    pub async fn refuse(&self, name: &str) {
        self.refused.lock().await.insert(name.to_string());
    }

    pub async fn recorded(&self) -> Vec<RecordedAction> {
        self.recorded.lock().await.clone()
    }

    pub async fn names(&self) -> Vec<String> {
        self.recorded
            .lock()
            .await
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl ManagerActions for MockActions {
    async fn action(
        &self,
        name: &str,
        params: &[(&str, &str)],
    ) -> Result<ActionOutcome, OmnideskError> {
        self.recorded.lock().await.push((
            name.to_string(),
            params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        ));
        if self.refused.lock().await.contains(name) {
            return Ok(ActionOutcome {
                ok: false,
                status: "Permission denied".to_string(),
            });
        }
        Ok(ActionOutcome {
            ok: true,
            status: "Success".to_string(),
        })
    }
}

/// Test-side ends of one scripted session.
pub struct SessionControl {
    pub actions: Arc<MockActions>,
    pub events: mpsc::Sender<ManagerEvent>,
    pub errors: mpsc::Sender<OmnideskError>,
}

impl SessionControl {
    pub async fn emit(&self, name: &str, fields: &[(&str, &str)]) {
        let event = ManagerEvent::new(name, fields.iter().copied());
        // A closed receiver means the bridge already dropped the session.
        let _ = self.events.send(event).await;
    }

    pub async fn fail(&self, reason: &str) {
        let _ = self.errors.send(OmnideskError::telephony(reason)).await;
    }
}

#[derive(Default)]
pub struct MockConnector {
    script: Mutex<VecDeque<Result<TelephonySession, OmnideskError>>>,
    attempts: AtomicUsize,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a successful connect and returns its control ends.
    pub async fn push_session(&self) -> SessionControl {
        let actions = Arc::new(MockActions::new());
        let (event_tx, event_rx) = mpsc::channel(64);
        let (error_tx, error_rx) = mpsc::channel(8);
        self.script.lock().await.push_back(Ok(TelephonySession {
            actions: Arc::clone(&actions) as Arc<dyn ManagerActions>,
            events: event_rx,
            errors: error_rx,
        }));
        SessionControl {
            actions,
            events: event_tx,
            errors: error_tx,
        }
    }

    /// Scripts a failed connect.
    pub async fn push_failure(&self, error: OmnideskError) {
        self.script.lock().await.push_back(Err(error));
    }

    /// Number of `connect()` calls so far.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PluginAdapter for MockConnector {
    fn name(&self) -> &str {
        "mock-telephony"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Telephony
    }

    async fn health_check(&self) -> Result<HealthStatus, OmnideskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OmnideskError> {
        Ok(())
    }
}

#[async_trait]
impl TelephonyConnector for MockConnector {
    async fn connect(&self) -> Result<TelephonySession, OmnideskError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| Err(OmnideskError::telephony("connection refused")))
    }
}
