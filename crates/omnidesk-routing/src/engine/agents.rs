// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent presence commands.

use omnidesk_core::OmnideskError;
use tracing::{info, warn};

use super::{LoginSnapshot, RoutingEngine};
use crate::session::{ConnectionId, SessionHandle};

impl RoutingEngine {
    /// Verifies credentials, joins the PBX queue (when linked), marks the
    /// agent logged in on `session` and schedules a capacity recheck.
    ///
    /// The assignment counter is recomputed from the conversations still
    /// assigned to the agent.
    pub async fn login(
        &self,
        username: &str,
        secret: &str,
        session: SessionHandle,
    ) -> Result<LoginSnapshot, OmnideskError> {
        {
            let desk = self.shared.desk.lock().await;
            let agent = desk
                .registry
                .get(username)
                .ok_or_else(|| OmnideskError::Authentication("unknown agent".into()))?;
            if agent.record.secret != secret {
                warn!(agent = username, "login rejected: bad secret");
                return Err(OmnideskError::Authentication("invalid credentials".into()));
            }
        }

        self.queue_member_action("QueueAdd", username, &[]).await?;

        let snapshot = {
            let mut desk = self.shared.desk.lock().await;
            let conversations: Vec<_> = desk
                .store
                .assigned_to(username)
                .into_iter()
                .cloned()
                .collect();
            let queue = desk.queued_conversations();
            let agents = desk.registry.profiles();
            let agent = desk
                .registry
                .get_mut(username)
                .ok_or_else(|| OmnideskError::not_found("agent", username))?;
            agent.log_in(session, conversations.len() as u32);
            LoginSnapshot {
                agent: agent.profile(),
                agents,
                conversations,
                queue,
            }
        };

        info!(agent = username, active = snapshot.conversations.len(), "agent logged in");
        self.schedule_recheck(username);
        Ok(snapshot)
    }

    /// Leaves the PBX queue and clears presence. Assigned conversations stay
    /// assigned.
    pub async fn logoff(&self, agent: &str) -> Result<(), OmnideskError> {
        self.ensure_logged_in(agent).await?;
        self.queue_member_action("QueueRemove", agent, &[]).await?;

        let mut desk = self.shared.desk.lock().await;
        if let Some(entry) = desk.registry.get_mut(agent) {
            entry.log_out();
        }
        drop(desk);

        self.shared.scheduler.cancel(agent);
        info!(agent, "agent logged off");
        Ok(())
    }

    /// Sets the paused flag. Unpausing schedules a recheck.
    pub async fn pause(&self, agent: &str, paused: bool) -> Result<(), OmnideskError> {
        self.ensure_logged_in(agent).await?;
        let flag = if paused { "true" } else { "false" };
        self.queue_member_action("QueuePause", agent, &[("Paused", flag)])
            .await?;

        let mut desk = self.shared.desk.lock().await;
        if let Some(entry) = desk.registry.get_mut(agent) {
            entry.paused = paused;
        }
        drop(desk);

        info!(agent, paused, "agent pause changed");
        if !paused {
            self.schedule_recheck(agent);
        }
        Ok(())
    }

    /// Whether `connection` is still the live session of `agent`. A later
    /// login on another connection takes the agent over.
    pub async fn owns_session(&self, agent: &str, connection: ConnectionId) -> bool {
        let desk = self.shared.desk.lock().await;
        desk.registry.get(agent).is_some_and(|entry| {
            entry
                .session
                .as_ref()
                .is_some_and(|s| s.connection() == connection)
        })
    }

    /// Logs the agent off when the connection it logged in on closes.
    /// A newer login on another connection is left untouched.
    pub async fn disconnect(&self, agent: &str, connection: ConnectionId) {
        let mut desk = self.shared.desk.lock().await;
        let Some(entry) = desk.registry.get_mut(agent) else {
            return;
        };
        let owned = entry
            .session
            .as_ref()
            .is_some_and(|s| s.connection() == connection);
        if !owned {
            return;
        }
        entry.log_out();
        drop(desk);

        self.shared.scheduler.cancel(agent);
        info!(agent, connection, "agent connection closed, logged off");
        if let Err(e) = self.queue_member_action("QueueRemove", agent, &[]).await {
            warn!(agent, error = %e, "failed to leave PBX queue after disconnect");
        }
    }

    async fn ensure_logged_in(&self, agent: &str) -> Result<(), OmnideskError> {
        let desk = self.shared.desk.lock().await;
        match desk.registry.get(agent) {
            Some(entry) if entry.is_logged_in() => Ok(()),
            Some(_) => Err(OmnideskError::Rejected(format!(
                "agent {agent} is not logged in"
            ))),
            None => Err(OmnideskError::not_found("agent", agent)),
        }
    }
}
