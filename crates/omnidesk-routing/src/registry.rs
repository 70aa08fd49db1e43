// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Agent presence and capacity.

use std::collections::BTreeMap;

use omnidesk_core::{AgentProfile, AgentRecord};
use serde::Serialize;

use crate::session::SessionHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Presence {
    LoggedOut,
    LoggedIn,
}

/// Live state of one roster entry.
#[derive(Debug)]
pub struct Agent {
    pub record: AgentRecord,
    pub presence: Presence,
    pub paused: bool,
    pub on_call: bool,
    /// Conversations currently assigned to this agent.
    pub active: u32,
    pub session: Option<SessionHandle>,
}

impl Agent {
    fn new(record: AgentRecord) -> Self {
        Self {
            record,
            presence: Presence::LoggedOut,
            paused: false,
            on_call: false,
            active: 0,
            session: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.record.extension
    }

    pub fn is_logged_in(&self) -> bool {
        self.presence == Presence::LoggedIn
    }

    pub fn at_capacity(&self) -> bool {
        self.active >= self.record.capacity
    }

    pub fn is_busy(&self) -> bool {
        self.on_call || self.paused || self.at_capacity()
    }

    /// Logged in and free to take new work.
    pub fn is_idle(&self) -> bool {
        self.is_logged_in() && !self.is_busy()
    }

    pub fn profile(&self) -> AgentProfile {
        self.record.profile()
    }

    pub fn log_in(&mut self, session: SessionHandle, active: u32) {
        self.presence = Presence::LoggedIn;
        self.session = Some(session);
        self.active = active;
    }

    /// Clears presence, flags and the assignment counter and detaches the session.
    pub fn log_out(&mut self) {
        self.presence = Presence::LoggedOut;
        self.paused = false;
        self.on_call = false;
        self.active = 0;
        self.session = None;
    }
}

/// The fixed roster, loaded once at startup.
#[derive(Debug, Default)]
pub struct AgentRegistry {
    agents: BTreeMap<String, Agent>,
}

impl AgentRegistry {
    pub fn load(roster: impl IntoIterator<Item = AgentRecord>) -> Self {
        Self {
            agents: roster
                .into_iter()
                .map(|record| (record.extension.clone(), Agent::new(record)))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&Agent> {
        self.agents.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Agent> {
        self.agents.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    pub fn logged_in(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(|a| a.is_logged_in())
    }

    pub fn idle(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values().filter(|a| a.is_idle())
    }

    pub fn profiles(&self) -> Vec<AgentProfile> {
        self.agents.values().map(Agent::profile).collect()
    }
}
