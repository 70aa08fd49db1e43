// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The routing engine: one serialized desk owning the agent registry, the
//! conversation store and the waiting queue.
//!
//! Every mutation takes the desk lock, applies the in-memory change, mirrors
//! it to storage and queues pushes before releasing the lock, so agents
//! observe events in mutation order. Outbound provider calls happen after
//! the lock is released.

mod agents;
mod conversations;
mod inbound;

pub use inbound::IngestOutcome;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use omnidesk_config::OmnideskConfig;
use omnidesk_core::{
    AgentProfile, CallRecord, ChannelAdapter, ChannelType, Contact, Conversation,
    ConversationState, ManagerActions, OmnideskError, StorageAdapter,
};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info};

use crate::directory::ContactDirectory;
use crate::events::PushEvent;
use crate::queue::WaitingQueue;
use crate::registry::{AgentRegistry, Presence};
use crate::scheduler::RecheckScheduler;
use crate::store::ConversationStore;

/// Tunables for the engine, usually taken from [`OmnideskConfig`].
#[derive(Debug, Clone)]
pub struct RoutingSettings {
    pub settle_delay: Duration,
    pub auto_reply: String,
    /// PBX queue agents join on login.
    pub pbx_queue: String,
    pub interface_prefix: String,
}

impl RoutingSettings {
    pub fn from_config(config: &OmnideskConfig) -> Self {
        Self {
            settle_delay: Duration::from_millis(config.routing.settle_delay_ms),
            auto_reply: config.routing.auto_reply.clone(),
            pbx_queue: config.telephony.queue.clone(),
            interface_prefix: config.telephony.interface_prefix.clone(),
        }
    }
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self::from_config(&OmnideskConfig::default())
    }
}

/// State guarded by the desk lock.
#[derive(Debug, Default)]
pub(crate) struct Desk {
    pub(crate) registry: AgentRegistry,
    pub(crate) store: ConversationStore,
    pub(crate) queue: WaitingQueue,
}

impl Desk {
    /// Pushes `event` to every logged-in agent.
    fn broadcast(&self, event: &PushEvent) {
        for agent in self.registry.logged_in() {
            if let Some(session) = &agent.session {
                session.push(event);
            }
        }
    }

    /// Pushes `event` to one agent if it has a live session.
    fn push_to(&self, agent: &str, event: &PushEvent) -> bool {
        match self.registry.get(agent).and_then(|a| a.session.as_ref()) {
            Some(session) => {
                session.push(event);
                true
            }
            None => false,
        }
    }

    fn head_offer(&self) -> Option<PushEvent> {
        let head = self.queue.peek_head()?;
        self.store.get(head).map(PushEvent::offer)
    }

    /// Offers the queue head to every idle agent. First accept wins.
    fn offer_head_to_idle(&self) {
        let Some(offer) = self.head_offer() else {
            return;
        };
        for agent in self.registry.idle() {
            if let Some(session) = &agent.session {
                session.push(&offer);
            }
        }
    }

    fn queued_conversations(&self) -> Vec<Conversation> {
        self.queue
            .iter()
            .filter_map(|id| self.store.get(id).cloned())
            .collect()
    }
}

/// Returned to an agent on successful login.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginSnapshot {
    pub agent: AgentProfile,
    pub agents: Vec<AgentProfile>,
    /// Conversations currently assigned to this agent.
    pub conversations: Vec<Conversation>,
    /// Conversations waiting in the queue, head first.
    pub queue: Vec<Conversation>,
}

/// Everything known about one customer.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerHistory {
    pub customer: Contact,
    pub conversations: Vec<Conversation>,
    pub calls: Vec<CallRecord>,
}

/// Point-in-time view of one agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentStatus {
    pub extension: String,
    pub presence: Presence,
    pub paused: bool,
    pub on_call: bool,
    pub active: u32,
    pub capacity: u32,
}

/// Live desk counters reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeskSnapshot {
    pub queued: usize,
    pub live_conversations: usize,
    pub agents_online: usize,
    pub telephony_connected: bool,
}

/// Counts reported after loading persisted state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RestoreSummary {
    pub agents: usize,
    pub queued: usize,
    pub assigned: usize,
}

struct Shared {
    settings: RoutingSettings,
    desk: Mutex<Desk>,
    storage: Arc<dyn StorageAdapter>,
    directory: ContactDirectory,
    channels: HashMap<ChannelType, Arc<dyn ChannelAdapter>>,
    telephony: RwLock<Option<Arc<dyn ManagerActions>>>,
    scheduler: RecheckScheduler,
}

/// Cheap-to-clone handle to the shared routing state.
#[derive(Clone)]
pub struct RoutingEngine {
    shared: Arc<Shared>,
}

impl RoutingEngine {
    pub fn new(
        settings: RoutingSettings,
        storage: Arc<dyn StorageAdapter>,
        channels: Vec<Arc<dyn ChannelAdapter>>,
    ) -> Self {
        let scheduler = RecheckScheduler::new(settings.settle_delay);
        let channels = channels
            .into_iter()
            .map(|adapter| (adapter.channel_type(), adapter))
            .collect();
        Self {
            shared: Arc::new(Shared {
                directory: ContactDirectory::new(Arc::clone(&storage)),
                settings,
                desk: Mutex::new(Desk::default()),
                storage,
                channels,
                telephony: RwLock::new(None),
                scheduler,
            }),
        }
    }

    /// Loads the roster, conversation epochs and active conversations from
    /// storage. Agents start logged out.
    pub async fn restore(&self) -> Result<RestoreSummary, OmnideskError> {
        let storage = &self.shared.storage;
        let roster = storage.list_agents().await?;
        let epochs = storage.finished_epochs().await?;
        let active = storage.list_active_conversations().await?;

        let mut desk = self.shared.desk.lock().await;
        let mut summary = RestoreSummary {
            agents: roster.len(),
            ..RestoreSummary::default()
        };
        desk.registry = AgentRegistry::load(roster);
        desk.store = ConversationStore::new();
        desk.queue = WaitingQueue::new();

        for slot in epochs {
            desk.store
                .set_epoch(slot.channel, &slot.external_id, slot.finished);
        }
        for conversation in active {
            match conversation.state {
                ConversationState::Queued => {
                    desk.queue.push(conversation.id.clone());
                    summary.queued += 1;
                }
                _ => summary.assigned += 1,
            }
            desk.store.insert(conversation);
        }

        info!(
            agents = summary.agents,
            queued = summary.queued,
            assigned = summary.assigned,
            "routing state restored"
        );
        Ok(summary)
    }

    pub fn settings(&self) -> &RoutingSettings {
        &self.shared.settings
    }

    pub fn channel(&self, channel: ChannelType) -> Option<Arc<dyn ChannelAdapter>> {
        self.shared.channels.get(&channel).cloned()
    }

    /// Installs (or clears) the manager session used for PBX queue membership.
    pub async fn set_telephony(&self, actions: Option<Arc<dyn ManagerActions>>) {
        *self.shared.telephony.write().await = actions;
    }

    /// Queue ids, head first.
    pub async fn queue_ids(&self) -> Vec<String> {
        let desk = self.shared.desk.lock().await;
        desk.queue.iter().map(str::to_string).collect()
    }

    pub async fn conversation(&self, id: &str) -> Option<Conversation> {
        self.shared.desk.lock().await.store.get(id).cloned()
    }

    pub async fn agent_status(&self, id: &str) -> Option<AgentStatus> {
        let desk = self.shared.desk.lock().await;
        desk.registry.get(id).map(|agent| AgentStatus {
            extension: agent.id().to_string(),
            presence: agent.presence,
            paused: agent.paused,
            on_call: agent.on_call,
            active: agent.active,
            capacity: agent.record.capacity,
        })
    }

    pub async fn snapshot(&self) -> DeskSnapshot {
        let telephony_connected = self.shared.telephony.read().await.is_some();
        let desk = self.shared.desk.lock().await;
        DeskSnapshot {
            queued: desk.queue.len(),
            live_conversations: desk.store.len(),
            agents_online: desk.registry.logged_in().count(),
            telephony_connected,
        }
    }

    /// Cancels pending rechecks.
    pub fn shutdown(&self) {
        self.shared.scheduler.cancel_all();
    }

    /// Schedules a settle-delay recheck for `agent`, superseding any pending one.
    pub(crate) fn schedule_recheck(&self, agent: &str) {
        let engine = self.clone();
        let id = agent.to_string();
        self.shared
            .scheduler
            .schedule(agent, async move { engine.recheck(&id).await });
    }

    /// Sends a targeted offer of the queue head if `agent` is still free.
    async fn recheck(&self, agent: &str) {
        let desk = self.shared.desk.lock().await;
        let idle = desk.registry.get(agent).is_some_and(|a| a.is_idle());
        if !idle {
            debug!(agent, "recheck skipped: agent busy or logged out");
            return;
        }
        if let Some(offer) = desk.head_offer() {
            debug!(agent, "recheck: offering queue head");
            desk.push_to(agent, &offer);
        }
    }

    /// Runs a PBX queue-membership action for `agent` when telephony is linked.
    /// A refused action fails the calling command.
    async fn queue_member_action(
        &self,
        action: &str,
        agent: &str,
        extra: &[(&str, &str)],
    ) -> Result<(), OmnideskError> {
        let Some(actions) = self.shared.telephony.read().await.clone() else {
            return Ok(());
        };
        let interface = format!("{}{}", self.shared.settings.interface_prefix, agent);
        let mut params = vec![
            ("Queue", self.shared.settings.pbx_queue.as_str()),
            ("Interface", interface.as_str()),
        ];
        params.extend_from_slice(extra);

        let outcome = actions.action(action, &params).await?;
        if outcome.ok {
            debug!(agent, action, "PBX action succeeded");
            Ok(())
        } else {
            Err(OmnideskError::Rejected(format!(
                "PBX refused {action}: {}",
                outcome.status
            )))
        }
    }
}
