// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `omnidesk serve` command implementation.
//!
//! Opens storage, seeds the agent roster, restores live conversations, then
//! runs the webhook gateway, the agent protocol server and (when enabled)
//! the telephony bridge until a shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use omnidesk_asterisk::AmiConnector;
use omnidesk_config::model::OmnideskConfig;
use omnidesk_core::{AgentRecord, ChannelAdapter, OmnideskError, StorageAdapter};
use omnidesk_gateway::GatewayState;
use omnidesk_routing::{RoutingEngine, RoutingSettings, TelephonyBridge};
use omnidesk_storage::SqliteStorage;
use omnidesk_viber::ViberChannel;
use omnidesk_whatsapp::WhatsAppChannel;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use crate::shutdown;

/// Runs the `omnidesk serve` command.
pub async fn run_serve(config: OmnideskConfig) -> Result<(), OmnideskError> {
    init_tracing(&config.service.log_level);
    info!(service = %config.service.name, "starting omnidesk serve");

    let storage = SqliteStorage::new(config.storage.clone());
    storage.initialize().await?;
    let storage: Arc<dyn StorageAdapter> = Arc::new(storage);

    let roster = agent_records(&config);
    for record in &roster {
        storage.upsert_agent(record).await?;
    }
    info!(count = roster.len(), "agent roster seeded");

    let channels = build_channels(&config)?;
    if channels.is_empty() {
        warn!("no messaging channels configured; webhooks will be ignored");
    }

    let engine = RoutingEngine::new(
        RoutingSettings::from_config(&config),
        Arc::clone(&storage),
        channels,
    );
    engine.restore().await?;

    let cancel = shutdown::install_signal_handler();

    let telephony = if config.telephony.enabled {
        let connector = Arc::new(AmiConnector::new(&config.telephony)?);
        let bridge = TelephonyBridge::new(
            engine.clone(),
            connector,
            Duration::from_millis(config.telephony.reconnect_interval_ms),
        );
        Some(bridge.start(cancel.clone()).await?)
    } else {
        info!("telephony disabled");
        None
    };

    let mut servers = JoinSet::new();
    {
        let webhook = config.webhook.clone();
        let state = GatewayState::new(engine.clone());
        let cancel = cancel.clone();
        servers.spawn(async move { omnidesk_gateway::start_server(&webhook, state, cancel).await });
    }
    {
        let protocol = config.protocol.clone();
        let engine = engine.clone();
        let cancel = cancel.clone();
        servers.spawn(async move { omnidesk_protocol::start_server(&protocol, engine, cancel).await });
    }

    // A server that fails takes the whole process down.
    let mut result = Ok(());
    while let Some(joined) = servers.join_next().await {
        let outcome = joined.map_err(|e| OmnideskError::Internal(format!("server task failed: {e}")));
        if let Err(e) = outcome.and_then(|r| r) {
            error!(error = %e, "server stopped with error");
            if result.is_ok() {
                result = Err(e);
            }
            cancel.cancel();
        }
    }

    if let Some(handle) = telephony {
        cancel.cancel();
        if let Err(e) = handle.await {
            warn!(error = %e, "telephony task ended abnormally");
        }
    }

    engine.shutdown();
    storage.close().await?;

    info!("omnidesk serve shutdown complete");
    result
}

/// Roster entries from `[[agents]]`, filling in the default capacity.
fn agent_records(config: &OmnideskConfig) -> Vec<AgentRecord> {
    config
        .agents
        .iter()
        .map(|seed| AgentRecord {
            extension: seed.extension.clone(),
            name: seed.name.clone(),
            secret: seed.secret.clone(),
            capacity: seed.capacity.unwrap_or(config.routing.agent_capacity),
        })
        .collect()
}

/// Messaging adapters for every configured provider.
fn build_channels(config: &OmnideskConfig) -> Result<Vec<Arc<dyn ChannelAdapter>>, OmnideskError> {
    let mut channels: Vec<Arc<dyn ChannelAdapter>> = Vec::new();

    if config.whatsapp.is_configured() {
        channels.push(Arc::new(WhatsAppChannel::new(&config.whatsapp)?));
        info!("whatsapp channel enabled");
    }
    if config.viber.auth_token.is_some() {
        channels.push(Arc::new(ViberChannel::new(&config.viber)?));
        info!("viber channel enabled");
    }

    Ok(channels)
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("omnidesk={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> OmnideskConfig {
        omnidesk_config::load_config_from_str(toml).unwrap()
    }

    #[test]
    fn roster_uses_default_capacity() {
        let config = config(
            r#"
            [routing]
            agent_capacity = 3

            [[agents]]
            extension = "101"
            name = "Ana"
            secret = "s1"

            [[agents]]
            extension = "102"
            name = "Marko"
            secret = "s2"
            capacity = 1
            "#,
        );
        let roster = agent_records(&config);
        assert_eq!(roster.len(), 2);
        assert_eq!(roster[0].capacity, 3);
        assert_eq!(roster[1].capacity, 1);
    }

    #[test]
    fn channels_follow_configuration() {
        assert!(build_channels(&config("")).unwrap().is_empty());

        let channels = build_channels(&config(
            r#"
            [viber]
            auth_token = "token"
            sender_name = "Desk"

            [whatsapp]
            account_sid = "AC1"
            auth_token = "secret"
            number = "+38761000000"
            "#,
        ))
        .unwrap();
        let mut kinds: Vec<String> = channels.iter().map(|c| c.channel_type().to_string()).collect();
        kinds.sort();
        assert_eq!(kinds, vec!["viber", "whatsapp"]);
    }
}
