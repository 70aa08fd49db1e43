// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for Omnidesk.
//!
//! All structs use `#[serde(deny_unknown_fields)]` so a misspelled key fails
//! at startup instead of silently falling back to a default.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Top-level Omnidesk configuration. Every section is optional.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OmnideskConfig {
    #[serde(default)]
    pub service: ServiceConfig,

    /// Agent session protocol server.
    #[serde(default)]
    pub protocol: ProtocolConfig,

    /// Channel webhook ingress.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Queue dispatch behavior.
    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    /// PBX manager interface.
    #[serde(default)]
    pub telephony: TelephonyConfig,

    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    #[serde(default)]
    pub viber: ViberConfig,

    /// Agent roster seeded into storage at startup.
    #[serde(default)]
    pub agents: Vec<AgentSeed>,
}

/// Process identity and logging.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "omnidesk".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Listener for long-lived agent connections.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ProtocolConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_protocol_port")]
    pub port: u16,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_protocol_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_protocol_port() -> u16 {
    8010
}

/// HTTP listener for provider webhooks.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_webhook_port")]
    pub port: u16,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_webhook_port(),
        }
    }
}

fn default_webhook_port() -> u16 {
    8181
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Delay before re-offering the queue head to an agent whose capacity freed up.
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    /// Concurrent conversation limit for agents without an explicit capacity.
    #[serde(default = "default_agent_capacity")]
    pub agent_capacity: u32,

    /// Text sent once to a customer when a new conversation is queued.
    #[serde(default = "default_auto_reply")]
    pub auto_reply: String,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
            agent_capacity: default_agent_capacity(),
            auto_reply: default_auto_reply(),
        }
    }
}

fn default_settle_delay_ms() -> u64 {
    5000
}

fn default_agent_capacity() -> u32 {
    2
}

fn default_auto_reply() -> String {
    "Thank you for contacting us. One of agents will answer as soon as possible.".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("omnidesk").join("omnidesk.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("omnidesk.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Asterisk manager interface settings.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TelephonyConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_telephony_port")]
    pub port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub secret: Option<String>,

    /// Pause between reconnect attempts after a transport failure.
    #[serde(default = "default_reconnect_interval_ms")]
    pub reconnect_interval_ms: u64,

    /// PBX queue that logged-in agents are added to.
    #[serde(default = "default_queue")]
    pub queue: String,

    /// Prefix turning an extension into a dial interface (`PJSIP/101`).
    #[serde(default = "default_interface_prefix")]
    pub interface_prefix: String,
}

impl Default for TelephonyConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_telephony_port(),
            username: None,
            secret: None,
            reconnect_interval_ms: default_reconnect_interval_ms(),
            queue: default_queue(),
            interface_prefix: default_interface_prefix(),
        }
    }
}

impl fmt::Debug for TelephonyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelephonyConfig")
            .field("enabled", &self.enabled)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("secret", &redact(&self.secret))
            .field("reconnect_interval_ms", &self.reconnect_interval_ms)
            .field("queue", &self.queue)
            .field("interface_prefix", &self.interface_prefix)
            .finish()
    }
}

fn default_telephony_port() -> u16 {
    5038
}

fn default_reconnect_interval_ms() -> u64 {
    1000
}

fn default_queue() -> String {
    "SalesQueue".to_string()
}

fn default_interface_prefix() -> String {
    "PJSIP/".to_string()
}

/// WhatsApp delivered through the Twilio messaging API.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    #[serde(default)]
    pub account_sid: Option<String>,

    #[serde(default)]
    pub auth_token: Option<String>,

    /// Business number in international format without `+`.
    #[serde(default)]
    pub number: Option<String>,

    /// Country calling code replaced by `national_prefix` on inbound senders.
    #[serde(default = "default_country_code")]
    pub country_code: String,

    #[serde(default = "default_national_prefix")]
    pub national_prefix: String,

    #[serde(default = "default_twilio_api_base")]
    pub api_base: String,
}

impl WhatsAppConfig {
    /// True when every credential needed for outbound delivery is present.
    pub fn is_configured(&self) -> bool {
        self.account_sid.is_some() && self.auth_token.is_some() && self.number.is_some()
    }
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            number: None,
            country_code: default_country_code(),
            national_prefix: default_national_prefix(),
            api_base: default_twilio_api_base(),
        }
    }
}

impl fmt::Debug for WhatsAppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WhatsAppConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &redact(&self.auth_token))
            .field("number", &self.number)
            .field("country_code", &self.country_code)
            .field("national_prefix", &self.national_prefix)
            .field("api_base", &self.api_base)
            .finish()
    }
}

fn default_country_code() -> String {
    "387".to_string()
}

fn default_national_prefix() -> String {
    "0".to_string()
}

fn default_twilio_api_base() -> String {
    "https://api.twilio.com".to_string()
}

/// Viber public account.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ViberConfig {
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender name shown on agent replies.
    #[serde(default = "default_viber_sender_name")]
    pub sender_name: String,

    #[serde(default = "default_viber_api_base")]
    pub api_base: String,
}

impl Default for ViberConfig {
    fn default() -> Self {
        Self {
            auth_token: None,
            sender_name: default_viber_sender_name(),
            api_base: default_viber_api_base(),
        }
    }
}

impl fmt::Debug for ViberConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ViberConfig")
            .field("auth_token", &redact(&self.auth_token))
            .field("sender_name", &self.sender_name)
            .field("api_base", &self.api_base)
            .finish()
    }
}

fn default_viber_sender_name() -> String {
    "Agent".to_string()
}

fn default_viber_api_base() -> String {
    "https://chatapi.viber.com".to_string()
}

/// One roster entry. Secrets are stored and compared in plain text.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentSeed {
    pub extension: String,

    pub name: String,

    pub secret: String,

    /// Overrides `routing.agent_capacity` for this agent.
    #[serde(default)]
    pub capacity: Option<u32>,
}

impl fmt::Debug for AgentSeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSeed")
            .field("extension", &self.extension)
            .field("name", &self.name)
            .field("secret", &"***")
            .field("capacity", &self.capacity)
            .finish()
    }
}

fn redact(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "***")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_secrets() {
        let telephony = TelephonyConfig {
            secret: Some("hunter2".into()),
            ..TelephonyConfig::default()
        };
        let seed = AgentSeed {
            extension: "101".into(),
            name: "Ana".into(),
            secret: "pw-101".into(),
            capacity: None,
        };

        assert!(!format!("{telephony:?}").contains("hunter2"));
        assert!(!format!("{seed:?}").contains("pw-101"));
    }

    #[test]
    fn whatsapp_requires_all_credentials() {
        let mut cfg = WhatsAppConfig {
            account_sid: Some("AC1".into()),
            auth_token: Some("tok".into()),
            ..WhatsAppConfig::default()
        };
        assert!(!cfg.is_configured());
        cfg.number = Some("38733000000".into());
        assert!(cfg.is_configured());
    }
}
