// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation.
//!
//! Every failed check is collected; validation does not stop at the first one.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::OmnideskConfig;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

pub fn validate_config(config: &OmnideskConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    check_listener(&mut errors, "protocol", &config.protocol.host, config.protocol.port);
    check_listener(&mut errors, "webhook", &config.webhook.host, config.webhook.port);

    if !LOG_LEVELS.contains(&config.service.log_level.as_str()) {
        errors.push(ConfigError::validation(format!(
            "service.log_level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.service.log_level
        )));
    }

    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::validation(
            "storage.database_path must not be empty",
        ));
    }

    if config.routing.agent_capacity == 0 {
        errors.push(ConfigError::validation(
            "routing.agent_capacity must be at least 1",
        ));
    }

    let telephony = &config.telephony;
    if telephony.enabled {
        check_listener(&mut errors, "telephony", &telephony.host, telephony.port);
        if telephony.username.as_deref().is_none_or(str::is_empty)
            || telephony.secret.is_none()
        {
            errors.push(ConfigError::validation(
                "telephony.username and telephony.secret are required when telephony is enabled",
            ));
        }
        if telephony.reconnect_interval_ms == 0 {
            errors.push(ConfigError::validation(
                "telephony.reconnect_interval_ms must be greater than 0",
            ));
        }
    }

    let whatsapp = &config.whatsapp;
    let any_whatsapp = whatsapp.account_sid.is_some()
        || whatsapp.auth_token.is_some()
        || whatsapp.number.is_some();
    if any_whatsapp && !whatsapp.is_configured() {
        errors.push(ConfigError::validation(
            "whatsapp requires account_sid, auth_token and number together",
        ));
    }

    let mut seen = HashSet::new();
    for agent in &config.agents {
        if agent.extension.trim().is_empty() {
            errors.push(ConfigError::validation("agents.extension must not be empty"));
        } else if !seen.insert(agent.extension.as_str()) {
            errors.push(ConfigError::validation(format!(
                "duplicate agent extension `{}`",
                agent.extension
            )));
        }
        if agent.capacity == Some(0) {
            errors.push(ConfigError::validation(format!(
                "agent `{}` capacity must be at least 1",
                agent.extension
            )));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_listener(errors: &mut Vec<ConfigError>, section: &str, host: &str, port: u16) {
    if host.trim().is_empty() {
        errors.push(ConfigError::validation(format!(
            "{section}.host must not be empty"
        )));
    }
    if port == 0 {
        errors.push(ConfigError::validation(format!(
            "{section}.port must not be 0"
        )));
    }
}
