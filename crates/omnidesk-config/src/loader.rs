// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered configuration loading with Figment.
//!
//! Later sources override earlier ones:
//! 1. Compiled defaults
//! 2. `/etc/omnidesk/omnidesk.toml`
//! 3. `~/.config/omnidesk/omnidesk.toml`
//! 4. `./omnidesk.toml`
//! 5. `OMNIDESK_*` environment variables

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::OmnideskConfig;

pub(crate) const SYSTEM_CONFIG_PATH: &str = "/etc/omnidesk/omnidesk.toml";
pub(crate) const LOCAL_CONFIG_PATH: &str = "omnidesk.toml";

/// Sections reachable from `OMNIDESK_<SECTION>_<KEY>` variables.
const ENV_SECTIONS: &[&str] = &[
    "service",
    "protocol",
    "webhook",
    "routing",
    "storage",
    "telephony",
    "whatsapp",
    "viber",
];

pub(crate) fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("omnidesk").join("omnidesk.toml"))
}

/// Load configuration from the standard hierarchy with env var overrides.
pub fn load_config() -> Result<OmnideskConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no file lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<OmnideskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OmnideskConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from an explicit file with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<OmnideskConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(OmnideskConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// The Figment used by [`load_config`], before extraction.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(OmnideskConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Environment provider mapping `OMNIDESK_TELEPHONY_RECONNECT_INTERVAL_MS`
/// to `telephony.reconnect_interval_ms`.
///
/// Only the leading section name is split off; keys keep their underscores.
fn env_provider() -> Env {
    Env::prefixed("OMNIDESK_").map(|key| map_env_key(key.as_str()).into())
}

pub(crate) fn map_env_key(key: &str) -> String {
    for section in ENV_SECTIONS {
        if let Some(rest) = key
            .strip_prefix(section)
            .and_then(|r| r.strip_prefix('_'))
        {
            return format!("{section}.{rest}");
        }
    }
    key.to_string()
}
