// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Viber public-account channel adapter for Omnidesk.
//!
//! Decodes `message`, `delivered` and `seen` callbacks and sends agent
//! replies through the REST API. Auto-replies go out with a blank sender
//! name so they are not attributed to an agent.

pub mod types;

use std::time::Duration;

use async_trait::async_trait;
use omnidesk_config::model::ViberConfig;
use omnidesk_core::types::now_millis;
use omnidesk_core::{
    AdapterType, ChannelAdapter, ChannelType, HealthStatus, InboundEvent, MessageStatus,
    OmnideskError, PluginAdapter, SenderIdentity,
};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use crate::types::{Callback, SendMessage, SendResponse, Sender};

const AUTH_HEADER: &str = "X-Viber-Auth-Token";
const AUTO_REPLY_SENDER: &str = " ";

pub struct ViberChannel {
    client: reqwest::Client,
    send_url: String,
    sender_name: String,
}

impl ViberChannel {
    pub fn new(config: &ViberConfig) -> Result<Self, OmnideskError> {
        let token = config
            .auth_token
            .as_deref()
            .ok_or_else(|| OmnideskError::Config("viber.auth_token is required".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTH_HEADER,
            HeaderValue::from_str(token).map_err(|e| {
                OmnideskError::Config(format!("invalid viber token header value: {e}"))
            })?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OmnideskError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            send_url: format!("{}/pa/send_message", config.api_base.trim_end_matches('/')),
            sender_name: config.sender_name.clone(),
        })
    }
}

#[async_trait]
impl PluginAdapter for ViberChannel {
    fn name(&self) -> &str {
        "viber"
    }

    fn version(&self) -> semver::Version {
        semver::Version::parse(env!("CARGO_PKG_VERSION")).unwrap_or(semver::Version::new(0, 1, 0))
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, OmnideskError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), OmnideskError> {
        Ok(())
    }
}

#[async_trait]
impl ChannelAdapter for ViberChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::Viber
    }

    fn parse_inbound(&self, body: &[u8]) -> Result<Option<InboundEvent>, OmnideskError> {
        parse_callback(body)
    }

    async fn send_outbound(
        &self,
        external_id: &str,
        text: &str,
        auto_reply: bool,
    ) -> Result<(), OmnideskError> {
        let name = if auto_reply {
            AUTO_REPLY_SENDER
        } else {
            self.sender_name.as_str()
        };
        let request = SendMessage {
            receiver: external_id,
            kind: "text",
            text,
            min_api_version: 1,
            sender: Sender { name, avatar: "" },
        };

        let response = self
            .client
            .post(&self.send_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| OmnideskError::Channel {
                message: format!("viber request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(OmnideskError::channel(format!("viber returned {status}")));
        }
        // Older API revisions answer with an empty body.
        if let Ok(reply) = response.json::<SendResponse>().await {
            if reply.status != 0 {
                warn!(code = reply.status, "viber rejected message");
                return Err(OmnideskError::channel(format!(
                    "viber status {}: {}",
                    reply.status, reply.status_message
                )));
            }
        }
        debug!(auto_reply, "viber message sent");
        Ok(())
    }
}

/// Decodes one Viber callback. Events other than `message`, `delivered`
/// and `seen` (subscriptions, webhook checks) are ignored.
pub fn parse_callback(body: &[u8]) -> Result<Option<InboundEvent>, OmnideskError> {
    let callback: Callback = serde_json::from_slice(body)
        .map_err(|e| OmnideskError::MalformedPayload(format!("viber callback: {e}")))?;

    let sender = match (&callback.sender, &callback.user_id) {
        (Some(user), _) => SenderIdentity {
            external_id: user.id.clone(),
            display_name: user.name.clone(),
        },
        (None, Some(id)) => SenderIdentity {
            external_id: id.clone(),
            display_name: String::new(),
        },
        (None, None) => {
            return match callback.event.as_str() {
                "message" | "delivered" | "seen" => Err(OmnideskError::MalformedPayload(
                    format!("viber {} callback without sender", callback.event),
                )),
                _ => Ok(None),
            };
        }
    };

    let event = match callback.event.as_str() {
        "message" => {
            let text = callback
                .message
                .and_then(|m| m.text)
                .ok_or_else(|| OmnideskError::MalformedPayload("viber message without text".into()))?;
            Some(InboundEvent::Message {
                sender,
                text,
                timestamp: callback.timestamp.unwrap_or_else(now_millis),
            })
        }
        "delivered" => Some(InboundEvent::Status {
            sender,
            status: MessageStatus::Delivered,
        }),
        "seen" => Some(InboundEvent::Status {
            sender,
            status: MessageStatus::Seen,
        }),
        _ => None,
    };
    Ok(event)
}
