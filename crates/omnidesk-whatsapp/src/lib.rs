// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp channel adapter for Omnidesk, delivered through Twilio.
//!
//! Inbound traffic arrives as Twilio webhooks (form-encoded message and
//! status callbacks); replies go out through the Messages REST endpoint.
//! Customer numbers are kept in national format (`+387 61…` becomes
//! `061…`) so they line up with caller ids from the PBX.

pub mod client;
pub mod numbers;
pub mod webhook;

use async_trait::async_trait;
use omnidesk_config::model::WhatsAppConfig;
use omnidesk_core::{
    AdapterType, ChannelAdapter, ChannelType, HealthStatus, InboundEvent, OmnideskError,
    PluginAdapter,
};
use tracing::debug;

use crate::client::TwilioClient;
use crate::numbers::NumberFormat;

/// WhatsApp channel backed by a Twilio account.
pub struct WhatsAppChannel {
    client: TwilioClient,
    numbers: NumberFormat,
    business_number: String,
}

impl WhatsAppChannel {
    /// Creates the adapter. Fails when the account credentials are missing.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, OmnideskError> {
        let (Some(sid), Some(token), Some(number)) = (
            config.account_sid.as_deref(),
            config.auth_token.as_deref(),
            config.number.as_deref(),
        ) else {
            return Err(OmnideskError::Config(
                "whatsapp.account_sid, whatsapp.auth_token and whatsapp.number are required".into(),
            ));
        };

        let business_number = number.trim_start_matches('+').to_string();
        Ok(Self {
            client: TwilioClient::new(&config.api_base, sid, token)?,
            numbers: NumberFormat::new(&config.country_code, &config.national_prefix),
            business_number,
        })
    }

    /// Twilio address of the business number.
    fn from_address(&self) -> String {
        format!("whatsapp:+{}", self.business_number)
    }
}

#[async_trait]
impl PluginAdapter for WhatsAppChannel {
    fn name(&self) -> &str {
        "whatsapp"
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
impl ChannelAdapter for WhatsAppChannel {
    fn channel_type(&self) -> ChannelType {
        ChannelType::WhatsApp
    }

    fn parse_inbound(&self, body: &[u8]) -> Result<Option<InboundEvent>, OmnideskError> {
        webhook::parse(body, &self.from_address(), &self.numbers)
    }

    async fn send_outbound(
        &self,
        external_id: &str,
        text: &str,
        auto_reply: bool,
    ) -> Result<(), OmnideskError> {
        let to = self.numbers.to_whatsapp_address(external_id);
        self.client.send_message(&to, &self.from_address(), text).await?;
        debug!(auto_reply, "whatsapp message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header_exists, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(api_base: &str) -> WhatsAppConfig {
        WhatsAppConfig {
            account_sid: Some("AC123".into()),
            auth_token: Some("token".into()),
            number: Some("+38761000000".into()),
            api_base: api_base.to_string(),
            ..WhatsAppConfig::default()
        }
    }

    #[test]
    fn missing_credentials_are_a_config_error() {
        let err = WhatsAppChannel::new(&WhatsAppConfig::default()).err().unwrap();
        assert!(matches!(err, OmnideskError::Config(_)));
    }

    #[test]
    fn inbound_message_uses_national_sender() {
        let channel = WhatsAppChannel::new(&config("http://localhost")).unwrap();
        let body = b"From=whatsapp%3A%2B38761222333&To=whatsapp%3A%2B38761000000&Body=Hi&ProfileName=Ana";
        match channel.parse_inbound(body).unwrap() {
            Some(InboundEvent::Message { sender, text, .. }) => {
                assert_eq!(sender.external_id, "061222333");
                assert_eq!(sender.display_name, "Ana");
                assert_eq!(text, "Hi");
            }
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_posts_form_to_twilio() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2010-04-01/Accounts/AC123/Messages.json"))
            .and(header_exists("authorization"))
            .and(body_string_contains("To=whatsapp%3A%2B38761222333"))
            .and(body_string_contains("From=whatsapp%3A%2B38761000000"))
            .and(body_string_contains("Body=Hello+there"))
            .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"sid":"SM1"}"#))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(&config(&server.uri())).unwrap();
        channel
            .send_outbound("061222333", "Hello there", false)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn provider_rejection_is_a_channel_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string(r#"{"message":"bad To"}"#))
            .mount(&server)
            .await;

        let channel = WhatsAppChannel::new(&config(&server.uri())).unwrap();
        let err = channel.send_outbound("061222333", "x", true).await.unwrap_err();
        assert!(matches!(err, OmnideskError::Channel { .. }));
    }
}
