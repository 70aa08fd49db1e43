// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Minimal client for Twilio's Messages endpoint.

use std::time::Duration;

use omnidesk_core::OmnideskError;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use serde::Serialize;
use tracing::warn;

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct MessageForm<'a> {
    to: &'a str,
    from: &'a str,
    body: &'a str,
}

#[derive(Debug, Clone)]
pub struct TwilioClient {
    client: reqwest::Client,
    messages_url: String,
    account_sid: String,
    auth_token: String,
}

impl TwilioClient {
    pub fn new(api_base: &str, account_sid: &str, auth_token: &str) -> Result<Self, OmnideskError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| OmnideskError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            messages_url: format!(
                "{}/2010-04-01/Accounts/{account_sid}/Messages.json",
                api_base.trim_end_matches('/')
            ),
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
        })
    }

    /// Posts one message. Any non-2xx answer is a channel error.
    pub async fn send_message(&self, to: &str, from: &str, body: &str) -> Result<(), OmnideskError> {
        let form = serde_urlencoded::to_string(MessageForm { to, from, body }).map_err(|e| {
            OmnideskError::Channel {
                message: format!("failed to encode twilio form: {e}"),
                source: Some(Box::new(e)),
            }
        })?;

        let response = self
            .client
            .post(&self.messages_url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .header(
                CONTENT_TYPE,
                HeaderValue::from_static("application/x-www-form-urlencoded"),
            )
            .body(form)
            .send()
            .await
            .map_err(|e| OmnideskError::Channel {
                message: format!("twilio request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        warn!(status = %status, "twilio rejected message");
        Err(OmnideskError::channel(format!("twilio returned {status}: {text}")))
    }
}
