// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Viber REST API payloads.

use serde::{Deserialize, Serialize};

/// Callback posted to the webhook.
#[derive(Debug, Deserialize)]
pub struct Callback {
    pub event: String,
    #[serde(default)]
    pub timestamp: Option<i64>,
    /// Present on `message` callbacks.
    #[serde(default)]
    pub sender: Option<CallbackUser>,
    /// Present on `delivered` and `seen` callbacks.
    #[serde(default)]
    pub user_id: Option<String>,
    #[serde(default)]
    pub message: Option<CallbackMessage>,
}

#[derive(Debug, Deserialize)]
pub struct CallbackUser {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackMessage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub text: Option<String>,
}

/// Body of `POST /pa/send_message`.
#[derive(Debug, Serialize)]
pub struct SendMessage<'a> {
    pub receiver: &'a str,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub min_api_version: u32,
    pub sender: Sender<'a>,
}

#[derive(Debug, Serialize)]
pub struct Sender<'a> {
    pub name: &'a str,
    pub avatar: &'a str,
}

/// Viber answers 200 for application errors and reports them in `status`.
#[derive(Debug, Deserialize)]
pub struct SendResponse {
    pub status: i64,
    #[serde(default)]
    pub status_message: String,
}
