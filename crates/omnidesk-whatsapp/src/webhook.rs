// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio webhook decoding.

use omnidesk_core::types::now_millis;
use omnidesk_core::{InboundEvent, MessageStatus, OmnideskError, SenderIdentity};
use serde::Deserialize;

use crate::numbers::NumberFormat;

/// The subset of Twilio's callback form Omnidesk reads.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct TwilioForm {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    profile_name: String,
    #[serde(default)]
    message_status: Option<String>,
}

/// Decodes a Twilio callback.
///
/// Message callbacks carry the customer in `From`; status callbacks for our
/// own messages carry it in `To`. Statuses other than `delivered` and
/// `read` are acknowledged and ignored.
pub fn parse(
    body: &[u8],
    business_address: &str,
    numbers: &NumberFormat,
) -> Result<Option<InboundEvent>, OmnideskError> {
    let form: TwilioForm = serde_urlencoded::from_bytes(body)
        .map_err(|e| OmnideskError::MalformedPayload(format!("twilio form: {e}")))?;

    let customer = if !form.from.is_empty() && form.from != business_address {
        &form.from
    } else {
        &form.to
    };
    if customer.is_empty() {
        return Err(OmnideskError::MalformedPayload(
            "twilio callback without sender".into(),
        ));
    }
    let sender = SenderIdentity {
        external_id: numbers.to_national(customer),
        display_name: form.profile_name,
    };

    if let Some(status) = form.message_status {
        return Ok(match status.as_str() {
            "delivered" => Some(InboundEvent::Status {
                sender,
                status: MessageStatus::Delivered,
            }),
            "read" => Some(InboundEvent::Status {
                sender,
                status: MessageStatus::Seen,
            }),
            _ => None,
        });
    }

    let text = form
        .body
        .ok_or_else(|| OmnideskError::MalformedPayload("twilio message without Body".into()))?;
    Ok(Some(InboundEvent::Message {
        sender,
        text,
        timestamp: now_millis(),
    }))
}
