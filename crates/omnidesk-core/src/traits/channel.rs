// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel adapter trait for messaging providers (WhatsApp, Viber).

use async_trait::async_trait;

use crate::error::OmnideskError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{ChannelType, InboundEvent};

/// Adapter for one messaging provider.
///
/// Adapters are constructed from their config section (which performs any
/// provider initialisation), decode raw webhook bodies, and deliver outbound
/// text to a sender identity.
#[async_trait]
pub trait ChannelAdapter: PluginAdapter {
    /// The channel this adapter serves.
    fn channel_type(&self) -> ChannelType;

    /// Decodes one webhook body.
    ///
    /// Returns `Ok(None)` for well-formed provider callbacks that carry
    /// nothing routable (subscriptions, webhooks checks, unknown statuses),
    /// and [`OmnideskError::MalformedPayload`] when the body cannot be parsed.
    fn parse_inbound(&self, body: &[u8]) -> Result<Option<InboundEvent>, OmnideskError>;

    /// Sends `text` to the customer identified by `external_id`.
    async fn send_outbound(
        &self,
        external_id: &str,
        text: &str,
        auto_reply: bool,
    ) -> Result<(), OmnideskError>;
}
