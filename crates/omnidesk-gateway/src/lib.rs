// SPDX-FileCopyrightText: 2026 Omnidesk Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingress for channel providers.
//!
//! Every `POST` is handed to the [`ChannelDispatcher`](omnidesk_routing::ChannelDispatcher)
//! with its path; the first path segment selects the channel. Providers
//! always get `200 OK` with an empty body so they never retry.

pub mod handlers;
pub mod server;

pub use server::{GatewayState, router, start_server};
