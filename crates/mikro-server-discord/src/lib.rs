// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Discord REST v10 implementation of [`ChatPlatform`] and
//! [`WebhookTransport`].
//!
//! [`ChatPlatform`]: mikro_chat_core::ChatPlatform
//! [`WebhookTransport`]: mikro_chat_core::WebhookTransport

mod client;
mod platform;
mod webhook;
mod wire;

pub use client::{DiscordClient, DEFAULT_API_BASE, MAX_CONTENT_LEN};
