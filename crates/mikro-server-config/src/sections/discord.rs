// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Discord bot configuration.

use mikro_common_config::SecretString;
use serde::Deserialize;

pub const DEFAULT_DISCORD_API_BASE: &str = "https://discord.com/api/v10";
pub const DEFAULT_WEBHOOK_NAME: &str = "Mikro Sender";

#[derive(Debug, Clone)]
pub struct DiscordConfig {
	pub token: SecretString,
	pub api_base: String,
	/// Name of the impersonation webhook created per channel.
	pub webhook_name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiscordConfigLayer {
	#[serde(skip)]
	pub token: Option<SecretString>,
	#[serde(default)]
	pub api_base: Option<String>,
	#[serde(default)]
	pub webhook_name: Option<String>,
}

impl DiscordConfigLayer {
	pub fn merge(&mut self, other: DiscordConfigLayer) {
		if other.token.is_some() {
			self.token = other.token;
		}
		if other.api_base.is_some() {
			self.api_base = other.api_base;
		}
		if other.webhook_name.is_some() {
			self.webhook_name = other.webhook_name;
		}
	}

	pub fn finalize(self) -> Option<DiscordConfig> {
		Some(DiscordConfig {
			token: self.token?,
			api_base: self
				.api_base
				.unwrap_or_else(|| DEFAULT_DISCORD_API_BASE.to_string()),
			webhook_name: self
				.webhook_name
				.unwrap_or_else(|| DEFAULT_WEBHOOK_NAME.to_string()),
		})
	}
}
