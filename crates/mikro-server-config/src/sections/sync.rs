// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Sync engine tuning and the chat relay secret.

use mikro_common_config::SecretString;
use serde::Deserialize;

/// Sync configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct SyncConfig {
	/// Pause before dispatching a webhook so tracker reads see the change.
	pub consistency_delay_ms: u64,
	pub thread_cache_size: usize,
	pub installation_cache_size: usize,
	pub reply_lookback: usize,
	/// HMAC key shared with the chat gateway relay.
	pub relay_secret: Option<SecretString>,
	pub resync_slowmode_secs: u32,
}

impl Default for SyncConfig {
	fn default() -> Self {
		Self {
			consistency_delay_ms: 1000,
			thread_cache_size: 1024,
			installation_cache_size: 512,
			reply_lookback: 80,
			relay_secret: None,
			resync_slowmode_secs: 15,
		}
	}
}

/// Sync configuration layer (partial, for merging).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncConfigLayer {
	#[serde(default)]
	pub consistency_delay_ms: Option<u64>,
	#[serde(default)]
	pub thread_cache_size: Option<usize>,
	#[serde(default)]
	pub installation_cache_size: Option<usize>,
	#[serde(default)]
	pub reply_lookback: Option<usize>,
	#[serde(skip)]
	pub relay_secret: Option<SecretString>,
	#[serde(default)]
	pub resync_slowmode_secs: Option<u32>,
}

impl SyncConfigLayer {
	pub fn merge(&mut self, other: SyncConfigLayer) {
		if other.consistency_delay_ms.is_some() {
			self.consistency_delay_ms = other.consistency_delay_ms;
		}
		if other.thread_cache_size.is_some() {
			self.thread_cache_size = other.thread_cache_size;
		}
		if other.installation_cache_size.is_some() {
			self.installation_cache_size = other.installation_cache_size;
		}
		if other.reply_lookback.is_some() {
			self.reply_lookback = other.reply_lookback;
		}
		if other.relay_secret.is_some() {
			self.relay_secret = other.relay_secret;
		}
		if other.resync_slowmode_secs.is_some() {
			self.resync_slowmode_secs = other.resync_slowmode_secs;
		}
	}

	pub fn finalize(self) -> SyncConfig {
		let defaults = SyncConfig::default();
		SyncConfig {
			consistency_delay_ms: self
				.consistency_delay_ms
				.unwrap_or(defaults.consistency_delay_ms),
			thread_cache_size: self.thread_cache_size.unwrap_or(defaults.thread_cache_size),
			installation_cache_size: self
				.installation_cache_size
				.unwrap_or(defaults.installation_cache_size),
			reply_lookback: self.reply_lookback.unwrap_or(defaults.reply_lookback),
			relay_secret: self.relay_secret,
			resync_slowmode_secs: self
				.resync_slowmode_secs
				.unwrap_or(defaults.resync_slowmode_secs),
		}
	}
}
