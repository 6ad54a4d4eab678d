// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use serde::Deserialize;

use crate::sections::{
	DatabaseConfigLayer, DiscordConfigLayer, GithubAppConfigLayer, HttpConfigLayer,
	LoggingConfigLayer, SyncConfigLayer,
};

/// One source's view of the configuration. Absent sections and fields
/// leave lower-precedence values in place.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfigLayer {
	#[serde(default)]
	pub http: Option<HttpConfigLayer>,
	#[serde(default)]
	pub database: Option<DatabaseConfigLayer>,
	#[serde(default)]
	pub logging: Option<LoggingConfigLayer>,
	#[serde(default)]
	pub github_app: Option<GithubAppConfigLayer>,
	#[serde(default)]
	pub discord: Option<DiscordConfigLayer>,
	#[serde(default)]
	pub sync: Option<SyncConfigLayer>,
}

fn merge_section<T>(base: &mut Option<T>, other: Option<T>, merge: impl FnOnce(&mut T, T)) {
	match (base.as_mut(), other) {
		(Some(existing), Some(incoming)) => merge(existing, incoming),
		(None, Some(incoming)) => *base = Some(incoming),
		(_, None) => {}
	}
}

impl ServerConfigLayer {
	pub fn merge(&mut self, other: ServerConfigLayer) {
		merge_section(&mut self.http, other.http, HttpConfigLayer::merge);
		merge_section(&mut self.database, other.database, DatabaseConfigLayer::merge);
		merge_section(&mut self.logging, other.logging, LoggingConfigLayer::merge);
		merge_section(&mut self.github_app, other.github_app, GithubAppConfigLayer::merge);
		merge_section(&mut self.discord, other.discord, DiscordConfigLayer::merge);
		merge_section(&mut self.sync, other.sync, SyncConfigLayer::merge);
	}
}
