// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Application state and router.

use std::sync::Arc;
use std::time::Duration;

use axum::{
	routing::{get, post},
	Router,
};
use mikro_common_config::SecretString;
use mikro_server_sync::SyncEngine;
use sqlx::SqlitePool;

use crate::routes;

#[derive(Clone)]
pub struct AppState {
	pub engine: Arc<SyncEngine>,
	pub pool: SqlitePool,
	/// Verifies `X-Hub-Signature-256` on tracker webhooks.
	pub webhook_secret: Option<Arc<SecretString>>,
	/// Verifies `X-Mikro-Signature-256` on gateway relay requests.
	pub relay_secret: Option<Arc<SecretString>>,
	/// Pause before dispatching a webhook so follow-up tracker reads are
	/// consistent with the delivery.
	pub consistency_delay: Duration,
}

impl AppState {
	pub fn new(engine: Arc<SyncEngine>, pool: SqlitePool) -> Self {
		Self {
			engine,
			pool,
			webhook_secret: None,
			relay_secret: None,
			consistency_delay: Duration::ZERO,
		}
	}

	pub fn with_webhook_secret(mut self, secret: Option<SecretString>) -> Self {
		self.webhook_secret = secret.map(Arc::new);
		self
	}

	pub fn with_relay_secret(mut self, secret: Option<SecretString>) -> Self {
		self.relay_secret = secret.map(Arc::new);
		self
	}

	pub fn with_consistency_delay(mut self, delay: Duration) -> Self {
		self.consistency_delay = delay;
		self
	}
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/webhook", post(routes::webhook::tracker_webhook))
		.route("/api/chat/events", post(routes::chat::chat_event))
		.route("/api/chat/commands", post(routes::chat::chat_command))
		.with_state(state)
}
