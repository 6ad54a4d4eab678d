// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App webhook endpoint.

use axum::{
	body::Bytes,
	extract::State,
	http::{HeaderMap, StatusCode},
};
use mikro_server_github_app::{parse_webhook_event, WebhookEvent};

use crate::{
	api::AppState,
	error::ServerError,
	signature::{verify_signed_body, GITHUB_SIGNATURE_HEADER},
};

/// POST /webhook - Apply a tracker delivery to the linked thread.
pub async fn tracker_webhook(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<StatusCode, ServerError> {
	verify_signed_body(
		state.webhook_secret.as_deref(),
		&headers,
		GITHUB_SIGNATURE_HEADER,
		&body,
	)?;

	let event_type = headers
		.get("X-GitHub-Event")
		.and_then(|v| v.to_str().ok())
		.ok_or_else(|| ServerError::BadRequest("Missing X-GitHub-Event header".into()))?;

	let event = parse_webhook_event(event_type, &body).map_err(|e| {
		tracing::warn!(event_type, error = %e, "webhook: undecodable payload");
		ServerError::BadRequest(e.to_string())
	})?;

	match &event {
		WebhookEvent::Ping => {
			tracing::info!("webhook: ping");
			return Ok(StatusCode::OK);
		}
		WebhookEvent::Unsupported { event_type } => {
			tracing::debug!(event_type = %event_type, "webhook: ignoring event");
			return Ok(StatusCode::OK);
		}
		_ => {}
	}

	if let (Some(repository), Some(installation_id)) = (event.repository(), event.installation_id()) {
		if let Err(e) = state
			.engine
			.record_installation(repository.id, installation_id)
			.await
		{
			tracing::warn!(
				repository_id = repository.id,
				installation_id,
				error = %e,
				"webhook: could not record installation"
			);
		}
	}

	if !state.consistency_delay.is_zero() {
		tokio::time::sleep(state.consistency_delay).await;
	}

	tracing::debug!(event_type, action = ?event.action(), "webhook: dispatching");
	state.engine.handle_webhook(&event).await.map_err(|e| {
		tracing::error!(event_type, error = %e, "webhook: processing failed");
		ServerError::Internal(e.to_string())
	})?;

	Ok(StatusCode::OK)
}
