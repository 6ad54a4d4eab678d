// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Endpoints fed by the Discord gateway relay.

use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use mikro_chat_core::{ChatCommand, ChatEvent};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
	api::AppState,
	error::ServerError,
	signature::{verify_signed_body, RELAY_SIGNATURE_HEADER},
};

#[derive(Debug, Serialize)]
pub struct EventAck {
	pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
	pub ok: bool,
	pub message: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thread_id: Option<i64>,
}

fn decode_relayed<T: DeserializeOwned>(
	state: &AppState,
	headers: &HeaderMap,
	body: &[u8],
) -> Result<T, ServerError> {
	verify_signed_body(
		state.relay_secret.as_deref(),
		headers,
		RELAY_SIGNATURE_HEADER,
		body,
	)?;
	serde_json::from_slice(body).map_err(|e| ServerError::BadRequest(format!("Invalid payload: {e}")))
}

/// POST /api/chat/events - Apply a gateway event.
pub async fn chat_event(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Json<EventAck>, ServerError> {
	let event: ChatEvent = decode_relayed(&state, &headers, &body)?;
	let kind = event.kind();
	tracing::debug!(kind, "chat_event: received");

	state.engine.handle_chat_event(&event).await.map_err(|e| {
		tracing::error!(kind, error = %e, "chat_event: processing failed");
		ServerError::Internal(e.to_string())
	})?;

	Ok(Json(EventAck { ok: true }))
}

/// POST /api/chat/commands - Run a moderator command and report the outcome.
pub async fn chat_command(
	State(state): State<AppState>,
	headers: HeaderMap,
	body: Bytes,
) -> Result<Json<CommandResponse>, ServerError> {
	let command: ChatCommand = decode_relayed(&state, &headers, &body)?;
	let name = command.name();
	tracing::info!(command = name, "chat_command: received");

	let outcome = state.engine.run_command(&command).await.map_err(|e| {
		tracing::warn!(command = name, error = %e, "chat_command: failed");
		ServerError::from(e)
	})?;

	Ok(Json(CommandResponse {
		ok: true,
		message: outcome.message,
		thread_id: outcome.thread_id,
	}))
}
