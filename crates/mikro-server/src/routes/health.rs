// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Liveness endpoint.

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub version: &'static str,
	pub database: &'static str,
}

/// GET /health - 200 when the database answers, 503 otherwise.
pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
	let database_ok = match sqlx::query("SELECT 1").execute(&state.pool).await {
		Ok(_) => true,
		Err(e) => {
			tracing::warn!(error = %e, "health: database check failed");
			false
		}
	};

	let (status, body) = if database_ok {
		(StatusCode::OK, "healthy")
	} else {
		(StatusCode::SERVICE_UNAVAILABLE, "unhealthy")
	};

	(
		status,
		Json(HealthResponse {
			status: body,
			version: env!("CARGO_PKG_VERSION"),
			database: if database_ok { "ok" } else { "error" },
		}),
	)
}
