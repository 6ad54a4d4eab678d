// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use mikro_server_sync::SyncError;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	#[error("Invalid request: {0}")]
	BadRequest(String),

	#[error("Unauthorized: {0}")]
	Unauthorized(String),

	#[error("Not found: {0}")]
	NotFound(String),

	/// Failed to process a delivery or command.
	#[error("Sync error: {0}")]
	Sync(#[source] SyncError),

	#[error("Internal error: {0}")]
	Internal(String),

	#[error("Service unavailable: {0}")]
	ServiceUnavailable(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl From<SyncError> for ServerError {
	fn from(e: SyncError) -> Self {
		if e.is_user_error() {
			ServerError::BadRequest(e.to_string())
		} else if e.is_not_found() {
			ServerError::NotFound(e.to_string())
		} else {
			ServerError::Sync(e)
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, error, message) = match &self {
			ServerError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg.clone()),
			ServerError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg.clone()),
			ServerError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg.clone()),
			ServerError::Sync(e) => {
				tracing::error!(error = %e, "sync error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					"sync_error",
					"Failed to process the request".to_string(),
				)
			}
			ServerError::Internal(msg) => {
				tracing::error!(error = %msg, "internal error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					"internal_error",
					"An internal error occurred".to_string(),
				)
			}
			ServerError::ServiceUnavailable(msg) => (
				StatusCode::SERVICE_UNAVAILABLE,
				"service_unavailable",
				msg.clone(),
			),
		};

		(
			status,
			Json(ErrorResponse {
				error: error.to_string(),
				message,
			}),
		)
			.into_response()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_errors_are_bad_requests() {
		let err = ServerError::from(SyncError::InvalidRepositoryName("widgets".into()));
		assert!(matches!(err, ServerError::BadRequest(_)));
		assert_eq!(err.into_response().status(), StatusCode::BAD_REQUEST);
	}

	#[test]
	fn missing_links_are_not_found() {
		let err = ServerError::from(SyncError::NotLinked { thread_id: 9 });
		assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
	}

	#[test]
	fn internal_details_are_not_leaked() {
		let response = ServerError::Internal("db path /srv/secret".into()).into_response();
		assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
	}
}
