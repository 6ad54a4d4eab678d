// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use mikro_common_http::RetryableError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChatError>;

/// Errors from a chat platform adapter.
#[derive(Debug, Error)]
pub enum ChatError {
	#[error("HTTP error: {0}")]
	Http(String),

	#[error("Request timed out")]
	Timeout,

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Missing permissions: {0}")]
	Forbidden(String),

	#[error("Rate limited: retry after {retry_after_secs:?} seconds")]
	RateLimited { retry_after_secs: Option<f64> },

	#[error("Chat API error: {status} - {message}")]
	Api { status: u16, message: String },

	#[error("Invalid response: {0}")]
	InvalidResponse(String),

	#[error("Invalid request: {0}")]
	InvalidRequest(String),
}

impl ChatError {
	pub fn is_not_found(&self) -> bool {
		matches!(self, ChatError::NotFound(_))
	}
}

impl RetryableError for ChatError {
	fn is_retryable(&self) -> bool {
		match self {
			ChatError::Timeout | ChatError::RateLimited { .. } => true,
			ChatError::Api { status, .. } => *status >= 500,
			_ => false,
		}
	}
}

/// Fatal replication failures. A failed attachment download is not one of
/// them; it only drops the attachment.
#[derive(Debug, Error)]
pub enum ReplicateError {
	#[error("Could not establish webhook in channel {channel_id}: {source}")]
	Webhook {
		channel_id: i64,
		#[source]
		source: ChatError,
	},

	#[error("Webhook execution failed: {0}")]
	Execute(#[source] ChatError),
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn only_transient_errors_retry() {
		assert!(ChatError::Timeout.is_retryable());
		assert!(ChatError::RateLimited {
			retry_after_secs: Some(1.5)
		}
		.is_retryable());
		assert!(ChatError::Api {
			status: 503,
			message: "unavailable".into()
		}
		.is_retryable());
		assert!(!ChatError::NotFound("message".into()).is_retryable());
		assert!(!ChatError::Forbidden("send".into()).is_retryable());
	}
}
