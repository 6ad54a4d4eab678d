// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Error types for the GitHub App client.

use mikro_common_http::RetryableError;
use thiserror::Error;

/// Errors that can occur when talking to the GitHub App API.
#[derive(Debug, Error)]
pub enum GithubAppError {
	/// Network-level error during HTTP communication.
	#[error("Network error: {0}")]
	Network(#[from] reqwest::Error),

	/// Request timed out.
	#[error("Request timed out")]
	Timeout,

	/// Rejected credentials. Installation calls refresh their token once.
	#[error("Unauthorized or invalid app configuration")]
	Unauthorized,

	/// Forbidden - insufficient permissions.
	#[error("Forbidden or insufficient permissions")]
	Forbidden,

	/// Primary or secondary rate limit hit.
	#[error("Rate limit exceeded")]
	RateLimited,

	/// 404 or 410. The issue, comment or repository is gone.
	#[error("Not found: {0}")]
	NotFound(String),

	/// Any other non-success status.
	#[error("GitHub API error: {status} - {message}")]
	ApiError { status: u16, message: String },

	/// Invalid or unparseable response.
	#[error("Invalid response from GitHub: {0}")]
	InvalidResponse(String),

	/// Webhook body that does not decode for its event type.
	#[error("Invalid webhook payload: {0}")]
	InvalidPayload(String),

	/// Configuration error.
	#[error("Configuration error: {0}")]
	Config(String),

	/// JWT signing/encoding error.
	#[error("JWT error: {0}")]
	Jwt(String),

	/// No installation covers the repository.
	#[error("GitHub App not installed for {full_name}")]
	InstallationNotFound { full_name: String },

	/// Webhook signature verification failed.
	#[error("Invalid webhook signature")]
	InvalidWebhookSignature,
}

impl RetryableError for GithubAppError {
	fn is_retryable(&self) -> bool {
		match self {
			GithubAppError::Network(e) => e.is_retryable(),
			GithubAppError::Timeout | GithubAppError::RateLimited => true,
			GithubAppError::ApiError { status, .. } => *status >= 500,
			_ => false,
		}
	}
}

impl GithubAppError {
	/// Create an API error from status code and message.
	pub fn api_error(status: u16, message: impl Into<String>) -> Self {
		Self::ApiError {
			status,
			message: message.into(),
		}
	}

	/// Whether the target is gone, including a missing installation.
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			GithubAppError::NotFound(_) | GithubAppError::InstallationNotFound { .. }
		)
	}
}
