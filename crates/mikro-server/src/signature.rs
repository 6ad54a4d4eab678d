// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Request authentication for signed deliveries.

use axum::http::HeaderMap;
use mikro_common_config::SecretString;
use mikro_server_github_app::verify_webhook_signature;

use crate::error::ServerError;

pub const GITHUB_SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub const RELAY_SIGNATURE_HEADER: &str = "X-Mikro-Signature-256";

/// Check the `sha256=` HMAC in `header` against `body`.
///
/// An unset secret means the endpoint is not configured.
pub fn verify_signed_body(
	secret: Option<&SecretString>,
	headers: &HeaderMap,
	header: &str,
	body: &[u8],
) -> Result<(), ServerError> {
	let secret = secret.ok_or_else(|| {
		tracing::error!(header, "signing secret not configured");
		ServerError::ServiceUnavailable("Signing secret is not configured on the server".into())
	})?;

	let signature = headers
		.get(header)
		.and_then(|v| v.to_str().ok())
		.ok_or_else(|| {
			tracing::warn!(header, "missing signature header");
			ServerError::Unauthorized(format!("Missing {header} header"))
		})?;

	verify_webhook_signature(secret.expose(), signature, body).map_err(|e| {
		tracing::warn!(header, error = %e, "signature verification failed");
		ServerError::Unauthorized("Invalid signature".into())
	})
}
