// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Credentials and endpoint for the GitHub App client.

use mikro_common_config::{Secret, SecretString};
use mikro_common_http::RetryConfig;
use reqwest::Url;
use tracing::warn;

use crate::error::GithubAppError;

/// Public GitHub REST endpoint, used unless an Enterprise URL is set.
pub const DEFAULT_BASE_URL: &str = "https://api.github.com/";

/// GitHub App credentials and endpoint.
///
/// The private key and webhook secret are [`SecretString`]s; `Debug` output
/// is safe to log.
#[derive(Clone)]
pub struct GithubAppConfig {
	/// GitHub App numeric ID
	app_id: u64,

	/// PEM-encoded RSA private key for JWT signing
	private_key_pem: SecretString,

	/// Secret for webhook signature verification
	webhook_secret: Option<SecretString>,

	/// Base URL for the REST API. Always ends with `/` so relative joins keep any `/api/v3` prefix.
	base_url: Url,

	/// Retry policy for reads and token minting
	pub retry_config: RetryConfig,
}

impl std::fmt::Debug for GithubAppConfig {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("GithubAppConfig")
			.field("app_id", &self.app_id)
			.field("private_key_pem", &self.private_key_pem)
			.field("webhook_secret", &self.webhook_secret)
			.field("base_url", &self.base_url.as_str())
			.field("retry_config", &self.retry_config)
			.finish()
	}
}

impl GithubAppConfig {
	/// Parse a base URL. HTTPS with a non-loopback host is required.
	pub fn validate_base_url(raw: &str) -> Result<Url, GithubAppError> {
		let normalized = if raw.ends_with('/') {
			raw.to_string()
		} else {
			format!("{raw}/")
		};
		let url = Url::parse(&normalized)
			.map_err(|e| GithubAppError::Config(format!("Invalid GitHub base URL '{raw}': {e}")))?;

		if url.scheme() != "https" {
			return Err(GithubAppError::Config(format!(
				"GitHub base URL must use https, got '{}'",
				url.scheme()
			)));
		}

		match url.host_str() {
			None => Err(GithubAppError::Config(
				"GitHub base URL must include a host".to_string(),
			)),
			Some("localhost" | "127.0.0.1" | "[::1]") => Err(GithubAppError::Config(
				"GitHub base URL must not be localhost".to_string(),
			)),
			Some(_) => Ok(url),
		}
	}

	/// Configuration for the public GitHub API with default retries.
	pub fn new(app_id: u64, private_key_pem: impl Into<String>) -> Self {
		Self {
			app_id,
			private_key_pem: Secret::new(private_key_pem.into()),
			webhook_secret: None,
			base_url: default_base_url(),
			retry_config: RetryConfig::default(),
		}
	}

	/// GitHub Enterprise endpoint. Invalid URLs are logged and ignored.
	pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
		let raw = url.into();
		match Self::validate_base_url(&raw) {
			Ok(validated) => self.base_url = validated,
			Err(e) => {
				warn!(error = %e, url = %raw, "Invalid base_url, keeping previous value");
			}
		}
		self
	}

	/// Replace the retry policy.
	pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	/// Secret used to verify `X-Hub-Signature-256` on deliveries.
	pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
		self.webhook_secret = Some(Secret::new(secret.into()));
		self
	}

	/// GitHub App numeric ID.
	pub fn app_id(&self) -> u64 {
		self.app_id
	}

	/// The signing key, exposed for JWT generation only.
	pub(crate) fn private_key_pem(&self) -> &str {
		self.private_key_pem.expose()
	}

	/// Webhook secret, if configured.
	pub fn webhook_secret(&self) -> Option<&str> {
		self.webhook_secret.as_ref().map(|s| s.expose().as_str())
	}

	/// Validated REST base URL, with a trailing slash.
	pub fn base_url(&self) -> &Url {
		&self.base_url
	}

	/// Point at a plain-HTTP mock server.
	#[cfg(test)]
	pub(crate) fn with_test_base_url(mut self, raw: &str) -> Self {
		self.base_url = Url::parse(&format!("{}/", raw.trim_end_matches('/'))).unwrap();
		self
	}
}

fn default_base_url() -> Url {
	Url::parse(DEFAULT_BASE_URL).expect("default URL is valid")
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_to_public_github() {
		let config = GithubAppConfig::new(12345, "pem");
		assert_eq!(config.app_id(), 12345);
		assert_eq!(config.private_key_pem(), "pem");
		assert_eq!(config.base_url().as_str(), DEFAULT_BASE_URL);
		assert!(config.webhook_secret().is_none());
	}

	#[test]
	fn enterprise_url_keeps_api_prefix_for_joins() {
		let config =
			GithubAppConfig::new(1, "pem").with_base_url("https://github.example.com/api/v3");
		assert_eq!(
			config.base_url().join("repos/a/b").unwrap().as_str(),
			"https://github.example.com/api/v3/repos/a/b"
		);
	}

	#[test]
	fn insecure_or_local_urls_are_rejected() {
		assert!(GithubAppConfig::validate_base_url("http://api.github.com").is_err());
		assert!(GithubAppConfig::validate_base_url("https://localhost:8443").is_err());
		assert!(GithubAppConfig::validate_base_url("not a url").is_err());

		let config = GithubAppConfig::new(1, "pem").with_base_url("http://insecure.example.com");
		assert_eq!(config.base_url().as_str(), DEFAULT_BASE_URL);
	}

	#[test]
	fn debug_output_is_redacted() {
		let config = GithubAppConfig::new(1, "-----BEGIN KEY-----").with_webhook_secret("whsec-123");
		let debug = format!("{config:?}");
		assert!(!debug.contains("BEGIN KEY"));
		assert!(!debug.contains("whsec-123"));
		assert!(debug.contains("[REDACTED]"));
	}
}
