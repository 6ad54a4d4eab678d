// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use std::time::Duration;

use mikro_chat_core::{ChatError, Result};
use mikro_common_config::SecretString;
use mikro_common_http::{retry, RetryConfig};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, trace, warn};

use crate::wire::WireRateLimit;

pub const DEFAULT_API_BASE: &str = "https://discord.com/api/v10";
/// Discord rejects message content longer than this.
pub const MAX_CONTENT_LEN: usize = 2000;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Bot-token Discord REST client.
#[derive(Clone)]
pub struct DiscordClient {
	pub(crate) http_client: Client,
	token: SecretString,
	api_base: String,
	retry_config: RetryConfig,
}

impl std::fmt::Debug for DiscordClient {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("DiscordClient")
			.field("token", &self.token)
			.field("api_base", &self.api_base)
			.finish()
	}
}

impl DiscordClient {
	pub fn new(token: impl Into<String>) -> Result<Self> {
		let http_client = mikro_common_http::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| ChatError::Http(format!("Failed to create HTTP client: {e}")))?;

		Ok(Self {
			http_client,
			token: SecretString::new(token.into()),
			api_base: DEFAULT_API_BASE.to_string(),
			retry_config: RetryConfig::default(),
		})
	}

	pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
		self.api_base = api_base.into().trim_end_matches('/').to_string();
		self
	}

	pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
		self.retry_config = config;
		self
	}

	pub(crate) fn url(&self, path: &str) -> String {
		format!("{}/{}", self.api_base, path.trim_start_matches('/'))
	}

	/// Request authenticated with the bot token.
	pub(crate) fn bot_request(&self, method: Method, path: &str) -> RequestBuilder {
		self
			.http_client
			.request(method, self.url(path))
			.header("Authorization", format!("Bot {}", self.token.expose()))
	}

	/// Request authenticated by a webhook token embedded in the path.
	pub(crate) fn webhook_request(&self, method: Method, path: &str) -> RequestBuilder {
		self.http_client.request(method, self.url(path))
	}

	pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response> {
		let response = request.send().await.map_err(|e| {
			if e.is_timeout() {
				return ChatError::Timeout;
			}
			error!(error = %e, "Network error during Discord request");
			ChatError::Http(e.to_string())
		})?;

		let status = response.status();
		trace!(status = %status, "Discord response");
		if status.is_success() {
			return Ok(response);
		}

		let body = response.text().await.unwrap_or_default();
		Err(map_discord_error(status, &body))
	}

	pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
		let response = self.send(request).await?;
		response.json().await.map_err(|e| {
			error!(error = %e, "Failed to parse Discord response");
			ChatError::InvalidResponse(format!("JSON parse error: {e}"))
		})
	}

	/// GET with the shared retry policy.
	pub(crate) async fn get_json<T: DeserializeOwned>(
		&self,
		path: &str,
		query: &[(&str, String)],
	) -> Result<T> {
		retry(&self.retry_config, || async {
			debug!(path, "Discord GET");
			self
				.send_json(self.bot_request(Method::GET, path).query(query))
				.await
		})
		.await
	}

	/// One-shot mutation. Discord mutations are never replayed.
	pub(crate) async fn bot_json<T: DeserializeOwned>(
		&self,
		method: Method,
		path: &str,
		body: Option<&Value>,
	) -> Result<T> {
		let mut request = self.bot_request(method, path);
		if let Some(body) = body {
			request = request.json(body);
		}
		self.send_json(request).await
	}

	/// Raw attachment bytes from the CDN.
	pub(crate) async fn download_url(&self, url: &str) -> Result<bytes::Bytes> {
		retry(&self.retry_config, || async {
			let response = self.send(self.http_client.get(url)).await?;
			response
				.bytes()
				.await
				.map_err(|e| ChatError::Http(e.to_string()))
		})
		.await
	}
}

pub(crate) fn map_discord_error(status: StatusCode, body: &str) -> ChatError {
	match status.as_u16() {
		404 => ChatError::NotFound(body.to_string()),
		403 => {
			warn!(body = %body, "Discord refused the request");
			ChatError::Forbidden(body.to_string())
		}
		429 => {
			let retry_after_secs = serde_json::from_str::<WireRateLimit>(body)
				.ok()
				.and_then(|r| r.retry_after);
			warn!(?retry_after_secs, "Discord rate limit hit");
			ChatError::RateLimited { retry_after_secs }
		}
		code => {
			error!(status = code, body = %body, "Discord API error");
			ChatError::Api {
				status: code,
				message: body.to_string(),
			}
		}
	}
}

/// Cut `content` to Discord's limit on a character boundary.
pub(crate) fn truncate_content(content: &str) -> String {
	match content.char_indices().nth(MAX_CONTENT_LEN) {
		Some((idx, _)) => content[..idx].to_string(),
		None => content.to_string(),
	}
}
