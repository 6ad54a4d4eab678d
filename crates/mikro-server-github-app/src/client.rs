// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App client with JWT authentication and installation token caching.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use mikro_common_http::{retry, RetryConfig};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, error, info, instrument, trace, warn};

use crate::config::GithubAppConfig;
use crate::error::GithubAppError;
use crate::jwt::{generate_app_jwt, JWT_VALIDITY_SECS};
use crate::types::{
	AccessTokenResponse, Installation, Issue, IssueComment, IssueUpdate, Label, LinkedRepository,
	Repository,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Installation tokens are refreshed five minutes before GitHub expires them.
const TOKEN_REFRESH_MARGIN_SECS: u64 = 5 * 60;
const JWT_REFRESH_MARGIN_SECS: u64 = 30;
const PAGE_SIZE: usize = 100;
const API_VERSION: &str = "2022-11-28";

struct CachedToken {
	token: String,
	expires_at: Instant,
}

impl CachedToken {
	fn new(token: String, valid_for: Duration) -> Self {
		Self {
			token,
			expires_at: Instant::now() + valid_for,
		}
	}

	fn is_valid(&self, margin: Duration) -> bool {
		Instant::now() + margin < self.expires_at
	}
}

#[derive(Default)]
struct MintLock {
	mutex: Arc<Mutex<()>>,
	/// Holders plus waiters. Only changed while the map lock is held.
	users: AtomicUsize,
}

type MintLocks = Arc<StdMutex<HashMap<i64, Arc<MintLock>>>>;

fn lock_mint_map(locks: &MintLocks) -> MutexGuard<'_, HashMap<i64, Arc<MintLock>>> {
	locks.lock().unwrap_or_else(|e| e.into_inner())
}

/// Serializes token minting for one installation. The map entry is removed
/// when the last holder or waiter goes away.
struct MintGuard {
	installation_id: i64,
	entry: Arc<MintLock>,
	locks: MintLocks,
	held: Option<OwnedMutexGuard<()>>,
}

impl Drop for MintGuard {
	fn drop(&mut self) {
		let mut map = lock_mint_map(&self.locks);
		self.held.take();
		if self.entry.users.fetch_sub(1, Ordering::SeqCst) == 1
			&& map
				.get(&self.installation_id)
				.is_some_and(|current| Arc::ptr_eq(current, &self.entry))
		{
			map.remove(&self.installation_id);
		}
	}
}

/// One REST call, replayable after a token refresh.
struct ApiRequest {
	method: Method,
	path: String,
	query: Vec<(&'static str, String)>,
	body: Option<Value>,
}

impl ApiRequest {
	fn new(method: Method, path: String) -> Self {
		Self {
			method,
			path,
			query: Vec::new(),
			body: None,
		}
	}

	fn query(mut self, key: &'static str, value: impl ToString) -> Self {
		self.query.push((key, value.to_string()));
		self
	}

	fn json(mut self, body: Value) -> Self {
		self.body = Some(body);
		self
	}
}

/// Client for the GitHub App REST API.
///
/// Reads go through the shared retry helper; mutations are sent once. Every
/// installation-scoped call refreshes its token once on 401.
#[derive(Clone)]
pub struct GithubAppClient {
	http_client: Client,
	config: GithubAppConfig,
	app_jwt_cache: Arc<Mutex<Option<CachedToken>>>,
	installation_token_cache: Arc<Mutex<HashMap<i64, CachedToken>>>,
	app_jwt_lock: Arc<Mutex<()>>,
	/// Serializes token minting per installation.
	token_locks: MintLocks,
}

impl GithubAppClient {
	pub fn new(config: GithubAppConfig) -> Result<Self, GithubAppError> {
		let http_client = mikro_common_http::builder()
			.timeout(REQUEST_TIMEOUT)
			.build()
			.map_err(|e| GithubAppError::Config(format!("Failed to create HTTP client: {e}")))?;

		info!(
			app_id = config.app_id(),
			base_url = %config.base_url(),
			"Created GitHub App client"
		);

		Ok(Self {
			http_client,
			config,
			app_jwt_cache: Arc::new(Mutex::new(None)),
			installation_token_cache: Arc::new(Mutex::new(HashMap::new())),
			app_jwt_lock: Arc::new(Mutex::new(())),
			token_locks: MintLocks::default(),
		})
	}

	pub fn retry_config(&self) -> &RetryConfig {
		&self.config.retry_config
	}

	pub fn webhook_secret(&self) -> Option<&str> {
		self.config.webhook_secret()
	}

	async fn lock_minting(&self, installation_id: i64) -> MintGuard {
		let entry = {
			let mut map = lock_mint_map(&self.token_locks);
			let entry = Arc::clone(map.entry(installation_id).or_default());
			entry.users.fetch_add(1, Ordering::SeqCst);
			entry
		};

		let mut guard = MintGuard {
			installation_id,
			entry: Arc::clone(&entry),
			locks: Arc::clone(&self.token_locks),
			held: None,
		};
		guard.held = Some(Arc::clone(&entry.mutex).lock_owned().await);
		guard
	}

	async fn invalidate_installation_token(&self, installation_id: i64) {
		let mut cache = self.installation_token_cache.lock().await;
		if cache.remove(&installation_id).is_some() {
			info!(installation_id, "Invalidated installation token cache");
		}
	}

	async fn invalidate_app_jwt(&self) {
		let mut cache = self.app_jwt_cache.lock().await;
		if cache.take().is_some() {
			info!("Invalidated App JWT cache");
		}
	}

	#[instrument(skip(self))]
	async fn get_app_jwt(&self) -> Result<String, GithubAppError> {
		let margin = Duration::from_secs(JWT_REFRESH_MARGIN_SECS);
		{
			let cache = self.app_jwt_cache.lock().await;
			if let Some(cached) = cache.as_ref().filter(|c| c.is_valid(margin)) {
				trace!("Using cached App JWT");
				return Ok(cached.token.clone());
			}
		}

		let _guard = self.app_jwt_lock.lock().await;

		// Another task may have minted one while we waited.
		{
			let cache = self.app_jwt_cache.lock().await;
			if let Some(cached) = cache.as_ref().filter(|c| c.is_valid(margin)) {
				return Ok(cached.token.clone());
			}
		}

		debug!(app_id = self.config.app_id(), "Generating new App JWT");
		let jwt = generate_app_jwt(self.config.app_id(), self.config.private_key_pem())?;

		*self.app_jwt_cache.lock().await = Some(CachedToken::new(
			jwt.clone(),
			Duration::from_secs(JWT_VALIDITY_SECS),
		));
		Ok(jwt)
	}

	#[instrument(skip(self))]
	pub(crate) async fn get_installation_token(
		&self,
		installation_id: i64,
	) -> Result<String, GithubAppError> {
		let margin = Duration::from_secs(TOKEN_REFRESH_MARGIN_SECS);
		{
			let cache = self.installation_token_cache.lock().await;
			if let Some(cached) = cache.get(&installation_id).filter(|c| c.is_valid(margin)) {
				trace!(installation_id, "Using cached installation token");
				return Ok(cached.token.clone());
			}
		}

		let _minting = self.lock_minting(installation_id).await;

		{
			let cache = self.installation_token_cache.lock().await;
			if let Some(cached) = cache.get(&installation_id).filter(|c| c.is_valid(margin)) {
				return Ok(cached.token.clone());
			}
		}

		debug!(installation_id, "Fetching new installation token");
		let (token, valid_for) = retry(&self.config.retry_config, || {
			self.fetch_installation_token(installation_id)
		})
		.await?;

		self
			.installation_token_cache
			.lock()
			.await
			.insert(installation_id, CachedToken::new(token.clone(), valid_for));

		info!(installation_id, "Installation token refreshed");
		Ok(token)
	}

	async fn fetch_installation_token(
		&self,
		installation_id: i64,
	) -> Result<(String, Duration), GithubAppError> {
		let jwt = self.get_app_jwt().await?;
		let request = ApiRequest::new(
			Method::POST,
			format!("app/installations/{installation_id}/access_tokens"),
		);

		match self.execute(&jwt, &request).await {
			Ok(response) => {
				let token: AccessTokenResponse = parse_json(response).await?;
				let valid_for = parse_expiry_duration(&token.expires_at)?;
				Ok((token.token, valid_for))
			}
			Err(GithubAppError::Unauthorized) => {
				self.invalidate_app_jwt().await;
				Err(GithubAppError::Unauthorized)
			}
			Err(e) => Err(e),
		}
	}

	fn url(&self, request: &ApiRequest) -> Result<Url, GithubAppError> {
		let mut url = self
			.config
			.base_url()
			.join(&request.path)
			.map_err(|e| GithubAppError::Config(format!("Invalid URL: {e}")))?;
		if !request.query.is_empty() {
			let mut pairs = url.query_pairs_mut();
			for (key, value) in &request.query {
				pairs.append_pair(key, value);
			}
		}
		Ok(url)
	}

	/// Send `request` with `bearer` and map non-2xx statuses to errors.
	async fn execute(&self, bearer: &str, request: &ApiRequest) -> Result<Response, GithubAppError> {
		let url = self.url(request)?;
		debug!(method = %request.method, url = %url, "GitHub request");

		let mut builder = self
			.http_client
			.request(request.method.clone(), url)
			.header("Authorization", format!("Bearer {bearer}"))
			.header("Accept", "application/vnd.github+json")
			.header("X-GitHub-Api-Version", API_VERSION);
		if let Some(body) = &request.body {
			builder = builder.json(body);
		}

		let response = builder.send().await.map_err(|e| {
			if e.is_timeout() {
				return GithubAppError::Timeout;
			}
			GithubAppError::Network(e)
		})?;

		let status = response.status();
		if !status.is_success() {
			let body = response.text().await.unwrap_or_default();
			return Err(map_github_error(status, &body));
		}
		Ok(response)
	}

	/// Execute with the installation's token, refreshing it once on 401.
	async fn execute_for_installation(
		&self,
		installation_id: i64,
		request: &ApiRequest,
	) -> Result<Response, GithubAppError> {
		let token = self.get_installation_token(installation_id).await?;

		match self.execute(&token, request).await {
			Err(GithubAppError::Unauthorized) => {
				info!(installation_id, "Got 401, refreshing installation token");
				self.invalidate_installation_token(installation_id).await;
				let fresh = self.get_installation_token(installation_id).await?;
				self.execute(&fresh, request).await
			}
			other => other,
		}
	}

	async fn read<T: DeserializeOwned>(
		&self,
		installation_id: i64,
		request: ApiRequest,
	) -> Result<T, GithubAppError> {
		retry(&self.config.retry_config, || async {
			let response = self.execute_for_installation(installation_id, &request).await?;
			parse_json(response).await
		})
		.await
	}

	async fn read_all_pages<T: DeserializeOwned>(
		&self,
		installation_id: i64,
		path: String,
	) -> Result<Vec<T>, GithubAppError> {
		let mut items = Vec::new();
		for page in 1.. {
			let request = ApiRequest::new(Method::GET, path.clone())
				.query("per_page", PAGE_SIZE)
				.query("page", page);
			let batch: Vec<T> = self.read(installation_id, request).await?;
			let last = batch.len() < PAGE_SIZE;
			items.extend(batch);
			if last {
				break;
			}
		}
		Ok(items)
	}

	async fn mutate<T: DeserializeOwned>(
		&self,
		installation_id: i64,
		request: ApiRequest,
	) -> Result<T, GithubAppError> {
		let response = self.execute_for_installation(installation_id, &request).await?;
		parse_json(response).await
	}

	async fn mutate_no_content(
		&self,
		installation_id: i64,
		request: ApiRequest,
	) -> Result<(), GithubAppError> {
		self.execute_for_installation(installation_id, &request).await?;
		Ok(())
	}

	/// Installation that covers `full_name`, authenticated as the app.
	#[instrument(skip(self))]
	pub async fn get_repo_installation(&self, full_name: &str) -> Result<Installation, GithubAppError> {
		let request = ApiRequest::new(Method::GET, format!("{}/installation", repo_path(full_name)?));
		let result = retry(&self.config.retry_config, || async {
			let jwt = self.get_app_jwt().await?;
			parse_json(self.execute(&jwt, &request).await?).await
		})
		.await;

		match result {
			Err(GithubAppError::NotFound(_)) => Err(GithubAppError::InstallationNotFound {
				full_name: full_name.to_string(),
			}),
			other => other,
		}
	}

	#[instrument(skip(self))]
	pub async fn get_repository(
		&self,
		installation_id: i64,
		full_name: &str,
	) -> Result<Repository, GithubAppError> {
		let request = ApiRequest::new(Method::GET, repo_path(full_name)?);
		self.read(installation_id, request).await
	}

	/// Resolve the installation and repository metadata for `full_name`.
	pub async fn find_repository(&self, full_name: &str) -> Result<LinkedRepository, GithubAppError> {
		let installation = self.get_repo_installation(full_name).await?;
		let repository = self.get_repository(installation.id, full_name).await?;
		info!(
			repository_id = repository.id,
			installation_id = installation.id,
			"Repository installation found"
		);
		Ok(LinkedRepository {
			repository,
			installation_id: installation.id,
		})
	}

	#[instrument(skip(self))]
	pub async fn get_issue(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
	) -> Result<Issue, GithubAppError> {
		let request = ApiRequest::new(Method::GET, format!("{}/issues/{number}", repo_path(full_name)?));
		self.read(installation_id, request).await
	}

	#[instrument(skip(self))]
	pub async fn list_issue_comments(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
	) -> Result<Vec<IssueComment>, GithubAppError> {
		let path = format!("{}/issues/{number}/comments", repo_path(full_name)?);
		self.read_all_pages(installation_id, path).await
	}

	#[instrument(skip(self))]
	pub async fn list_labels(
		&self,
		installation_id: i64,
		full_name: &str,
	) -> Result<Vec<Label>, GithubAppError> {
		let path = format!("{}/labels", repo_path(full_name)?);
		self.read_all_pages(installation_id, path).await
	}

	#[instrument(skip(self, body))]
	pub async fn create_comment(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		let request = ApiRequest::new(
			Method::POST,
			format!("{}/issues/{number}/comments", repo_path(full_name)?),
		)
		.json(serde_json::json!({ "body": body }));
		self.mutate(installation_id, request).await
	}

	#[instrument(skip(self, body))]
	pub async fn update_comment(
		&self,
		installation_id: i64,
		full_name: &str,
		comment_id: i64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		let request = ApiRequest::new(
			Method::PATCH,
			format!("{}/issues/comments/{comment_id}", repo_path(full_name)?),
		)
		.json(serde_json::json!({ "body": body }));
		self.mutate(installation_id, request).await
	}

	#[instrument(skip(self))]
	pub async fn delete_comment(
		&self,
		installation_id: i64,
		full_name: &str,
		comment_id: i64,
	) -> Result<(), GithubAppError> {
		let request = ApiRequest::new(
			Method::DELETE,
			format!("{}/issues/comments/{comment_id}", repo_path(full_name)?),
		);
		self.mutate_no_content(installation_id, request).await
	}

	#[instrument(skip(self))]
	pub async fn update_issue(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
		update: &IssueUpdate,
	) -> Result<Issue, GithubAppError> {
		let body = serde_json::to_value(update)
			.map_err(|e| GithubAppError::InvalidPayload(format!("issue update: {e}")))?;
		let request = ApiRequest::new(Method::PATCH, format!("{}/issues/{number}", repo_path(full_name)?))
			.json(body);
		self.mutate(installation_id, request).await
	}

	/// Lock (as resolved) or unlock an issue conversation.
	#[instrument(skip(self))]
	pub async fn set_locked(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
		locked: bool,
	) -> Result<(), GithubAppError> {
		let path = format!("{}/issues/{number}/lock", repo_path(full_name)?);
		let request = if locked {
			ApiRequest::new(Method::PUT, path).json(serde_json::json!({ "lock_reason": "resolved" }))
		} else {
			ApiRequest::new(Method::DELETE, path)
		};
		self.mutate_no_content(installation_id, request).await
	}

	pub fn generate_app_jwt(&self) -> Result<String, GithubAppError> {
		generate_app_jwt(self.config.app_id(), self.config.private_key_pem())
	}

	#[cfg(test)]
	pub(crate) async fn seed_installation_token(&self, installation_id: i64, token: &str) {
		self
			.installation_token_cache
			.lock()
			.await
			.insert(installation_id, CachedToken::new(token.to_string(), Duration::from_secs(3600)));
	}

	#[cfg(test)]
	pub(crate) async fn seed_app_jwt(&self, jwt: &str) {
		*self.app_jwt_cache.lock().await =
			Some(CachedToken::new(jwt.to_string(), Duration::from_secs(600)));
	}

	#[cfg(test)]
	pub(crate) fn mint_lock_count(&self) -> usize {
		lock_mint_map(&self.token_locks).len()
	}
}

/// `repos/{owner}/{repo}` with both segments percent-encoded.
fn repo_path(full_name: &str) -> Result<String, GithubAppError> {
	match full_name.split_once('/') {
		Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => Ok(
			format!(
				"repos/{}/{}",
				urlencoding::encode(owner),
				urlencoding::encode(repo)
			),
		),
		_ => Err(GithubAppError::Config(format!(
			"Invalid repository name '{full_name}', expected owner/name"
		))),
	}
}

async fn parse_json<T: DeserializeOwned>(response: Response) -> Result<T, GithubAppError> {
	response.json().await.map_err(|e| {
		error!(error = %e, "Failed to parse GitHub response");
		GithubAppError::InvalidResponse(format!("JSON parse error: {e}"))
	})
}

pub(crate) fn map_github_error(status: StatusCode, body: &str) -> GithubAppError {
	let status_code = status.as_u16();

	match status_code {
		401 => {
			warn!(status = status_code, "Unauthorized request to GitHub");
			GithubAppError::Unauthorized
		}
		403 | 429 => {
			let lower = body.to_lowercase();
			if status_code == 429 || lower.contains("rate limit") || lower.contains("api rate") {
				warn!(status = status_code, "GitHub rate limit exceeded");
				GithubAppError::RateLimited
			} else {
				warn!(status = status_code, "Forbidden request to GitHub");
				GithubAppError::Forbidden
			}
		}
		404 | 410 => {
			debug!(status = status_code, "GitHub resource not found");
			GithubAppError::NotFound(body.to_string())
		}
		_ => {
			error!(status = status_code, body = %body, "GitHub API error");
			GithubAppError::api_error(status_code, body)
		}
	}
}

pub(crate) fn parse_expiry_duration(expires_at: &str) -> Result<Duration, GithubAppError> {
	let expires_at_dt: DateTime<Utc> = expires_at.parse().map_err(|e| {
		GithubAppError::InvalidResponse(format!("Invalid expires_at: {expires_at} - {e}"))
	})?;

	Ok(expires_at_dt
		.signed_duration_since(Utc::now())
		.to_std()
		.unwrap_or(Duration::ZERO))
}
