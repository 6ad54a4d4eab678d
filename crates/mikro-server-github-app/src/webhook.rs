// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Webhook authentication and payload decoding.
//!
//! Deliveries carry `X-GitHub-Event` (the event type) and
//! `X-Hub-Signature-256` (`sha256=<hex hmac of the raw body>`). The same
//! signature scheme authenticates the chat gateway relay.

use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use tracing::{debug, warn};

use crate::error::GithubAppError;
use crate::types::{Installation, Issue, IssueComment, Label, PullRequest, Repository};

type HmacSha256 = Hmac<Sha256>;

const SIGNATURE_PREFIX: &str = "sha256=";

/// Check `signature_header` against the HMAC of `body`. Comparison is
/// constant time.
pub fn verify_webhook_signature(
	secret: &str,
	signature_header: &str,
	body: &[u8],
) -> Result<(), GithubAppError> {
	let Some(expected_hex) = signature_header.strip_prefix(SIGNATURE_PREFIX) else {
		warn!("Invalid webhook signature format: missing 'sha256=' prefix");
		return Err(GithubAppError::InvalidWebhookSignature);
	};

	let Ok(expected) = hex::decode(expected_hex) else {
		warn!("Invalid webhook signature format: not hex");
		return Err(GithubAppError::InvalidWebhookSignature);
	};

	let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
		.map_err(|_| GithubAppError::InvalidWebhookSignature)?;
	mac.update(body);

	if mac.verify_slice(&expected).is_ok() {
		debug!("Webhook signature verified");
		Ok(())
	} else {
		warn!("Webhook signature verification failed");
		Err(GithubAppError::InvalidWebhookSignature)
	}
}

/// `sha256=<hex>` for `body`. Used by the relay client and by tests.
pub fn compute_webhook_signature(secret: &str, body: &[u8]) -> String {
	let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC takes any key size");
	mac.update(body);
	format!("{SIGNATURE_PREFIX}{}", hex::encode(mac.finalize().into_bytes()))
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssuesEvent {
	pub action: String,
	pub issue: Issue,
	pub repository: Repository,
	#[serde(default)]
	pub installation: Option<Installation>,
	#[serde(default)]
	pub label: Option<Label>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IssueCommentEvent {
	pub action: String,
	pub issue: Issue,
	pub comment: IssueComment,
	pub repository: Repository,
	#[serde(default)]
	pub installation: Option<Installation>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PullRequestEvent {
	pub action: String,
	pub number: i64,
	pub pull_request: PullRequest,
	pub repository: Repository,
	#[serde(default)]
	pub installation: Option<Installation>,
}

#[derive(Debug, Clone)]
pub enum WebhookEvent {
	Ping,
	Issues(IssuesEvent),
	IssueComment(IssueCommentEvent),
	PullRequest(PullRequestEvent),
	Unsupported { event_type: String },
}

impl WebhookEvent {
	pub fn repository(&self) -> Option<&Repository> {
		match self {
			WebhookEvent::Issues(e) => Some(&e.repository),
			WebhookEvent::IssueComment(e) => Some(&e.repository),
			WebhookEvent::PullRequest(e) => Some(&e.repository),
			WebhookEvent::Ping | WebhookEvent::Unsupported { .. } => None,
		}
	}

	pub fn installation_id(&self) -> Option<i64> {
		let installation = match self {
			WebhookEvent::Issues(e) => e.installation.as_ref(),
			WebhookEvent::IssueComment(e) => e.installation.as_ref(),
			WebhookEvent::PullRequest(e) => e.installation.as_ref(),
			WebhookEvent::Ping | WebhookEvent::Unsupported { .. } => None,
		};
		installation.map(|i| i.id)
	}

	pub fn action(&self) -> Option<&str> {
		match self {
			WebhookEvent::Issues(e) => Some(&e.action),
			WebhookEvent::IssueComment(e) => Some(&e.action),
			WebhookEvent::PullRequest(e) => Some(&e.action),
			WebhookEvent::Ping | WebhookEvent::Unsupported { .. } => None,
		}
	}
}

/// Decode a delivery body according to its `X-GitHub-Event` header.
pub fn parse_webhook_event(event_type: &str, body: &[u8]) -> Result<WebhookEvent, GithubAppError> {
	fn decode<T: for<'de> Deserialize<'de>>(event_type: &str, body: &[u8]) -> Result<T, GithubAppError> {
		serde_json::from_slice(body)
			.map_err(|e| GithubAppError::InvalidPayload(format!("{event_type}: {e}")))
	}

	Ok(match event_type {
		"ping" => WebhookEvent::Ping,
		"issues" => WebhookEvent::Issues(decode(event_type, body)?),
		"issue_comment" => WebhookEvent::IssueComment(decode(event_type, body)?),
		"pull_request" => WebhookEvent::PullRequest(decode(event_type, body)?),
		other => WebhookEvent::Unsupported {
			event_type: other.to_string(),
		},
	})
}
