// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! REST and webhook payload types. Only fields mikro reads are modelled.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
	pub id: i64,
	pub login: String,
	#[serde(default)]
	pub avatar_url: Option<String>,
	#[serde(rename = "type", default)]
	pub kind: Option<String>,
}

impl User {
	pub fn is_bot(&self) -> bool {
		self.kind.as_deref() == Some("Bot")
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
	pub name: String,
	#[serde(default)]
	pub color: Option<String>,
	#[serde(default)]
	pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueState {
	Open,
	Closed,
}

/// An issue, or the issue view of a pull request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
	pub id: i64,
	pub number: i64,
	pub title: String,
	#[serde(default)]
	pub body: Option<String>,
	pub state: IssueState,
	#[serde(default)]
	pub locked: bool,
	#[serde(default)]
	pub labels: Vec<Label>,
	pub user: User,
	/// Present (as a link object) when the issue is a pull request.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub pull_request: Option<serde_json::Value>,
}

impl Issue {
	pub fn is_closed(&self) -> bool {
		self.state == IssueState::Closed
	}

	pub fn is_pull_request(&self) -> bool {
		self.pull_request.is_some()
	}

	pub fn label_names(&self) -> Vec<String> {
		self.labels.iter().map(|l| l.name.clone()).collect()
	}
}

/// `pull_request` object from pull request webhooks. Its `id` is not the
/// issue id, so handlers key on `number`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullRequest {
	pub id: i64,
	pub number: i64,
	pub title: String,
	#[serde(default)]
	pub body: Option<String>,
	pub state: IssueState,
	#[serde(default)]
	pub locked: bool,
	#[serde(default)]
	pub labels: Vec<Label>,
	pub user: User,
}

impl PullRequest {
	pub fn label_names(&self) -> Vec<String> {
		self.labels.iter().map(|l| l.name.clone()).collect()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
	pub id: i64,
	#[serde(default)]
	pub body: Option<String>,
	pub user: User,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
	pub id: i64,
	pub name: String,
	pub full_name: String,
	#[serde(default)]
	pub private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installation {
	pub id: i64,
}

/// A repository together with the installation that grants access to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedRepository {
	pub repository: Repository,
	pub installation_id: i64,
}

/// Partial `PATCH /repos/{owner}/{repo}/issues/{number}` body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IssueUpdate {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub state: Option<IssueState>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub labels: Option<Vec<String>>,
}

impl IssueUpdate {
	pub fn state(closed: bool) -> Self {
		Self {
			state: Some(if closed {
				IssueState::Closed
			} else {
				IssueState::Open
			}),
			..Self::default()
		}
	}

	pub fn title(title: impl Into<String>) -> Self {
		Self {
			title: Some(title.into()),
			..Self::default()
		}
	}

	pub fn labels(labels: Vec<String>) -> Self {
		Self {
			labels: Some(labels),
			..Self::default()
		}
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccessTokenResponse {
	pub(crate) token: String,
	pub(crate) expires_at: String,
}
