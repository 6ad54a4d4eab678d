// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! The issue tracker seam used by the sync engine.

use async_trait::async_trait;

use crate::client::GithubAppClient;
use crate::error::GithubAppError;
use crate::types::{Issue, IssueComment, IssueUpdate, Label, LinkedRepository};

/// Tracker operations the sync engine needs.
///
/// Installation-scoped calls take the installation id alongside the
/// repository's `owner/name`.
#[async_trait]
pub trait IssueTracker: Send + Sync {
	async fn find_repository(&self, full_name: &str) -> Result<LinkedRepository, GithubAppError>;

	async fn get_issue(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
	) -> Result<Issue, GithubAppError>;

	async fn list_issue_comments(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
	) -> Result<Vec<IssueComment>, GithubAppError>;

	async fn list_labels(
		&self,
		installation_id: i64,
		full_name: &str,
	) -> Result<Vec<Label>, GithubAppError>;

	async fn create_comment(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
		body: &str,
	) -> Result<IssueComment, GithubAppError>;

	async fn update_comment(
		&self,
		installation_id: i64,
		full_name: &str,
		comment_id: i64,
		body: &str,
	) -> Result<IssueComment, GithubAppError>;

	async fn delete_comment(
		&self,
		installation_id: i64,
		full_name: &str,
		comment_id: i64,
	) -> Result<(), GithubAppError>;

	async fn update_issue(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
		update: &IssueUpdate,
	) -> Result<Issue, GithubAppError>;

	async fn set_locked(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
		locked: bool,
	) -> Result<(), GithubAppError>;
}

#[async_trait]
impl IssueTracker for GithubAppClient {
	async fn find_repository(&self, full_name: &str) -> Result<LinkedRepository, GithubAppError> {
		GithubAppClient::find_repository(self, full_name).await
	}

	async fn get_issue(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
	) -> Result<Issue, GithubAppError> {
		GithubAppClient::get_issue(self, installation_id, full_name, number).await
	}

	async fn list_issue_comments(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
	) -> Result<Vec<IssueComment>, GithubAppError> {
		GithubAppClient::list_issue_comments(self, installation_id, full_name, number).await
	}

	async fn list_labels(
		&self,
		installation_id: i64,
		full_name: &str,
	) -> Result<Vec<Label>, GithubAppError> {
		GithubAppClient::list_labels(self, installation_id, full_name).await
	}

	async fn create_comment(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		GithubAppClient::create_comment(self, installation_id, full_name, number, body).await
	}

	async fn update_comment(
		&self,
		installation_id: i64,
		full_name: &str,
		comment_id: i64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		GithubAppClient::update_comment(self, installation_id, full_name, comment_id, body).await
	}

	async fn delete_comment(
		&self,
		installation_id: i64,
		full_name: &str,
		comment_id: i64,
	) -> Result<(), GithubAppError> {
		GithubAppClient::delete_comment(self, installation_id, full_name, comment_id).await
	}

	async fn update_issue(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
		update: &IssueUpdate,
	) -> Result<Issue, GithubAppError> {
		GithubAppClient::update_issue(self, installation_id, full_name, number, update).await
	}

	async fn set_locked(
		&self,
		installation_id: i64,
		full_name: &str,
		number: i64,
		locked: bool,
	) -> Result<(), GithubAppError> {
		GithubAppClient::set_locked(self, installation_id, full_name, number, locked).await
	}
}
