// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory [`IssueTracker`] and builders for engine tests.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use mikro_server_github_app::{
	GithubAppError, Issue, IssueComment, IssueState, IssueTracker, IssueUpdate, Label,
	LinkedRepository, Repository, User,
};

pub fn user(id: i64, login: &str) -> User {
	User {
		id,
		login: login.into(),
		avatar_url: Some(format!("https://avatars.example/{login}.png")),
		kind: Some("User".into()),
	}
}

pub fn issue(id: i64, number: i64, title: &str) -> Issue {
	Issue {
		id,
		number,
		title: title.into(),
		body: Some(format!("Body of {title}")),
		state: IssueState::Open,
		locked: false,
		labels: Vec::new(),
		user: user(5, "octocat"),
		pull_request: None,
	}
}

pub fn label(name: &str) -> Label {
	Label {
		name: name.into(),
		color: None,
		description: None,
	}
}

pub fn comment(id: i64, login: &str, body: &str) -> IssueComment {
	IssueComment {
		id,
		body: Some(body.into()),
		user: user(6, login),
	}
}

/// A mutation the engine pushed to the tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
	CreateComment { number: i64, body: String },
	UpdateComment { comment_id: i64, body: String },
	DeleteComment { comment_id: i64 },
	UpdateIssue { number: i64, update: IssueUpdate },
	SetLocked { number: i64, locked: bool },
}

#[derive(Default)]
struct TrackerState {
	next_comment_id: i64,
	repositories: BTreeMap<String, LinkedRepository>,
	issues: BTreeMap<(String, i64), Issue>,
	comments: BTreeMap<(String, i64), Vec<IssueComment>>,
	labels: BTreeMap<String, Vec<Label>>,
	calls: Vec<TrackerCall>,
	fail_mutations: bool,
	fail_locking: bool,
}

pub struct FakeIssueTracker {
	state: Mutex<TrackerState>,
}

impl Default for FakeIssueTracker {
	fn default() -> Self {
		Self::new()
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|e| e.into_inner())
}

impl FakeIssueTracker {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(TrackerState {
				next_comment_id: 9_000,
				..TrackerState::default()
			}),
		}
	}

	pub fn add_repository(&self, id: i64, full_name: &str, installation_id: i64) {
		let name = full_name.rsplit('/').next().unwrap_or(full_name);
		lock(&self.state).repositories.insert(
			full_name.into(),
			LinkedRepository {
				repository: Repository {
					id,
					name: name.into(),
					full_name: full_name.into(),
					private: false,
				},
				installation_id,
			},
		);
	}

	pub fn add_issue(&self, full_name: &str, issue: Issue) {
		lock(&self.state)
			.issues
			.insert((full_name.into(), issue.number), issue);
	}

	pub fn add_comment(&self, full_name: &str, number: i64, comment: IssueComment) {
		lock(&self.state)
			.comments
			.entry((full_name.into(), number))
			.or_default()
			.push(comment);
	}

	pub fn add_label(&self, full_name: &str, name: &str) {
		lock(&self.state)
			.labels
			.entry(full_name.into())
			.or_default()
			.push(label(name));
	}

	/// Make comment and issue mutations fail with a server error.
	pub fn fail_mutations(&self, fail: bool) {
		lock(&self.state).fail_mutations = fail;
	}

	/// Make only lock and unlock calls fail.
	pub fn fail_locking(&self, fail: bool) {
		lock(&self.state).fail_locking = fail;
	}

	pub fn calls(&self) -> Vec<TrackerCall> {
		lock(&self.state).calls.clone()
	}

	fn record(&self, call: TrackerCall) -> Result<(), GithubAppError> {
		let mut state = lock(&self.state);
		let failing = state.fail_mutations
			|| (state.fail_locking && matches!(call, TrackerCall::SetLocked { .. }));
		if failing {
			return Err(GithubAppError::ApiError {
				status: 502,
				message: "tracker unavailable".into(),
			});
		}
		state.calls.push(call);
		Ok(())
	}

	fn issue(&self, full_name: &str, number: i64) -> Result<Issue, GithubAppError> {
		lock(&self.state)
			.issues
			.get(&(full_name.to_string(), number))
			.cloned()
			.ok_or_else(|| GithubAppError::NotFound(format!("{full_name}#{number}")))
	}
}

#[async_trait]
impl IssueTracker for FakeIssueTracker {
	async fn find_repository(&self, full_name: &str) -> Result<LinkedRepository, GithubAppError> {
		lock(&self.state)
			.repositories
			.get(full_name)
			.cloned()
			.ok_or_else(|| GithubAppError::InstallationNotFound {
				full_name: full_name.into(),
			})
	}

	async fn get_issue(
		&self,
		_installation_id: i64,
		full_name: &str,
		number: i64,
	) -> Result<Issue, GithubAppError> {
		self.issue(full_name, number)
	}

	async fn list_issue_comments(
		&self,
		_installation_id: i64,
		full_name: &str,
		number: i64,
	) -> Result<Vec<IssueComment>, GithubAppError> {
		Ok(lock(&self.state)
			.comments
			.get(&(full_name.to_string(), number))
			.cloned()
			.unwrap_or_default())
	}

	async fn list_labels(
		&self,
		_installation_id: i64,
		full_name: &str,
	) -> Result<Vec<Label>, GithubAppError> {
		Ok(lock(&self.state)
			.labels
			.get(full_name)
			.cloned()
			.unwrap_or_default())
	}

	async fn create_comment(
		&self,
		_installation_id: i64,
		_full_name: &str,
		number: i64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		self.record(TrackerCall::CreateComment {
			number,
			body: body.into(),
		})?;
		let mut state = lock(&self.state);
		state.next_comment_id += 1;
		Ok(IssueComment {
			id: state.next_comment_id,
			body: Some(body.into()),
			user: user(1, "mikro[bot]"),
		})
	}

	async fn update_comment(
		&self,
		_installation_id: i64,
		_full_name: &str,
		comment_id: i64,
		body: &str,
	) -> Result<IssueComment, GithubAppError> {
		self.record(TrackerCall::UpdateComment {
			comment_id,
			body: body.into(),
		})?;
		Ok(IssueComment {
			id: comment_id,
			body: Some(body.into()),
			user: user(1, "mikro[bot]"),
		})
	}

	async fn delete_comment(
		&self,
		_installation_id: i64,
		_full_name: &str,
		comment_id: i64,
	) -> Result<(), GithubAppError> {
		self.record(TrackerCall::DeleteComment { comment_id })
	}

	async fn update_issue(
		&self,
		_installation_id: i64,
		full_name: &str,
		number: i64,
		update: &IssueUpdate,
	) -> Result<Issue, GithubAppError> {
		self.record(TrackerCall::UpdateIssue {
			number,
			update: update.clone(),
		})?;
		let mut state = lock(&self.state);
		let stored = state
			.issues
			.entry((full_name.to_string(), number))
			.or_insert_with(|| issue(number, number, ""));
		if let Some(s) = update.state {
			stored.state = s;
		}
		if let Some(title) = &update.title {
			stored.title = title.clone();
		}
		if let Some(labels) = &update.labels {
			stored.labels = labels.iter().map(|l| label(l)).collect();
		}
		Ok(stored.clone())
	}

	async fn set_locked(
		&self,
		_installation_id: i64,
		_full_name: &str,
		number: i64,
		locked: bool,
	) -> Result<(), GithubAppError> {
		self.record(TrackerCall::SetLocked { number, locked })
	}
}
