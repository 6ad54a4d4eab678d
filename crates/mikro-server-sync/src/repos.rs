// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Repository linking and issue-to-thread creation.

use std::collections::BTreeSet;

use mikro_chat_core::{Identity, ThreadEdit};
use mikro_server_db::{
	CommentRecord, DbError, IssueRecord, RepositoryRecord, ThreadRecord, TrackerUser,
	ISSUE_BODY_COMMENT_ID,
};
use mikro_server_github_app::Issue;
use tracing::{info, instrument, warn};

use crate::content::tracker_body;
use crate::engine::{LinkedRepo, SyncEngine};
use crate::error::{Result, SyncError};
use crate::reconcile::format_thread_title;

/// Result of a full issue resync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueSync {
	pub thread_id: i64,
	/// Tracker comments newly mirrored by this run.
	pub replicated: usize,
}

impl SyncEngine {
	/// Link `owner/name` to a forum and mirror its labels as forum tags.
	#[instrument(skip(self))]
	pub async fn add_repo(
		&self,
		full_name: &str,
		guild_id: i64,
		forum_id: i64,
	) -> Result<RepositoryRecord> {
		if full_name.matches('/').count() != 1 {
			return Err(SyncError::InvalidRepositoryName(full_name.to_string()));
		}

		let linked = self.tracker.find_repository(full_name).await.map_err(|e| {
			warn!(error = %e, "repository lookup failed");
			SyncError::RepositoryNotFound(full_name.to_string())
		})?;

		let repository = &linked.repository;
		if self
			.correlations
			.get_repository(repository.id)
			.await?
			.is_some()
		{
			return Err(SyncError::AlreadyLinked(repository.full_name.clone()));
		}

		let record = RepositoryRecord {
			repository_id: repository.id,
			name: repository.name.clone(),
			full_name: repository.full_name.clone(),
			guild_id,
			forum_id,
			installation_id: Some(linked.installation_id),
		};
		match self.correlations.insert_repository(&record).await {
			Ok(()) => {}
			Err(DbError::Conflict(_)) => return Err(SyncError::AlreadyLinked(record.full_name)),
			Err(e) => return Err(e.into()),
		}
		self
			.record_installation(record.repository_id, linked.installation_id)
			.await?;
		info!(repository_id = record.repository_id, forum_id, "repository linked");

		let repo = LinkedRepo {
			record: record.clone(),
			installation_id: linked.installation_id,
		};
		self.sync_repo_labels(&repo).await?;
		Ok(record)
	}

	async fn linked_by_name(&self, full_name: &str) -> Result<LinkedRepo> {
		let record = self
			.correlations
			.get_repository_by_name(full_name)
			.await?
			.ok_or_else(|| SyncError::RepositoryNotLinked {
				full_name: full_name.to_string(),
			})?;
		self.linked_repo(record.repository_id).await
	}

	/// Create a moderated forum tag for every tracker label the forum lacks.
	/// Returns how many were created.
	pub async fn sync_labels(&self, full_name: &str) -> Result<usize> {
		let repo = self.linked_by_name(full_name).await?;
		self.sync_repo_labels(&repo).await
	}

	async fn sync_repo_labels(&self, repo: &LinkedRepo) -> Result<usize> {
		let labels = self
			.tracker
			.list_labels(repo.installation_id, &repo.record.full_name)
			.await?;
		let mut existing: BTreeSet<String> = self
			.platform
			.forum_tags(repo.record.forum_id)
			.await?
			.into_iter()
			.map(|t| t.name)
			.collect();

		let mut created = 0;
		for label in labels {
			if existing.contains(&label.name) {
				continue;
			}
			self
				.platform
				.create_forum_tag(repo.record.forum_id, &label.name, true)
				.await?;
			existing.insert(label.name);
			created += 1;
		}
		info!(full_name = %repo.record.full_name, created, "labels synced");
		Ok(created)
	}

	/// The issue's thread, creating the forum post and its rows on first
	/// sight.
	#[instrument(skip(self, repo, issue), fields(issue_id = issue.id, number = issue.number))]
	pub async fn create_or_get_issue_thread(
		&self,
		repo: &LinkedRepo,
		issue: &Issue,
	) -> Result<ThreadRecord> {
		if let Some(record) = self.correlations.get_issue(issue.id).await? {
			return self.registry.get(record.thread_id).await;
		}

		let creation_lock = self.registry.creation_lock();
		let _creating = creation_lock.lock().await;
		if let Some(record) = self.correlations.get_issue(issue.id).await? {
			return self.registry.get(record.thread_id).await;
		}

		let forum_id = repo.record.forum_id;
		let title = format_thread_title(&repo.record.name, &issue.title);
		let wanted: BTreeSet<String> = issue.label_names().into_iter().collect();
		let mut tags: Vec<(i64, String)> = match self.platform.forum_tags(forum_id).await {
			Ok(tags) => tags
				.into_iter()
				.filter(|t| wanted.contains(&t.name))
				.map(|t| (t.id, t.name))
				.collect(),
			Err(e) => {
				warn!(forum_id, error = %e, "forum tags unavailable; posting untagged");
				Vec::new()
			}
		};
		tags.sort();
		let tag_ids: Vec<i64> = tags.iter().map(|(id, _)| *id).collect();
		let mut labels: Vec<String> = tags.into_iter().map(|(_, name)| name).collect();
		labels.sort();

		let body = tracker_body(issue.body.as_deref());
		let identity = Identity::new(&issue.user.login, issue.user.avatar_url.clone());
		let post = self
			.replicator
			.create_forum_post(forum_id, &title, &identity, body, tag_ids)
			.await?;
		let thread_id = post.channel_id;

		let thread = ThreadRecord {
			thread_id,
			guild_id: repo.record.guild_id,
			channel_id: forum_id,
			owner_id: post.author.id,
			title,
			starting_message: Some(body.to_string()),
			tags: labels.clone(),
			description: None,
			disable_archive: false,
			public: true,
			last_message_id: Some(post.id),
		};
		self.registry.sync(&thread, false).await?;

		self
			.correlations
			.upsert_tracker_user(&TrackerUser {
				id: issue.user.id,
				login: issue.user.login.clone(),
				avatar_url: issue.user.avatar_url.clone(),
			})
			.await?;
		self
			.correlations
			.insert_issue(&IssueRecord {
				issue_id: issue.id,
				repository_id: repo.record.repository_id,
				thread_id,
				number: issue.number,
				pull_request: issue.is_pull_request(),
				closed: issue.is_closed(),
				locked: issue.locked,
				labels,
				author_id: issue.user.id,
				title: issue.title.clone(),
			})
			.await?;
		self
			.correlations
			.insert_comment(&CommentRecord {
				issue_id: issue.id,
				comment_id: ISSUE_BODY_COMMENT_ID,
				github_origin: true,
				guild_id: post.guild_id.unwrap_or(repo.record.guild_id),
				channel_id: thread_id,
				message_id: post.id,
				content: body.to_string(),
			})
			.await?;
		info!(thread_id, "issue thread created");

		if issue.is_closed() || issue.locked {
			let edit = ThreadEdit {
				archived: issue.is_closed().then_some(true),
				locked: issue.locked.then_some(true),
				..ThreadEdit::default()
			};
			if let Err(e) = self.platform.edit_thread(thread_id, &edit).await {
				warn!(thread_id, error = %e, "could not apply issue state to new thread");
			}
		}

		Ok(thread)
	}

	/// Fetch an issue, make sure it has a thread and mirror any comments
	/// that are not there yet.
	#[instrument(skip(self))]
	pub async fn sync_full_issue(&self, full_name: &str, number: i64) -> Result<IssueSync> {
		let repo = self.linked_by_name(full_name).await?;
		let issue = self
			.tracker
			.get_issue(repo.installation_id, &repo.record.full_name, number)
			.await?;
		let thread = self.create_or_get_issue_thread(&repo, &issue).await?;

		let slowmode = ThreadEdit {
			rate_limit_per_user: Some(self.settings.resync_slowmode_secs),
			..ThreadEdit::default()
		};
		if let Err(e) = self.platform.edit_thread(thread.thread_id, &slowmode).await {
			warn!(thread_id = thread.thread_id, error = %e, "could not set slowmode");
		}

		let comments = self
			.tracker
			.list_issue_comments(repo.installation_id, &repo.record.full_name, number)
			.await?;
		let record = self
			.correlations
			.get_issue(issue.id)
			.await?
			.ok_or(SyncError::NotLinked {
				thread_id: thread.thread_id,
			})?;

		let _guard = self.locks.acquire(repo.installation_id).await;
		let mut replicated = 0;
		for comment in &comments {
			if self.mirror_comment(&record, comment).await? {
				replicated += 1;
			}
		}
		info!(thread_id = thread.thread_id, replicated, "issue resynced");
		Ok(IssueSync {
			thread_id: thread.thread_id,
			replicated,
		})
	}

	/// Re-register every active thread in a guild.
	pub async fn backfill_threads(&self, guild_id: i64) -> Result<usize> {
		let threads = self.platform.active_threads(guild_id).await?;
		self.registry.backfill(&threads).await
	}
}
