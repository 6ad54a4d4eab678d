// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Comment mirroring between chat messages and tracker comments.
//!
//! The origin flag on each [`CommentRecord`] names the authoritative side:
//! edits only ever flow away from it, and its own echoes are dropped.

use mikro_chat_core::{ChatMessage, Destination, Identity};
use mikro_server_db::{CommentRecord, IssueRecord, ISSUE_BODY_COMMENT_ID};
use mikro_server_github_app::{Issue, IssueComment};
use tracing::{debug, info, instrument, warn};

use crate::engine::{LinkedRepo, SyncEngine};
use crate::error::Result;

/// Posted in place of an empty tracker body; chat messages cannot be empty.
pub const EMPTY_BODY: &str = "*No description provided.*";

/// Tracker comment body for a chat-authored message.
pub fn format_comment_body(author: &str, content: &str) -> String {
	format!("`Comment from: {author}`\n{content}")
}

pub(crate) fn tracker_body(body: Option<&str>) -> &str {
	match body {
		Some(text) if !text.trim().is_empty() => text,
		_ => EMPTY_BODY,
	}
}

impl SyncEngine {
	#[instrument(skip(self, message), fields(message_id = message.id, thread_id = message.channel_id))]
	pub(crate) async fn on_chat_message(&self, message: &ChatMessage) -> Result<()> {
		self
			.registry
			.on_message(message.channel_id, message.id)
			.await?;
		if message.is_automated() {
			return Ok(());
		}
		let Some(issue) = self
			.correlations
			.get_issue_by_thread(message.channel_id)
			.await?
		else {
			return Ok(());
		};
		let repo = self.linked_repo(issue.repository_id).await?;
		let body = format_comment_body(&message.author.name, &message.content);

		let _guard = self.locks.acquire(repo.installation_id).await;
		let comment = self
			.tracker
			.create_comment(
				repo.installation_id,
				&repo.record.full_name,
				issue.number,
				&body,
			)
			.await?;
		self
			.correlations
			.insert_comment(&CommentRecord {
				issue_id: issue.issue_id,
				comment_id: comment.id,
				github_origin: false,
				guild_id: message.guild_id.unwrap_or(repo.record.guild_id),
				channel_id: message.channel_id,
				message_id: message.id,
				content: message.content.clone(),
			})
			.await?;
		info!(comment_id = comment.id, number = issue.number, "chat message posted to tracker");
		Ok(())
	}

	pub(crate) async fn on_chat_message_edit(&self, message: &ChatMessage) -> Result<()> {
		let Some(row) = self.correlations.get_comment_by_message(message.id).await? else {
			return Ok(());
		};
		if row.github_origin {
			debug!(message_id = message.id, "edit of a tracker mirror ignored");
			return Ok(());
		}
		let Some(issue) = self.correlations.get_issue(row.issue_id).await? else {
			return Ok(());
		};
		let repo = self.linked_repo(issue.repository_id).await?;

		let _guard = self.locks.acquire(repo.installation_id).await;
		if row.content == message.content {
			return Ok(());
		}
		let body = format_comment_body(&message.author.name, &message.content);
		self
			.tracker
			.update_comment(
				repo.installation_id,
				&repo.record.full_name,
				row.comment_id,
				&body,
			)
			.await?;
		self
			.correlations
			.update_comment_content(row.issue_id, row.comment_id, &message.content)
			.await?;
		info!(comment_id = row.comment_id, "tracker comment updated from chat");
		Ok(())
	}

	pub(crate) async fn on_chat_message_delete(&self, channel_id: i64, message_id: i64) -> Result<()> {
		let Some(row) = self.correlations.get_comment_by_message(message_id).await? else {
			return Ok(());
		};
		self
			.correlations
			.delete_comment(row.issue_id, row.comment_id)
			.await?;
		if row.github_origin {
			debug!(channel_id, message_id, "mirror deleted in chat; tracker source kept");
			return Ok(());
		}

		let Some(issue) = self.correlations.get_issue(row.issue_id).await? else {
			return Ok(());
		};
		let repo = self.linked_repo(issue.repository_id).await?;
		let _guard = self.locks.acquire(repo.installation_id).await;
		match self
			.tracker
			.delete_comment(repo.installation_id, &repo.record.full_name, row.comment_id)
			.await
		{
			Ok(()) => info!(comment_id = row.comment_id, "tracker comment deleted from chat"),
			Err(e) if e.is_not_found() => debug!(comment_id = row.comment_id, "tracker comment already gone"),
			Err(e) => warn!(comment_id = row.comment_id, error = %e, "could not delete tracker comment"),
		}
		Ok(())
	}

	#[instrument(skip(self, issue, comment), fields(issue_id = issue.id, comment_id = comment.id))]
	pub(crate) async fn on_tracker_comment_created(
		&self,
		issue: &Issue,
		comment: &IssueComment,
	) -> Result<()> {
		let Some(record) = self.correlations.get_issue(issue.id).await? else {
			debug!("issue has no thread");
			return Ok(());
		};
		let repo = self.linked_repo(record.repository_id).await?;

		let _guard = self.locks.acquire(repo.installation_id).await;
		if self.mirror_comment(&record, comment).await? {
			info!(thread_id = record.thread_id, "tracker comment mirrored");
		}
		Ok(())
	}

	/// Post a tracker comment into the issue's thread unless a row already
	/// exists for it. Callers hold the installation lock.
	pub(crate) async fn mirror_comment(
		&self,
		record: &IssueRecord,
		comment: &IssueComment,
	) -> Result<bool> {
		if self
			.correlations
			.get_comment(record.issue_id, comment.id)
			.await?
			.is_some()
		{
			debug!(comment_id = comment.id, "comment already has a chat counterpart");
			return Ok(false);
		}

		let thread = self.registry.get(record.thread_id).await?;
		let body = tracker_body(comment.body.as_deref());
		let identity = Identity::new(&comment.user.login, comment.user.avatar_url.clone());
		let destination = Destination::Thread {
			parent_id: thread.channel_id,
			thread_id: thread.thread_id,
		};
		let mirror = self.replicator.send_as(&identity, body, destination).await?;

		self
			.correlations
			.insert_comment(&CommentRecord {
				issue_id: record.issue_id,
				comment_id: comment.id,
				github_origin: true,
				guild_id: mirror.guild_id.unwrap_or(thread.guild_id),
				channel_id: thread.thread_id,
				message_id: mirror.id,
				content: body.to_string(),
			})
			.await?;
		Ok(true)
	}

	pub(crate) async fn on_tracker_comment_edited(
		&self,
		issue: &Issue,
		comment: &IssueComment,
	) -> Result<()> {
		let Some(record) = self.correlations.get_issue(issue.id).await? else {
			return Ok(());
		};
		let repo = self.linked_repo(record.repository_id).await?;

		let _guard = self.locks.acquire(repo.installation_id).await;
		let Some(row) = self.correlations.get_comment(issue.id, comment.id).await? else {
			return Ok(());
		};
		if !row.github_origin {
			debug!(comment_id = comment.id, "edit of a chat-authored comment ignored");
			return Ok(());
		}
		let body = tracker_body(comment.body.as_deref());
		self.edit_mirror(&record, &row, body).await
	}

	/// Keep the thread's starter message in step with the issue body.
	pub(crate) async fn mirror_issue_body(
		&self,
		repo: &LinkedRepo,
		record: &IssueRecord,
		issue: &Issue,
	) -> Result<()> {
		let _guard = self.locks.acquire(repo.installation_id).await;
		let Some(row) = self
			.correlations
			.get_comment(record.issue_id, ISSUE_BODY_COMMENT_ID)
			.await?
		else {
			return Ok(());
		};
		if !row.github_origin {
			return Ok(());
		}
		self
			.edit_mirror(record, &row, tracker_body(issue.body.as_deref()))
			.await
	}

	async fn edit_mirror(&self, record: &IssueRecord, row: &CommentRecord, body: &str) -> Result<()> {
		if row.content == body {
			return Ok(());
		}
		let thread = self.registry.get(record.thread_id).await?;
		let destination = Destination::Thread {
			parent_id: thread.channel_id,
			thread_id: thread.thread_id,
		};
		self.replicator.edit(destination, row.message_id, body).await?;
		self
			.correlations
			.update_comment_content(row.issue_id, row.comment_id, body)
			.await?;
		info!(message_id = row.message_id, "mirror updated from tracker");
		Ok(())
	}

	pub(crate) async fn on_tracker_comment_deleted(
		&self,
		issue: &Issue,
		comment: &IssueComment,
	) -> Result<()> {
		let Some(row) = self.correlations.get_comment(issue.id, comment.id).await? else {
			return Ok(());
		};
		self
			.correlations
			.delete_comment(row.issue_id, row.comment_id)
			.await?;
		if !row.github_origin {
			return Ok(());
		}
		match self
			.platform
			.delete_message(row.channel_id, row.message_id)
			.await
		{
			Ok(()) => info!(message_id = row.message_id, "mirror deleted"),
			Err(e) if e.is_not_found() => debug!(message_id = row.message_id, "mirror already gone"),
			Err(e) => warn!(message_id = row.message_id, error = %e, "could not delete mirror"),
		}
		Ok(())
	}
}
