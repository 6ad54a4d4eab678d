// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Event entry points for both sides of the sync.

use std::sync::{Arc, Mutex, MutexGuard};

use mikro_chat_core::{ChatEvent, ChatPlatform, MessageReplicator};
use mikro_server_db::{CorrelationStore, RepositoryRecord};
use mikro_server_github_app::webhook::{IssueCommentEvent, IssuesEvent, PullRequestEvent};
use mikro_server_github_app::{IssueTracker, WebhookEvent};
use tracing::{debug, info, instrument, warn};

use crate::cache::BoundedCache;
use crate::conversation::ConversationMover;
use crate::error::{Result, SyncError};
use crate::lock_registry::InstallationLockRegistry;
use crate::reconcile::TrackerState;
use crate::thread_registry::ThreadRegistry;

pub const DEFAULT_INSTALLATION_CACHE_SIZE: usize = 512;
pub const DEFAULT_RESYNC_SLOWMODE_SECS: u32 = 15;
pub const DEFAULT_REPLY_LOOKBACK: usize = 80;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
	pub installation_cache_size: usize,
	/// Slowmode applied to a thread by a full resync.
	pub resync_slowmode_secs: u32,
	/// History window for reply-chain moves.
	pub reply_lookback: usize,
}

impl Default for SyncSettings {
	fn default() -> Self {
		Self {
			installation_cache_size: DEFAULT_INSTALLATION_CACHE_SIZE,
			resync_slowmode_secs: DEFAULT_RESYNC_SLOWMODE_SECS,
			reply_lookback: DEFAULT_REPLY_LOOKBACK,
		}
	}
}

/// A repository row whose installation is known.
#[derive(Debug, Clone)]
pub struct LinkedRepo {
	pub record: RepositoryRecord,
	pub installation_id: i64,
}

pub struct SyncEngine {
	pub(crate) correlations: Arc<dyn CorrelationStore>,
	pub(crate) registry: Arc<ThreadRegistry>,
	pub(crate) tracker: Arc<dyn IssueTracker>,
	pub(crate) platform: Arc<dyn ChatPlatform>,
	pub(crate) replicator: Arc<MessageReplicator>,
	pub(crate) locks: InstallationLockRegistry,
	pub(crate) settings: SyncSettings,
	installations: Mutex<BoundedCache<i64, i64>>,
	mover: ConversationMover,
}

impl SyncEngine {
	pub fn new(
		correlations: Arc<dyn CorrelationStore>,
		registry: Arc<ThreadRegistry>,
		tracker: Arc<dyn IssueTracker>,
		platform: Arc<dyn ChatPlatform>,
		replicator: Arc<MessageReplicator>,
	) -> Self {
		Self::with_settings(
			correlations,
			registry,
			tracker,
			platform,
			replicator,
			SyncSettings::default(),
		)
	}

	pub fn with_settings(
		correlations: Arc<dyn CorrelationStore>,
		registry: Arc<ThreadRegistry>,
		tracker: Arc<dyn IssueTracker>,
		platform: Arc<dyn ChatPlatform>,
		replicator: Arc<MessageReplicator>,
		settings: SyncSettings,
	) -> Self {
		let mover = ConversationMover::new(Arc::clone(&platform), Arc::clone(&replicator))
			.with_lookback(settings.reply_lookback);
		Self {
			correlations,
			registry,
			tracker,
			platform,
			replicator,
			locks: InstallationLockRegistry::new(),
			installations: Mutex::new(BoundedCache::new(settings.installation_cache_size)),
			settings,
			mover,
		}
	}

	pub fn registry(&self) -> &ThreadRegistry {
		&self.registry
	}

	pub fn locks(&self) -> &InstallationLockRegistry {
		&self.locks
	}

	pub fn mover(&self) -> &ConversationMover {
		&self.mover
	}

	pub fn settings(&self) -> &SyncSettings {
		&self.settings
	}

	fn installations(&self) -> MutexGuard<'_, BoundedCache<i64, i64>> {
		self.installations.lock().unwrap_or_else(|e| e.into_inner())
	}

	/// Read-through lookup of a repository's installation id.
	pub async fn installation_for(&self, repository_id: i64) -> Result<Option<i64>> {
		let cached = self.installations().get(&repository_id);
		if cached.is_some() {
			return Ok(cached);
		}
		let stored = self
			.correlations
			.get_repository_installation(repository_id)
			.await?;
		if let Some(id) = stored {
			self.installations().insert(repository_id, id);
		}
		Ok(stored)
	}

	/// Record the installation a webhook delivery arrived through.
	#[instrument(skip(self))]
	pub async fn record_installation(&self, repository_id: i64, installation_id: i64) -> Result<()> {
		self
			.correlations
			.set_repository_installation(repository_id, installation_id)
			.await?;
		self.installations().insert(repository_id, installation_id);
		Ok(())
	}

	pub(crate) async fn linked_repo(&self, repository_id: i64) -> Result<LinkedRepo> {
		let record = self
			.correlations
			.get_repository(repository_id)
			.await?
			.ok_or(SyncError::UnknownRepository { repository_id })?;
		let installation_id = match record.installation_id {
			Some(id) => Some(id),
			None => self.installation_for(repository_id).await?,
		};
		let Some(installation_id) = installation_id else {
			warn!(repository_id, full_name = %record.full_name, "repository has no installation yet");
			return Err(SyncError::NoInstallation { repository_id });
		};
		Ok(LinkedRepo {
			record,
			installation_id,
		})
	}

	/// Apply one relayed chat event.
	#[instrument(skip(self, event), fields(kind = event.kind()))]
	pub async fn handle_chat_event(&self, event: &ChatEvent) -> Result<()> {
		let result = match event {
			ChatEvent::ThreadCreate { thread } => self.registry.on_thread_create(thread).await,
			ChatEvent::ThreadUpdate { before, after } => {
				let effective = self.registry.on_thread_update(before.as_ref(), after).await?;
				self.reconcile_thread(&effective).await.map(|report| {
					if !report.is_empty() {
						info!(thread_id = effective.id, ?report, "thread reconciled");
					}
				})
			}
			ChatEvent::ThreadDelete { thread_id } => self.registry.on_thread_delete(*thread_id).await,
			ChatEvent::MessageCreate { message } => self.on_chat_message(message).await,
			ChatEvent::MessageEdit { message } => self.on_chat_message_edit(message).await,
			ChatEvent::MessageDelete {
				channel_id,
				message_id,
			} => self.on_chat_message_delete(*channel_id, *message_id).await,
		};
		quiet_not_found(result)
	}

	/// Apply one verified tracker webhook delivery.
	#[instrument(skip(self, event), fields(action = event.action().unwrap_or("-")))]
	pub async fn handle_webhook(&self, event: &WebhookEvent) -> Result<()> {
		let result = match event {
			WebhookEvent::Ping => Ok(()),
			WebhookEvent::IssueComment(e) => self.on_issue_comment_event(e).await,
			WebhookEvent::Issues(e) => self.on_issues_event(e).await,
			WebhookEvent::PullRequest(e) => self.on_pull_request_event(e).await,
			WebhookEvent::Unsupported { event_type } => {
				debug!(event_type, "ignoring unsupported webhook event");
				Ok(())
			}
		};
		quiet_not_found(result)
	}

	async fn on_issue_comment_event(&self, event: &IssueCommentEvent) -> Result<()> {
		match event.action.as_str() {
			"created" => self.on_tracker_comment_created(&event.issue, &event.comment).await,
			"edited" => self.on_tracker_comment_edited(&event.issue, &event.comment).await,
			"deleted" => self.on_tracker_comment_deleted(&event.issue, &event.comment).await,
			other => {
				debug!(action = other, "ignoring issue_comment action");
				Ok(())
			}
		}
	}

	async fn on_issues_event(&self, event: &IssuesEvent) -> Result<()> {
		let repository_id = event.repository.id;
		match event.action.as_str() {
			"opened" => {
				let repo = self.linked_repo(repository_id).await?;
				self.create_or_get_issue_thread(&repo, &event.issue).await?;
				Ok(())
			}
			"closed" | "reopened" | "locked" | "unlocked" | "labeled" | "unlabeled" | "edited" => {
				let Some(record) = self.correlations.get_issue(event.issue.id).await? else {
					debug!(issue_id = event.issue.id, "issue has no thread");
					return Ok(());
				};
				let repo = self.linked_repo(repository_id).await?;
				let state = TrackerState::from_issue(&event.issue);
				self.mirror_tracker_state(&repo, record.clone(), &state).await?;
				if event.action == "edited" {
					self.mirror_issue_body(&repo, &record, &event.issue).await?;
				}
				Ok(())
			}
			"pinned" | "unpinned" => {
				let Some(record) = self.correlations.get_issue(event.issue.id).await? else {
					return Ok(());
				};
				let pinned = event.action == "pinned";
				self
					.registry
					.update_disable_archive(record.thread_id, pinned)
					.await?;
				info!(thread_id = record.thread_id, pinned, "thread archive policy updated");
				Ok(())
			}
			other => {
				debug!(action = other, "ignoring issues action");
				Ok(())
			}
		}
	}

	async fn on_pull_request_event(&self, event: &PullRequestEvent) -> Result<()> {
		let repository_id = event.repository.id;
		match event.action.as_str() {
			"opened" => {
				let repo = self.linked_repo(repository_id).await?;
				let issue = self
					.tracker
					.get_issue(repo.installation_id, &repo.record.full_name, event.number)
					.await?;
				self.create_or_get_issue_thread(&repo, &issue).await?;
				Ok(())
			}
			"closed" | "reopened" | "locked" | "unlocked" | "labeled" | "unlabeled" | "edited" => {
				let Some(record) = self
					.correlations
					.get_issue_by_number(repository_id, event.number)
					.await?
				else {
					debug!(number = event.number, "pull request has no thread");
					return Ok(());
				};
				let repo = self.linked_repo(repository_id).await?;
				let state = TrackerState::from_pull_request(&event.pull_request);
				self.mirror_tracker_state(&repo, record, &state).await?;
				Ok(())
			}
			other => {
				debug!(action = other, "ignoring pull_request action");
				Ok(())
			}
		}
	}
}

/// Not-found outcomes end an event quietly.
fn quiet_not_found(result: Result<()>) -> Result<()> {
	match result {
		Err(e) if e.is_not_found() => {
			debug!(error = %e, "event dropped: nothing to sync");
			Ok(())
		}
		other => other,
	}
}
