// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Field-by-field thread state sync.
//!
//! Chat to tracker: [`SyncEngine::reconcile_thread`] pushes every field where
//! the thread differs from the last-known tracker value, in the order lock,
//! closed, title, labels. Tracker to chat:
//! [`SyncEngine::mirror_tracker_state`] applies every field where the
//! tracker differs from the stored value. Both persist what they applied, so
//! the other side's echo finds nothing to do.

use std::collections::{BTreeSet, HashMap};
use std::sync::LazyLock;

use mikro_chat_core::{ChatThread, ThreadEdit};
use mikro_server_db::IssueRecord;
use mikro_server_github_app::types::PullRequest;
use mikro_server_github_app::{Issue, IssueState, IssueUpdate};
use regex::Regex;
use tracing::{debug, instrument, warn};

use crate::engine::{LinkedRepo, SyncEngine};
use crate::error::{Result, SyncError};

static TITLE_PREFIX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\[.*?\]").unwrap());

/// Thread names longer than this are rejected by the platform.
pub const MAX_THREAD_NAME_LEN: usize = 100;

/// Split `[Category] Rest` into the bracketed prefix and the remainder with
/// leading whitespace removed. `None` when the name has no prefix.
pub fn split_title(name: &str) -> Option<(&str, &str)> {
	let found = TITLE_PREFIX.find(name)?;
	Some((found.as_str(), name[found.end()..].trim_start()))
}

/// `[{category}] {title}`, capped to the platform's name length.
pub fn format_thread_title(category: &str, title: &str) -> String {
	prefixed_title(&format!("[{category}]"), title)
}

fn prefixed_title(prefix: &str, title: &str) -> String {
	format!("{prefix} {title}")
		.chars()
		.take(MAX_THREAD_NAME_LEN)
		.collect()
}

/// Whether a prefixed thread name still shows `stored`. Names are capped, so
/// a thread carrying the capped form of a long title matches it too.
pub fn title_matches(name: &str, stored: &str) -> bool {
	let Some((prefix, rest)) = split_title(name) else {
		return false;
	};
	let stored = stored.trim();
	rest.trim_end() == stored || name.trim_end() == prefixed_title(prefix, stored).trim_end()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncedField {
	Locked,
	Closed,
	Title,
	Labels,
}

/// Outcome of one chat-to-tracker reconciliation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
	/// Fields pushed upstream and persisted, in push order.
	pub pushed: Vec<SyncedField>,
	/// Divergent fields whose push failed.
	pub failed: Vec<SyncedField>,
	/// The thread lacked a category prefix and was renamed.
	pub renamed: bool,
}

impl ReconcileReport {
	pub fn is_empty(&self) -> bool {
		self.pushed.is_empty() && self.failed.is_empty() && !self.renamed
	}

	fn failure(&mut self, field: SyncedField, error: &dyn std::fmt::Display) {
		warn!(?field, error = %error, "push to tracker failed");
		self.failed.push(field);
	}
}

/// Tracker-side values compared against an [`IssueRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerState {
	pub closed: bool,
	pub locked: bool,
	pub title: String,
	pub labels: Vec<String>,
}

impl TrackerState {
	pub fn from_issue(issue: &Issue) -> Self {
		Self {
			closed: issue.is_closed(),
			locked: issue.locked,
			title: issue.title.clone(),
			labels: issue.label_names(),
		}
	}

	pub fn from_pull_request(pr: &PullRequest) -> Self {
		Self {
			closed: pr.state == IssueState::Closed,
			locked: pr.locked,
			title: pr.title.clone(),
			labels: pr.label_names(),
		}
	}
}

/// Fields applied to the thread by one tracker-to-chat mirror.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MirrorReport {
	pub applied: Vec<SyncedField>,
}

impl SyncEngine {
	async fn tag_names_by_id(&self, forum_id: i64) -> Option<HashMap<i64, String>> {
		match self.platform.forum_tags(forum_id).await {
			Ok(tags) => Some(tags.into_iter().map(|t| (t.id, t.name)).collect()),
			Err(e) => {
				warn!(forum_id, error = %e, "could not load forum tags");
				None
			}
		}
	}

	/// Push chat-side divergence of a linked thread to its issue.
	#[instrument(skip(self, thread), fields(thread_id = thread.id))]
	pub async fn reconcile_thread(&self, thread: &ChatThread) -> Result<ReconcileReport> {
		let issue = self
			.correlations
			.get_issue_by_thread(thread.id)
			.await?
			.ok_or(SyncError::NotLinked {
				thread_id: thread.id,
			})?;
		let repo = self.linked_repo(issue.repository_id).await?;

		let chat_labels: Option<BTreeSet<String>> = if thread.applied_tags.is_empty() {
			Some(BTreeSet::new())
		} else {
			self.tag_names_by_id(thread.parent_id).await.map(|names| {
				thread
					.applied_tags
					.iter()
					.filter_map(|id| names.get(id).cloned())
					.collect()
			})
		};

		let _guard = self.locks.acquire(repo.installation_id).await;
		let issue = self
			.correlations
			.get_issue(issue.issue_id)
			.await?
			.unwrap_or(issue);
		let installation_id = repo.installation_id;
		let full_name = repo.record.full_name.as_str();
		let mut report = ReconcileReport::default();

		if thread.locked != issue.locked {
			match self
				.tracker
				.set_locked(installation_id, full_name, issue.number, thread.locked)
				.await
			{
				Ok(()) => {
					self
						.correlations
						.update_issue_locked(issue.issue_id, thread.locked)
						.await?;
					report.pushed.push(SyncedField::Locked);
				}
				Err(e) => report.failure(SyncedField::Locked, &e),
			}
		}

		if thread.archived != issue.closed {
			let update = IssueUpdate::state(thread.archived);
			match self
				.tracker
				.update_issue(installation_id, full_name, issue.number, &update)
				.await
			{
				Ok(_) => {
					self
						.correlations
						.update_issue_closed(issue.issue_id, thread.archived)
						.await?;
					report.pushed.push(SyncedField::Closed);
				}
				Err(e) => report.failure(SyncedField::Closed, &e),
			}
		}

		match split_title(&thread.name) {
			Some((_, rest)) if !rest.is_empty() => {
				if !title_matches(&thread.name, &issue.title) {
					let rest = rest.trim_end();
					let update = IssueUpdate::title(rest);
					match self
						.tracker
						.update_issue(installation_id, full_name, issue.number, &update)
						.await
					{
						Ok(_) => {
							self.correlations.update_issue_title(issue.issue_id, rest).await?;
							report.pushed.push(SyncedField::Title);
						}
						Err(e) => report.failure(SyncedField::Title, &e),
					}
				}
			}
			_ => {
				let name = format_thread_title(&repo.record.name, &issue.title);
				let edit = ThreadEdit {
					name: Some(name.clone()),
					..ThreadEdit::default()
				};
				match self.platform.edit_thread(thread.id, &edit).await {
					Ok(_) => {
						self.registry.update_title(thread.id, &name).await?;
						report.renamed = true;
					}
					Err(e) => warn!(error = %e, "could not restore thread title prefix"),
				}
			}
		}

		if let Some(chat_labels) = chat_labels {
			let stored: BTreeSet<String> = issue.labels.iter().cloned().collect();
			if chat_labels != stored {
				let labels: Vec<String> = chat_labels.into_iter().collect();
				let update = IssueUpdate::labels(labels.clone());
				match self
					.tracker
					.update_issue(installation_id, full_name, issue.number, &update)
					.await
				{
					Ok(_) => {
						self
							.correlations
							.update_issue_labels(issue.issue_id, &labels)
							.await?;
						report.pushed.push(SyncedField::Labels);
					}
					Err(e) => report.failure(SyncedField::Labels, &e),
				}
			}
		}

		Ok(report)
	}

	/// Apply tracker-side divergence to the linked thread in one edit.
	///
	/// Labels without a matching forum tag cannot be shown on the thread, so
	/// only the representable ones are stored.
	#[instrument(skip(self, repo, record, state), fields(issue_id = record.issue_id, thread_id = record.thread_id))]
	pub async fn mirror_tracker_state(
		&self,
		repo: &LinkedRepo,
		record: IssueRecord,
		state: &TrackerState,
	) -> Result<MirrorReport> {
		let _guard = self.locks.acquire(repo.installation_id).await;
		let record = self
			.correlations
			.get_issue(record.issue_id)
			.await?
			.unwrap_or(record);
		let thread = self.platform.get_thread(record.thread_id).await?;

		let mut edit = ThreadEdit::default();
		let mut report = MirrorReport::default();

		if state.closed != record.closed {
			edit.archived = Some(state.closed);
			report.applied.push(SyncedField::Closed);
		}
		if state.locked != record.locked {
			edit.locked = Some(state.locked);
			report.applied.push(SyncedField::Locked);
		}

		let mut shown_labels = None;
		let tracker_labels: BTreeSet<&str> = state.labels.iter().map(String::as_str).collect();
		if tracker_labels != record.label_set() {
			if let Some(names) = self.tag_names_by_id(repo.record.forum_id).await {
				let mut tags: Vec<(i64, String)> = names
					.into_iter()
					.filter(|(_, name)| tracker_labels.contains(name.as_str()))
					.collect();
				tags.sort();
				edit.applied_tags = Some(tags.iter().map(|(id, _)| *id).collect());
				let mut labels: Vec<String> = tags.into_iter().map(|(_, name)| name).collect();
				labels.sort();
				shown_labels = Some(labels);
				report.applied.push(SyncedField::Labels);
			}
		}

		let mut new_name = None;
		if state.title != record.title {
			let name = match split_title(&thread.name) {
				Some((prefix, _)) => prefixed_title(prefix, &state.title),
				None => format_thread_title(&repo.record.name, &state.title),
			};
			edit.name = Some(name.clone());
			new_name = Some(name);
			report.applied.push(SyncedField::Title);
		}

		if edit.is_empty() {
			debug!("thread already matches tracker");
			return Ok(report);
		}

		self.platform.edit_thread(thread.id, &edit).await?;

		if let Some(closed) = edit.archived {
			self
				.correlations
				.update_issue_closed(record.issue_id, closed)
				.await?;
		}
		if let Some(locked) = edit.locked {
			self
				.correlations
				.update_issue_locked(record.issue_id, locked)
				.await?;
		}
		if let Some(labels) = shown_labels {
			self
				.correlations
				.update_issue_labels(record.issue_id, &labels)
				.await?;
			self.registry.update_tags(thread.id, &labels).await?;
		}
		if let Some(name) = new_name {
			self
				.correlations
				.update_issue_title(record.issue_id, &state.title)
				.await?;
			self.registry.update_title(thread.id, &name).await?;
		}

		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	#[test]
	fn split_title_separates_the_category() {
		assert_eq!(split_title("[widgets] Crash on start"), Some(("[widgets]", "Crash on start")));
		assert_eq!(split_title("[a][b] x"), Some(("[a]", "[b] x")));
		assert_eq!(split_title("[widgets]"), Some(("[widgets]", "")));
		assert_eq!(split_title("Crash on start"), None);
		assert_eq!(split_title(" [widgets] late"), None);
	}

	#[test]
	fn long_titles_are_capped() {
		let title = "x".repeat(300);
		let name = format_thread_title("widgets", &title);
		assert_eq!(name.chars().count(), MAX_THREAD_NAME_LEN);
		assert!(name.starts_with("[widgets] x"));
	}

	#[test]
	fn capped_names_still_match_their_long_title() {
		let title = "A".repeat(120);
		let name = format_thread_title("widgets", &title);
		assert!(title_matches(&name, &title));
		assert!(title_matches(&name, &format!("  {title} ")));
		assert!(title_matches("[Bug] Crash on start ", "Crash on start"));

		let mut edited: String = name.chars().take(MAX_THREAD_NAME_LEN - 1).collect();
		edited.push('B');
		assert!(!title_matches(&edited, &title));
		assert!(!title_matches("[Bug] Crash at exit", "Crash on start"));
		assert!(!title_matches("Crash on start", "Crash on start"));
	}

	#[test]
	fn empty_report_means_nothing_happened() {
		let mut report = ReconcileReport::default();
		assert!(report.is_empty());
		report.renamed = true;
		assert!(!report.is_empty());
	}

	proptest! {
		#[test]
		fn formatted_titles_split_back(
			category in "[a-z0-9-]{1,20}",
			title in "[A-Za-z0-9][A-Za-z0-9 ]{0,40}"
		) {
			let name = format_thread_title(&category, &title);
			let prefix = format!("[{category}]");
			let (found, rest) = split_title(&name).unwrap();
			prop_assert_eq!(found, prefix.as_str());
			prop_assert_eq!(rest, title.as_str());
		}

		#[test]
		fn formatted_titles_never_exceed_limit(category in "\\PC{0,60}", title in "\\PC{0,200}") {
			prop_assert!(format_thread_title(&category, &title).chars().count() <= MAX_THREAD_NAME_LEN);
		}
	}
}
