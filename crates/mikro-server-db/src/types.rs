// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Stored metadata for one chat thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadRecord {
	pub thread_id: i64,
	pub guild_id: i64,
	/// Parent container (forum or text channel).
	pub channel_id: i64,
	pub owner_id: i64,
	pub title: String,
	pub starting_message: Option<String>,
	pub tags: Vec<String>,
	pub description: Option<String>,
	/// Persistent threads are unarchived whenever the platform archives them.
	pub disable_archive: bool,
	pub public: bool,
	pub last_message_id: Option<i64>,
}

/// Last-known tracker state of an issue or pull request linked to a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRecord {
	pub issue_id: i64,
	pub repository_id: i64,
	pub thread_id: i64,
	pub number: i64,
	pub pull_request: bool,
	pub closed: bool,
	pub locked: bool,
	pub labels: Vec<String>,
	pub author_id: i64,
	pub title: String,
}

impl IssueRecord {
	pub fn label_set(&self) -> BTreeSet<&str> {
		self.labels.iter().map(String::as_str).collect()
	}
}

/// Issue body sentinel for [`CommentRecord::comment_id`].
pub const ISSUE_BODY_COMMENT_ID: i64 = 0;

/// Correlation between one tracker comment and its chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
	pub issue_id: i64,
	pub comment_id: i64,
	/// `true` when the tracker is authoritative (the chat message is a mirror).
	pub github_origin: bool,
	pub guild_id: i64,
	pub channel_id: i64,
	pub message_id: i64,
	pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryRecord {
	pub repository_id: i64,
	/// Short repository name, used as the thread title category.
	pub name: String,
	pub full_name: String,
	pub guild_id: i64,
	pub forum_id: i64,
	pub installation_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerUser {
	pub id: i64,
	pub login: String,
	pub avatar_url: Option<String>,
}
