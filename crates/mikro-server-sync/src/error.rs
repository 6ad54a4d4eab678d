// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use mikro_chat_core::{ChatError, ReplicateError};
use mikro_server_db::DbError;
use mikro_server_github_app::GithubAppError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
	#[error("Database error: {0}")]
	Db(#[from] DbError),

	#[error("Issue tracker error: {0}")]
	Tracker(#[from] GithubAppError),

	#[error("Chat platform error: {0}")]
	Chat(#[from] ChatError),

	#[error("Replication failed: {0}")]
	Replicate(#[from] ReplicateError),

	#[error("Thread {thread_id} is not linked to an issue")]
	NotLinked { thread_id: i64 },

	#[error("Repository {repository_id} is not linked")]
	UnknownRepository { repository_id: i64 },

	#[error("Repository {full_name} is not linked")]
	RepositoryNotLinked { full_name: String },

	#[error("Repository {repository_id} has no app installation yet")]
	NoInstallation { repository_id: i64 },

	#[error("Format repo in `owner/repo`, got {0:?}")]
	InvalidRepositoryName(String),

	#[error("Invalid repository: {0}")]
	RepositoryNotFound(String),

	#[error("This repository already exists: {0}")]
	AlreadyLinked(String),

	#[error("Invalid argument: {0}")]
	InvalidArgument(String),
}

impl SyncError {
	/// Missing rows or remote objects. Event handlers treat these as no-ops.
	pub fn is_not_found(&self) -> bool {
		match self {
			SyncError::NotLinked { .. }
			| SyncError::UnknownRepository { .. }
			| SyncError::NoInstallation { .. } => true,
			SyncError::Db(e) => e.is_not_found(),
			SyncError::Chat(e) => e.is_not_found(),
			SyncError::Replicate(e) => e.chat_error().is_not_found(),
			SyncError::Tracker(e) => e.is_not_found(),
			_ => false,
		}
	}

	/// Errors caused by the caller's input rather than by a remote or the store.
	pub fn is_user_error(&self) -> bool {
		matches!(
			self,
			SyncError::InvalidRepositoryName(_)
				| SyncError::RepositoryNotFound(_)
				| SyncError::AlreadyLinked(_)
				| SyncError::RepositoryNotLinked { .. }
				| SyncError::InvalidArgument(_)
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn missing_links_and_remote_not_found_are_quiet() {
		assert!(SyncError::NotLinked { thread_id: 1 }.is_not_found());
		assert!(SyncError::NoInstallation { repository_id: 1 }.is_not_found());
		assert!(SyncError::Chat(ChatError::NotFound("thread".into())).is_not_found());
		assert!(SyncError::Tracker(GithubAppError::NotFound("issue".into())).is_not_found());
		assert!(!SyncError::Chat(ChatError::Timeout).is_not_found());
	}

	#[test]
	fn command_input_errors_are_user_errors() {
		assert!(SyncError::InvalidRepositoryName("nope".into()).is_user_error());
		assert!(SyncError::AlreadyLinked("a/b".into()).is_user_error());
		assert!(!SyncError::Chat(ChatError::Timeout).is_user_error());
	}
}
