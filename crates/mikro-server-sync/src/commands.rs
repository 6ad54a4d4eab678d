// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use mikro_chat_core::ChatCommand;
use serde::Serialize;
use tracing::instrument;

use crate::engine::SyncEngine;
use crate::error::Result;

/// What a command did, for the caller to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandOutcome {
	pub message: String,
	/// Thread created or resynced, when there is one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thread_id: Option<i64>,
}

impl CommandOutcome {
	fn message(message: impl Into<String>) -> Self {
		Self {
			message: message.into(),
			thread_id: None,
		}
	}

	fn thread(message: impl Into<String>, thread_id: i64) -> Self {
		Self {
			message: message.into(),
			thread_id: Some(thread_id),
		}
	}
}

impl SyncEngine {
	#[instrument(skip(self, command), fields(command = command.name()))]
	pub async fn run_command(&self, command: &ChatCommand) -> Result<CommandOutcome> {
		match command {
			ChatCommand::LinkRepository {
				full_name,
				guild_id,
				forum_id,
			} => {
				let record = self.add_repo(full_name, *guild_id, *forum_id).await?;
				Ok(CommandOutcome::message(format!("Created! Linked {}", record.full_name)))
			}
			ChatCommand::SyncIssue { full_name, number } => {
				let synced = self.sync_full_issue(full_name, *number).await?;
				Ok(CommandOutcome::thread(
					format!(
						"Synced {full_name}#{number}: {} new comments",
						synced.replicated
					),
					synced.thread_id,
				))
			}
			ChatCommand::SyncLabels { full_name } => {
				let created = self.sync_labels(full_name).await?;
				Ok(CommandOutcome::message(format!("Created {created} tags")))
			}
			ChatCommand::MoveFrom {
				channel_id,
				anchor_message_id,
				amount,
				creator_id,
			} => {
				let moved = self
					.mover()
					.move_from(*channel_id, *anchor_message_id, *amount, *creator_id)
					.await?;
				Ok(CommandOutcome::thread(
					format!("Moved {} messages", moved.moved),
					moved.thread.id,
				))
			}
			ChatCommand::MoveReplies {
				channel_id,
				message_id,
				creator_id,
			} => {
				let moved = self
					.mover()
					.move_replies(*channel_id, *message_id, *creator_id)
					.await?;
				Ok(CommandOutcome::thread(
					format!("Moved {} messages", moved.moved),
					moved.thread.id,
				))
			}
			ChatCommand::MoveConversation {
				channel_id,
				message_id,
				lookback,
				creator_id,
			} => {
				let moved = self
					.mover()
					.move_conversation(*channel_id, *message_id, *lookback, *creator_id)
					.await?;
				Ok(CommandOutcome::thread(
					format!("Moved {} messages", moved.moved),
					moved.thread.id,
				))
			}
			ChatCommand::BackfillThreads { guild_id } => {
				let count = self.backfill_threads(*guild_id).await?;
				Ok(CommandOutcome::message(format!("Backfilled {count} threads")))
			}
		}
	}
}
