// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Gateway events and commands relayed to the server as JSON.

use serde::{Deserialize, Serialize};

use crate::types::{ChatMessage, ChatThread};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
	ThreadCreate {
		thread: ChatThread,
	},
	ThreadUpdate {
		#[serde(default)]
		before: Option<ChatThread>,
		after: ChatThread,
	},
	ThreadDelete {
		thread_id: i64,
	},
	MessageCreate {
		message: ChatMessage,
	},
	MessageEdit {
		message: ChatMessage,
	},
	MessageDelete {
		channel_id: i64,
		message_id: i64,
	},
}

impl ChatEvent {
	pub fn kind(&self) -> &'static str {
		match self {
			ChatEvent::ThreadCreate { .. } => "thread_create",
			ChatEvent::ThreadUpdate { .. } => "thread_update",
			ChatEvent::ThreadDelete { .. } => "thread_delete",
			ChatEvent::MessageCreate { .. } => "message_create",
			ChatEvent::MessageEdit { .. } => "message_edit",
			ChatEvent::MessageDelete { .. } => "message_delete",
		}
	}
}

/// Already-parsed commands. Permission checks happen in the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum ChatCommand {
	LinkRepository {
		full_name: String,
		guild_id: i64,
		forum_id: i64,
	},
	SyncIssue {
		full_name: String,
		number: i64,
	},
	SyncLabels {
		full_name: String,
	},
	MoveFrom {
		channel_id: i64,
		#[serde(default)]
		anchor_message_id: Option<i64>,
		#[serde(default = "default_move_amount")]
		amount: i64,
		creator_id: i64,
	},
	MoveReplies {
		channel_id: i64,
		message_id: i64,
		creator_id: i64,
	},
	MoveConversation {
		channel_id: i64,
		message_id: i64,
		#[serde(default = "default_lookback")]
		lookback: usize,
		creator_id: i64,
	},
	BackfillThreads {
		guild_id: i64,
	},
}

fn default_move_amount() -> i64 {
	10
}

fn default_lookback() -> usize {
	80
}

impl ChatCommand {
	pub fn name(&self) -> &'static str {
		match self {
			ChatCommand::LinkRepository { .. } => "link_repository",
			ChatCommand::SyncIssue { .. } => "sync_issue",
			ChatCommand::SyncLabels { .. } => "sync_labels",
			ChatCommand::MoveFrom { .. } => "move_from",
			ChatCommand::MoveReplies { .. } => "move_replies",
			ChatCommand::MoveConversation { .. } => "move_conversation",
			ChatCommand::BackfillThreads { .. } => "backfill_threads",
		}
	}
}
