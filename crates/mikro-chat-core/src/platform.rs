// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Seams to the chat platform's REST API.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::Result;
use crate::types::{
	Attachment, ChatMessage, ChatThread, Embed, ForumTag, OutgoingMessage, ThreadEdit, Webhook,
};

/// Bot-authenticated platform calls.
#[async_trait]
pub trait ChatPlatform: Send + Sync {
	async fn get_thread(&self, thread_id: i64) -> Result<ChatThread>;

	async fn get_message(&self, channel_id: i64, message_id: i64) -> Result<ChatMessage>;

	/// Up to `limit` messages strictly before `before` (or the latest when
	/// `None`), newest first.
	async fn history(
		&self,
		channel_id: i64,
		before: Option<i64>,
		limit: usize,
	) -> Result<Vec<ChatMessage>>;

	async fn edit_thread(&self, thread_id: i64, edit: &ThreadEdit) -> Result<ChatThread>;

	async fn send_embed(&self, channel_id: i64, embed: &Embed) -> Result<ChatMessage>;

	async fn start_thread_from_message(
		&self,
		channel_id: i64,
		message_id: i64,
		name: &str,
	) -> Result<ChatThread>;

	async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<()>;

	async fn forum_tags(&self, forum_id: i64) -> Result<Vec<ForumTag>>;

	async fn create_forum_tag(&self, forum_id: i64, name: &str, moderated: bool)
		-> Result<ForumTag>;

	async fn active_threads(&self, guild_id: i64) -> Result<Vec<ChatThread>>;
}

/// Where a webhook execution is delivered inside the webhook's channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecuteTarget {
	Channel,
	Thread(i64),
	/// Start a new forum post; the returned message lives in the new thread.
	ForumPost { name: String, applied_tags: Vec<i64> },
}

/// Impersonation webhook calls.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
	async fn list_webhooks(&self, channel_id: i64) -> Result<Vec<Webhook>>;

	async fn create_webhook(&self, channel_id: i64, name: &str) -> Result<Webhook>;

	async fn execute(
		&self,
		webhook: &Webhook,
		target: &ExecuteTarget,
		message: &OutgoingMessage,
	) -> Result<ChatMessage>;

	async fn edit_message(
		&self,
		webhook: &Webhook,
		thread_id: Option<i64>,
		message_id: i64,
		content: &str,
	) -> Result<ChatMessage>;

	async fn download(&self, attachment: &Attachment) -> Result<Bytes>;
}
