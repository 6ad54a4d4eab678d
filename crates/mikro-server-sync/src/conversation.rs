// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Splitting a channel conversation into a new thread.

use std::sync::Arc;

use mikro_chat_core::{
	reply_chain, thread_name, ChatMessage, ChatPlatform, ChatThread, Destination, Embed,
	MessageReplicator, ReplyChainOptions,
};
use tracing::{info, instrument};

use crate::engine::DEFAULT_REPLY_LOOKBACK;
use crate::error::{Result, SyncError};

/// Requests above this are cut down to [`CAPPED_MOVE_AMOUNT`].
pub const MAX_MOVE_AMOUNT: i64 = 30;
pub const CAPPED_MOVE_AMOUNT: i64 = 20;

const BLANK_THREAD_NAME: &str = "Blank";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovedConversation {
	pub thread: ChatThread,
	/// The summary embed the thread was started from.
	pub summary_message_id: i64,
	pub moved: usize,
}

pub struct ConversationMover {
	platform: Arc<dyn ChatPlatform>,
	replicator: Arc<MessageReplicator>,
	lookback: usize,
}

impl ConversationMover {
	pub fn new(platform: Arc<dyn ChatPlatform>, replicator: Arc<MessageReplicator>) -> Self {
		Self {
			platform,
			replicator,
			lookback: DEFAULT_REPLY_LOOKBACK,
		}
	}

	pub fn with_lookback(mut self, lookback: usize) -> Self {
		self.lookback = lookback;
		self
	}

	/// Move `amount` messages ending at the anchor (or the latest message).
	#[instrument(skip(self))]
	pub async fn move_from(
		&self,
		channel_id: i64,
		anchor_message_id: Option<i64>,
		amount: i64,
		creator_id: i64,
	) -> Result<MovedConversation> {
		if amount < 1 {
			return Err(SyncError::InvalidArgument(format!(
				"amount must be at least 1, got {amount}"
			)));
		}
		let amount = if amount > MAX_MOVE_AMOUNT {
			CAPPED_MOVE_AMOUNT
		} else {
			amount
		} as usize;

		let mut messages = match anchor_message_id {
			Some(anchor_id) => {
				let anchor = self.platform.get_message(channel_id, anchor_id).await?;
				let mut older = if amount > 1 {
					self
						.platform
						.history(channel_id, Some(anchor_id), amount - 1)
						.await?
				} else {
					Vec::new()
				};
				older.push(anchor);
				older
			}
			None => self.platform.history(channel_id, None, amount).await?,
		};
		messages.sort_by_key(|m| (m.created_at, m.id));

		self
			.create_thread_with_messages(channel_id, &messages, creator_id)
			.await
	}

	/// Move the explicit reply chain the message belongs to.
	pub async fn move_replies(
		&self,
		channel_id: i64,
		message_id: i64,
		creator_id: i64,
	) -> Result<MovedConversation> {
		let options = ReplyChainOptions::replies(self.lookback);
		self
			.move_chain(channel_id, message_id, creator_id, &options)
			.await
	}

	/// Move the conversation around the message, including nearby messages
	/// that do not reply to anything.
	pub async fn move_conversation(
		&self,
		channel_id: i64,
		message_id: i64,
		lookback: usize,
		creator_id: i64,
	) -> Result<MovedConversation> {
		let options = ReplyChainOptions::conversation(lookback);
		self
			.move_chain(channel_id, message_id, creator_id, &options)
			.await
	}

	async fn move_chain(
		&self,
		channel_id: i64,
		message_id: i64,
		creator_id: i64,
		options: &ReplyChainOptions,
	) -> Result<MovedConversation> {
		let seed = self.platform.get_message(channel_id, message_id).await?;
		let mut window = if seed.reply_to.is_some() {
			self
				.platform
				.history(channel_id, Some(message_id), options.lookback)
				.await?
		} else {
			Vec::new()
		};
		window.reverse();

		let chain: Vec<ChatMessage> = reply_chain(&window, &seed, options)
			.into_iter()
			.cloned()
			.collect();
		self
			.create_thread_with_messages(channel_id, &chain, creator_id)
			.await
	}

	/// Post the summary embed, start a thread from it and replay `messages`
	/// into the thread in order.
	#[instrument(skip(self, messages), fields(count = messages.len()))]
	pub async fn create_thread_with_messages(
		&self,
		channel_id: i64,
		messages: &[ChatMessage],
		creator_id: i64,
	) -> Result<MovedConversation> {
		let Some(first) = messages.first() else {
			return Err(SyncError::InvalidArgument("no messages to move".into()));
		};

		let embed = Embed {
			description: Some(format!(
				"<@{creator_id}> Pulled {} messages starting from **[here]({})**",
				messages.len(),
				first.jump_url()
			)),
			timestamp: Some(first.created_at),
			..Embed::default()
		};
		let summary = self.platform.send_embed(channel_id, &embed).await?;

		let name_source = if first.content.is_empty() {
			BLANK_THREAD_NAME
		} else {
			first.content.as_str()
		};
		let thread = self
			.platform
			.start_thread_from_message(channel_id, summary.id, &thread_name(name_source))
			.await?;

		let destination = Destination::Thread {
			parent_id: channel_id,
			thread_id: thread.id,
		};
		let mirrors = self.replicator.replicate_all(messages, destination).await?;

		info!(thread_id = thread.id, moved = mirrors.len(), "conversation moved");
		Ok(MovedConversation {
			thread,
			summary_message_id: summary.id,
			moved: mirrors.len(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use mikro_chat_core::testing::{message, FakeChatPlatform, FakeWebhookTransport};

	const CHANNEL: i64 = 300;

	fn mover() -> (ConversationMover, Arc<FakeChatPlatform>, Arc<FakeWebhookTransport>) {
		let platform = Arc::new(FakeChatPlatform::new());
		let transport = Arc::new(FakeWebhookTransport::new());
		let replicator = Arc::new(MessageReplicator::new(transport.clone()));
		(ConversationMover::new(platform.clone(), replicator), platform, transport)
	}

	fn reply(id: i64, to: i64, content: &str) -> ChatMessage {
		let mut m = message(id, CHANNEL, content);
		m.reply_to = Some(to);
		m
	}

	#[tokio::test]
	async fn move_from_includes_anchor_and_is_chronological() {
		let (mover, platform, transport) = mover();
		for id in 1..=10 {
			platform.add_message(message(id, CHANNEL, &format!("message {id}")));
		}

		let moved = mover.move_from(CHANNEL, Some(6), 3, 77).await.unwrap();

		assert_eq!(moved.moved, 3);
		let contents: Vec<String> = transport
			.executed()
			.iter()
			.map(|e| e.message.content.clone())
			.collect();
		assert_eq!(contents, vec!["message 4", "message 5", "message 6"]);
		assert_eq!(moved.thread.name, "message 4");
		assert_eq!(moved.thread.id, moved.summary_message_id);
	}

	#[tokio::test]
	async fn move_from_caps_large_amounts_and_rejects_zero() {
		let (mover, platform, _) = mover();
		for id in 1..=40 {
			platform.add_message(message(id, CHANNEL, "x"));
		}

		let moved = mover.move_from(CHANNEL, None, 31, 77).await.unwrap();
		assert_eq!(moved.moved, 20);

		let err = mover.move_from(CHANNEL, None, 0, 77).await.unwrap_err();
		assert!(matches!(err, SyncError::InvalidArgument(_)));
	}

	#[tokio::test]
	async fn summary_embed_mentions_creator_and_links_first_message() {
		let (mover, platform, _) = mover();
		platform.add_message(message(1, CHANNEL, ""));
		platform.add_message(message(2, CHANNEL, "second"));

		let moved = mover.move_from(CHANNEL, None, 2, 77).await.unwrap();

		let embeds = platform.sent_embeds();
		assert_eq!(embeds.len(), 1);
		let description = embeds[0].1.description.clone().unwrap();
		assert!(description.starts_with("<@77> Pulled 2 messages starting from **[here]("));
		assert!(description.contains("/300/1)"));
		assert_eq!(moved.thread.name, "Blank");
	}

	#[tokio::test]
	async fn move_replies_follows_the_explicit_chain() {
		let (mover, platform, transport) = mover();
		platform.add_message(message(1, CHANNEL, "question"));
		platform.add_message(message(2, CHANNEL, "unrelated"));
		platform.add_message(reply(3, 1, "answer"));
		platform.add_message(reply(4, 3, "thanks"));

		let moved = mover.move_replies(CHANNEL, 4, 77).await.unwrap();

		assert_eq!(moved.moved, 3);
		let replies: Vec<Option<i64>> = transport
			.executed()
			.iter()
			.map(|e| e.message.reply.map(|r| r.message_id))
			.collect();
		let mirrors: Vec<i64> = transport.executed().iter().map(|e| e.result.id).collect();
		assert_eq!(replies, vec![None, Some(mirrors[0]), Some(mirrors[1])]);
	}

	#[tokio::test]
	async fn unanchored_message_moves_alone() {
		let (mover, platform, _) = mover();
		platform.add_message(message(1, CHANNEL, "hello"));
		platform.add_message(message(2, CHANNEL, "standalone"));

		let moved = mover.move_conversation(CHANNEL, 2, 80, 77).await.unwrap();

		assert_eq!(moved.moved, 1);
		assert_eq!(moved.thread.name, "standalone");
	}
}
