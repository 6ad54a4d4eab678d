// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! In-memory [`ChatPlatform`] and [`WebhookTransport`] for tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{TimeZone, Utc};

use crate::error::{ChatError, Result};
use crate::platform::{ChatPlatform, ExecuteTarget, WebhookTransport};
use crate::types::{
	Attachment, Author, ChatMessage, ChatThread, Embed, ForumTag, OutgoingMessage, ThreadEdit,
	Webhook,
};

pub const BOT_USER_ID: i64 = 1;

/// A plain user message with deterministic timestamps (one second per id).
pub fn message(id: i64, channel_id: i64, content: &str) -> ChatMessage {
	ChatMessage {
		id,
		channel_id,
		guild_id: Some(100),
		author: Author {
			id: 42,
			name: "alice".into(),
			avatar_url: None,
			bot: false,
		},
		content: content.into(),
		embeds: Vec::new(),
		attachments: Vec::new(),
		reply_to: None,
		webhook_id: None,
		created_at: Utc
			.timestamp_opt(1_700_000_000 + id, 0)
			.single()
			.unwrap_or_else(Utc::now),
	}
}

pub fn thread(id: i64, parent_id: i64, name: &str) -> ChatThread {
	ChatThread {
		id,
		guild_id: 100,
		parent_id,
		owner_id: 42,
		name: name.into(),
		applied_tags: Vec::new(),
		archived: false,
		locked: false,
		public: true,
		last_message_id: None,
	}
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
	mutex.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Debug, Clone)]
pub struct Executed {
	pub webhook_id: i64,
	pub target: ExecuteTarget,
	pub message: OutgoingMessage,
	pub result: ChatMessage,
}

#[derive(Default)]
struct TransportState {
	next_id: i64,
	webhooks: Vec<Webhook>,
	created: usize,
	list_calls: usize,
	downloads: HashMap<String, Bytes>,
	executed: Vec<Executed>,
	edits: Vec<(i64, String)>,
	fail_execute: Option<ChatError>,
}

pub struct FakeWebhookTransport {
	state: Mutex<TransportState>,
}

impl Default for FakeWebhookTransport {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeWebhookTransport {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(TransportState {
				next_id: 10_000,
				..TransportState::default()
			}),
		}
	}

	pub fn add_webhook(&self, channel_id: i64, name: &str) {
		let mut state = lock(&self.state);
		state.next_id += 1;
		let id = state.next_id;
		state.webhooks.push(Webhook {
			id,
			channel_id,
			name: name.into(),
			token: Some(format!("token-{id}")),
		});
	}

	pub fn add_download(&self, url: &str, data: &[u8]) {
		lock(&self.state)
			.downloads
			.insert(url.into(), Bytes::copy_from_slice(data));
	}

	/// Make every execution fail with a copy of `error` until cleared.
	pub fn fail_execute(&self, error: Option<ChatError>) {
		lock(&self.state).fail_execute = error;
	}

	pub fn executed(&self) -> Vec<Executed> {
		lock(&self.state).executed.clone()
	}

	pub fn edits(&self) -> Vec<(i64, String)> {
		lock(&self.state).edits.clone()
	}

	pub fn webhooks_created(&self) -> usize {
		lock(&self.state).created
	}

	pub fn list_calls(&self) -> usize {
		lock(&self.state).list_calls
	}
}

fn copy_error(error: &ChatError) -> ChatError {
	match error {
		ChatError::NotFound(m) => ChatError::NotFound(m.clone()),
		ChatError::Forbidden(m) => ChatError::Forbidden(m.clone()),
		ChatError::Timeout => ChatError::Timeout,
		other => ChatError::Http(other.to_string()),
	}
}

#[async_trait]
impl WebhookTransport for FakeWebhookTransport {
	async fn list_webhooks(&self, channel_id: i64) -> Result<Vec<Webhook>> {
		let mut state = lock(&self.state);
		state.list_calls += 1;
		Ok(state
			.webhooks
			.iter()
			.filter(|w| w.channel_id == channel_id)
			.cloned()
			.collect())
	}

	async fn create_webhook(&self, channel_id: i64, name: &str) -> Result<Webhook> {
		let mut state = lock(&self.state);
		state.next_id += 1;
		state.created += 1;
		let webhook = Webhook {
			id: state.next_id,
			channel_id,
			name: name.into(),
			token: Some(format!("token-{}", state.next_id)),
		};
		state.webhooks.push(webhook.clone());
		Ok(webhook)
	}

	async fn execute(
		&self,
		webhook: &Webhook,
		target: &ExecuteTarget,
		message: &OutgoingMessage,
	) -> Result<ChatMessage> {
		let mut state = lock(&self.state);
		if let Some(error) = &state.fail_execute {
			return Err(copy_error(error));
		}
		state.next_id += 1;
		let id = state.next_id;
		let channel_id = match target {
			ExecuteTarget::Channel => webhook.channel_id,
			ExecuteTarget::Thread(thread_id) => *thread_id,
			ExecuteTarget::ForumPost { .. } => id,
		};
		let result = ChatMessage {
			id,
			channel_id,
			guild_id: Some(100),
			author: Author {
				id: webhook.id,
				name: message.identity.name.clone(),
				avatar_url: message.identity.avatar_url.clone(),
				bot: true,
			},
			content: message.content.clone(),
			embeds: message.embeds.clone(),
			attachments: Vec::new(),
			reply_to: message.reply.map(|r| r.message_id),
			webhook_id: Some(webhook.id),
			created_at: Utc::now(),
		};
		state.executed.push(Executed {
			webhook_id: webhook.id,
			target: target.clone(),
			message: message.clone(),
			result: result.clone(),
		});
		Ok(result)
	}

	async fn edit_message(
		&self,
		webhook: &Webhook,
		thread_id: Option<i64>,
		message_id: i64,
		content: &str,
	) -> Result<ChatMessage> {
		let mut state = lock(&self.state);
		let original = state
			.executed
			.iter()
			.find(|e| e.result.id == message_id)
			.map(|e| e.result.clone());
		state.edits.push((message_id, content.to_string()));
		let mut edited = original.unwrap_or_else(|| {
			let mut m = message(message_id, thread_id.unwrap_or(webhook.channel_id), "");
			m.webhook_id = Some(webhook.id);
			m
		});
		edited.content = content.to_string();
		Ok(edited)
	}

	async fn download(&self, attachment: &Attachment) -> Result<Bytes> {
		lock(&self.state)
			.downloads
			.get(&attachment.url)
			.cloned()
			.ok_or_else(|| ChatError::NotFound(attachment.url.clone()))
	}
}

#[derive(Default)]
struct PlatformState {
	next_id: i64,
	threads: BTreeMap<i64, ChatThread>,
	/// Oldest first per channel.
	messages: BTreeMap<i64, Vec<ChatMessage>>,
	tags: BTreeMap<i64, Vec<ForumTag>>,
	thread_edits: Vec<(i64, ThreadEdit)>,
	embeds: Vec<(i64, Embed)>,
	deleted: Vec<(i64, i64)>,
}

pub struct FakeChatPlatform {
	state: Mutex<PlatformState>,
}

impl Default for FakeChatPlatform {
	fn default() -> Self {
		Self::new()
	}
}

impl FakeChatPlatform {
	pub fn new() -> Self {
		Self {
			state: Mutex::new(PlatformState {
				next_id: 50_000,
				..PlatformState::default()
			}),
		}
	}

	pub fn add_thread(&self, thread: ChatThread) {
		lock(&self.state).threads.insert(thread.id, thread);
	}

	pub fn add_message(&self, message: ChatMessage) {
		let mut state = lock(&self.state);
		let channel = state.messages.entry(message.channel_id).or_default();
		channel.push(message);
		channel.sort_by_key(|m| m.id);
	}

	pub fn add_tag(&self, forum_id: i64, id: i64, name: &str) {
		lock(&self.state).tags.entry(forum_id).or_default().push(ForumTag {
			id,
			name: name.into(),
			moderated: false,
		});
	}

	pub fn thread(&self, thread_id: i64) -> Option<ChatThread> {
		lock(&self.state).threads.get(&thread_id).cloned()
	}

	pub fn thread_edits(&self) -> Vec<(i64, ThreadEdit)> {
		lock(&self.state).thread_edits.clone()
	}

	pub fn sent_embeds(&self) -> Vec<(i64, Embed)> {
		lock(&self.state).embeds.clone()
	}

	pub fn deleted_messages(&self) -> Vec<(i64, i64)> {
		lock(&self.state).deleted.clone()
	}

	pub fn tags(&self, forum_id: i64) -> Vec<ForumTag> {
		lock(&self.state).tags.get(&forum_id).cloned().unwrap_or_default()
	}
}

#[async_trait]
impl ChatPlatform for FakeChatPlatform {
	async fn get_thread(&self, thread_id: i64) -> Result<ChatThread> {
		self
			.thread(thread_id)
			.ok_or_else(|| ChatError::NotFound(format!("thread {thread_id}")))
	}

	async fn get_message(&self, channel_id: i64, message_id: i64) -> Result<ChatMessage> {
		lock(&self.state)
			.messages
			.get(&channel_id)
			.and_then(|ms| ms.iter().find(|m| m.id == message_id))
			.cloned()
			.ok_or_else(|| ChatError::NotFound(format!("message {message_id}")))
	}

	async fn history(
		&self,
		channel_id: i64,
		before: Option<i64>,
		limit: usize,
	) -> Result<Vec<ChatMessage>> {
		let state = lock(&self.state);
		let Some(messages) = state.messages.get(&channel_id) else {
			return Ok(Vec::new());
		};
		Ok(messages
			.iter()
			.rev()
			.filter(|m| before.map_or(true, |b| m.id < b))
			.take(limit)
			.cloned()
			.collect())
	}

	async fn edit_thread(&self, thread_id: i64, edit: &ThreadEdit) -> Result<ChatThread> {
		let mut state = lock(&self.state);
		state.thread_edits.push((thread_id, edit.clone()));
		let thread = state
			.threads
			.get_mut(&thread_id)
			.ok_or_else(|| ChatError::NotFound(format!("thread {thread_id}")))?;
		if let Some(name) = &edit.name {
			thread.name = name.clone();
		}
		if let Some(archived) = edit.archived {
			thread.archived = archived;
		}
		if let Some(locked) = edit.locked {
			thread.locked = locked;
		}
		if let Some(tags) = &edit.applied_tags {
			thread.applied_tags = tags.clone();
		}
		Ok(thread.clone())
	}

	async fn send_embed(&self, channel_id: i64, embed: &Embed) -> Result<ChatMessage> {
		let mut state = lock(&self.state);
		state.next_id += 1;
		let mut sent = message(state.next_id, channel_id, "");
		sent.author = Author {
			id: BOT_USER_ID,
			name: "mikro".into(),
			avatar_url: None,
			bot: true,
		};
		sent.embeds.push(embed.clone());
		state.embeds.push((channel_id, embed.clone()));
		state
			.messages
			.entry(channel_id)
			.or_default()
			.push(sent.clone());
		Ok(sent)
	}

	async fn start_thread_from_message(
		&self,
		channel_id: i64,
		message_id: i64,
		name: &str,
	) -> Result<ChatThread> {
		let mut started = thread(message_id, channel_id, name);
		started.owner_id = BOT_USER_ID;
		lock(&self.state).threads.insert(message_id, started.clone());
		Ok(started)
	}

	async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<()> {
		let mut state = lock(&self.state);
		state.deleted.push((channel_id, message_id));
		let Some(messages) = state.messages.get_mut(&channel_id) else {
			return Err(ChatError::NotFound(format!("message {message_id}")));
		};
		let before = messages.len();
		messages.retain(|m| m.id != message_id);
		if messages.len() == before {
			return Err(ChatError::NotFound(format!("message {message_id}")));
		}
		Ok(())
	}

	async fn forum_tags(&self, forum_id: i64) -> Result<Vec<ForumTag>> {
		Ok(self.tags(forum_id))
	}

	async fn create_forum_tag(
		&self,
		forum_id: i64,
		name: &str,
		moderated: bool,
	) -> Result<ForumTag> {
		let mut state = lock(&self.state);
		state.next_id += 1;
		let tag = ForumTag {
			id: state.next_id,
			name: name.into(),
			moderated,
		};
		state.tags.entry(forum_id).or_default().push(tag.clone());
		Ok(tag)
	}

	async fn active_threads(&self, guild_id: i64) -> Result<Vec<ChatThread>> {
		Ok(lock(&self.state)
			.threads
			.values()
			.filter(|t| t.guild_id == guild_id && !t.archived)
			.cloned()
			.collect())
	}
}
