// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use mikro_chat_core::{
	ChatError, ChatMessage, ChatPlatform, ChatThread, Embed, ForumTag, Result, ThreadEdit,
};
use reqwest::Method;
use serde_json::{json, Map, Value};
use tracing::{info, instrument};

use crate::client::DiscordClient;
use crate::wire::{WireActiveThreads, WireChannel, WireMessage};

/// Discord caps message history pages at 100.
const HISTORY_PAGE: usize = 100;

fn thread_edit_body(edit: &ThreadEdit) -> Value {
	let mut body = Map::new();
	if let Some(name) = &edit.name {
		body.insert("name".into(), json!(name));
	}
	if let Some(archived) = edit.archived {
		body.insert("archived".into(), json!(archived));
	}
	if let Some(locked) = edit.locked {
		body.insert("locked".into(), json!(locked));
	}
	if let Some(tags) = &edit.applied_tags {
		let ids: Vec<String> = tags.iter().map(i64::to_string).collect();
		body.insert("applied_tags".into(), json!(ids));
	}
	if let Some(seconds) = edit.rate_limit_per_user {
		body.insert("rate_limit_per_user".into(), json!(seconds));
	}
	Value::Object(body)
}

#[async_trait]
impl ChatPlatform for DiscordClient {
	#[instrument(skip(self))]
	async fn get_thread(&self, thread_id: i64) -> Result<ChatThread> {
		let channel: WireChannel = self.get_json(&format!("channels/{thread_id}"), &[]).await?;
		Ok(channel.into_thread())
	}

	async fn get_message(&self, channel_id: i64, message_id: i64) -> Result<ChatMessage> {
		let message: WireMessage = self
			.get_json(&format!("channels/{channel_id}/messages/{message_id}"), &[])
			.await?;
		Ok(message.into_message(None))
	}

	#[instrument(skip(self))]
	async fn history(
		&self,
		channel_id: i64,
		before: Option<i64>,
		limit: usize,
	) -> Result<Vec<ChatMessage>> {
		let mut collected: Vec<ChatMessage> = Vec::with_capacity(limit);
		let mut cursor = before;
		while collected.len() < limit {
			let page = (limit - collected.len()).min(HISTORY_PAGE);
			let mut query = vec![("limit", page.to_string())];
			if let Some(before) = cursor {
				query.push(("before", before.to_string()));
			}
			let batch: Vec<WireMessage> = self
				.get_json(&format!("channels/{channel_id}/messages"), &query)
				.await?;
			let exhausted = batch.len() < page;
			collected.extend(batch.into_iter().map(|m| m.into_message(None)));
			cursor = collected.last().map(|m| m.id);
			if exhausted || cursor.is_none() {
				break;
			}
		}
		Ok(collected)
	}

	#[instrument(skip(self, edit))]
	async fn edit_thread(&self, thread_id: i64, edit: &ThreadEdit) -> Result<ChatThread> {
		if edit.is_empty() {
			return self.get_thread(thread_id).await;
		}
		let channel: WireChannel = self
			.bot_json(
				Method::PATCH,
				&format!("channels/{thread_id}"),
				Some(&thread_edit_body(edit)),
			)
			.await?;
		Ok(channel.into_thread())
	}

	async fn send_embed(&self, channel_id: i64, embed: &Embed) -> Result<ChatMessage> {
		let body = json!({
			"embeds": [embed],
			"allowed_mentions": { "parse": [] },
		});
		let message: WireMessage = self
			.bot_json(
				Method::POST,
				&format!("channels/{channel_id}/messages"),
				Some(&body),
			)
			.await?;
		Ok(message.into_message(None))
	}

	#[instrument(skip(self))]
	async fn start_thread_from_message(
		&self,
		channel_id: i64,
		message_id: i64,
		name: &str,
	) -> Result<ChatThread> {
		let body = json!({ "name": name });
		let channel: WireChannel = self
			.bot_json(
				Method::POST,
				&format!("channels/{channel_id}/messages/{message_id}/threads"),
				Some(&body),
			)
			.await?;
		Ok(channel.into_thread())
	}

	async fn delete_message(&self, channel_id: i64, message_id: i64) -> Result<()> {
		self
			.send(self.bot_request(
				Method::DELETE,
				&format!("channels/{channel_id}/messages/{message_id}"),
			))
			.await?;
		Ok(())
	}

	async fn forum_tags(&self, forum_id: i64) -> Result<Vec<ForumTag>> {
		let channel: WireChannel = self.get_json(&format!("channels/{forum_id}"), &[]).await?;
		Ok(channel.into_tags())
	}

	/// Discord has no tag endpoint; the full tag list is replaced.
	#[instrument(skip(self))]
	async fn create_forum_tag(
		&self,
		forum_id: i64,
		name: &str,
		moderated: bool,
	) -> Result<ForumTag> {
		let existing = self.forum_tags(forum_id).await?;
		let mut tags: Vec<Value> = existing
			.iter()
			.map(|t| json!({ "id": t.id.to_string(), "name": t.name, "moderated": t.moderated }))
			.collect();
		tags.push(json!({ "name": name, "moderated": moderated }));

		let channel: WireChannel = self
			.bot_json(
				Method::PATCH,
				&format!("channels/{forum_id}"),
				Some(&json!({ "available_tags": tags })),
			)
			.await?;

		let created = channel
			.into_tags()
			.into_iter()
			.find(|t| t.name == name)
			.ok_or_else(|| ChatError::InvalidResponse(format!("tag '{name}' missing after update")))?;
		info!(forum_id, tag_id = created.id, "Created forum tag");
		Ok(created)
	}

	async fn active_threads(&self, guild_id: i64) -> Result<Vec<ChatThread>> {
		let active: WireActiveThreads = self
			.get_json(&format!("guilds/{guild_id}/threads/active"), &[])
			.await?;
		Ok(active
			.threads
			.into_iter()
			.map(WireChannel::into_thread)
			.collect())
	}
}
