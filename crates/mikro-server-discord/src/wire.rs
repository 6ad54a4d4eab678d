// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Discord JSON objects and their conversion to chat-core types. Snowflakes
//! arrive as strings and are parsed here.

use chrono::{DateTime, Utc};
use mikro_chat_core::{Attachment, Author, ChatMessage, ChatThread, Embed, ForumTag, Webhook};
use serde::{Deserialize, Deserializer};

const PRIVATE_THREAD: u8 = 12;
const CDN_BASE: &str = "https://cdn.discordapp.com";

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSnowflake {
	Text(String),
	Number(i64),
}

impl RawSnowflake {
	fn parse<E: serde::de::Error>(self) -> Result<i64, E> {
		match self {
			RawSnowflake::Number(n) => Ok(n),
			RawSnowflake::Text(s) => s
				.parse()
				.map_err(|_| E::custom(format!("invalid snowflake: {s}"))),
		}
	}
}

fn snowflake<'de, D: Deserializer<'de>>(d: D) -> Result<i64, D::Error> {
	RawSnowflake::deserialize(d)?.parse()
}

fn opt_snowflake<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
	Option::<RawSnowflake>::deserialize(d)?
		.map(RawSnowflake::parse)
		.transpose()
}

fn snowflakes<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<i64>, D::Error> {
	Option::<Vec<RawSnowflake>>::deserialize(d)?
		.unwrap_or_default()
		.into_iter()
		.map(RawSnowflake::parse)
		.collect()
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireUser {
	#[serde(deserialize_with = "snowflake")]
	id: i64,
	username: String,
	#[serde(default)]
	global_name: Option<String>,
	#[serde(default)]
	avatar: Option<String>,
	#[serde(default)]
	bot: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireMember {
	#[serde(default)]
	nick: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireReference {
	#[serde(default, deserialize_with = "opt_snowflake")]
	message_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireAttachment {
	#[serde(deserialize_with = "snowflake")]
	id: i64,
	filename: String,
	url: String,
	#[serde(default)]
	content_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
	#[serde(deserialize_with = "snowflake")]
	id: i64,
	#[serde(deserialize_with = "snowflake")]
	channel_id: i64,
	#[serde(default, deserialize_with = "opt_snowflake")]
	guild_id: Option<i64>,
	author: WireUser,
	#[serde(default)]
	member: Option<WireMember>,
	#[serde(default)]
	content: String,
	#[serde(default)]
	embeds: Vec<Embed>,
	#[serde(default)]
	attachments: Vec<WireAttachment>,
	#[serde(default)]
	message_reference: Option<WireReference>,
	#[serde(default, deserialize_with = "opt_snowflake")]
	webhook_id: Option<i64>,
	timestamp: DateTime<Utc>,
}

impl WireMessage {
	/// `guild_id` is omitted on some responses; the caller may know it.
	pub(crate) fn into_message(self, guild_id: Option<i64>) -> ChatMessage {
		let name = self
			.member
			.and_then(|m| m.nick)
			.or(self.author.global_name)
			.unwrap_or(self.author.username);
		let avatar_url = self
			.author
			.avatar
			.map(|hash| format!("{CDN_BASE}/avatars/{}/{hash}.png", self.author.id));

		ChatMessage {
			id: self.id,
			channel_id: self.channel_id,
			guild_id: self.guild_id.or(guild_id),
			author: Author {
				id: self.author.id,
				name,
				avatar_url,
				bot: self.author.bot,
			},
			content: self.content,
			embeds: self.embeds,
			attachments: self
				.attachments
				.into_iter()
				.map(|a| Attachment {
					id: a.id,
					filename: a.filename,
					url: a.url,
					content_type: a.content_type,
				})
				.collect(),
			reply_to: self.message_reference.and_then(|r| r.message_id),
			webhook_id: self.webhook_id,
			created_at: self.timestamp,
		}
	}
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct WireThreadMetadata {
	#[serde(default)]
	archived: bool,
	#[serde(default)]
	locked: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireTag {
	#[serde(deserialize_with = "snowflake")]
	id: i64,
	name: String,
	#[serde(default)]
	moderated: bool,
}

impl From<WireTag> for ForumTag {
	fn from(tag: WireTag) -> Self {
		ForumTag {
			id: tag.id,
			name: tag.name,
			moderated: tag.moderated,
		}
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireChannel {
	#[serde(deserialize_with = "snowflake")]
	id: i64,
	#[serde(rename = "type")]
	kind: u8,
	#[serde(default, deserialize_with = "opt_snowflake")]
	guild_id: Option<i64>,
	#[serde(default, deserialize_with = "opt_snowflake")]
	parent_id: Option<i64>,
	#[serde(default, deserialize_with = "opt_snowflake")]
	owner_id: Option<i64>,
	#[serde(default)]
	name: Option<String>,
	#[serde(default, deserialize_with = "snowflakes")]
	applied_tags: Vec<i64>,
	#[serde(default)]
	available_tags: Vec<WireTag>,
	#[serde(default)]
	thread_metadata: Option<WireThreadMetadata>,
	#[serde(default, deserialize_with = "opt_snowflake")]
	last_message_id: Option<i64>,
}

impl WireChannel {
	pub(crate) fn into_thread(self) -> ChatThread {
		let metadata = self.thread_metadata.unwrap_or_default();
		ChatThread {
			id: self.id,
			guild_id: self.guild_id.unwrap_or_default(),
			parent_id: self.parent_id.unwrap_or_default(),
			owner_id: self.owner_id.unwrap_or_default(),
			name: self.name.unwrap_or_default(),
			applied_tags: self.applied_tags,
			archived: metadata.archived,
			locked: metadata.locked,
			public: self.kind != PRIVATE_THREAD,
			last_message_id: self.last_message_id,
		}
	}

	pub(crate) fn into_tags(self) -> Vec<ForumTag> {
		self.available_tags.into_iter().map(ForumTag::from).collect()
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireActiveThreads {
	#[serde(default)]
	pub(crate) threads: Vec<WireChannel>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireWebhook {
	#[serde(deserialize_with = "snowflake")]
	id: i64,
	#[serde(default, deserialize_with = "opt_snowflake")]
	channel_id: Option<i64>,
	#[serde(default)]
	name: Option<String>,
	#[serde(default)]
	token: Option<String>,
}

impl WireWebhook {
	pub(crate) fn into_webhook(self, channel_id: i64) -> Webhook {
		Webhook {
			id: self.id,
			channel_id: self.channel_id.unwrap_or(channel_id),
			name: self.name.unwrap_or_default(),
			token: self.token,
		}
	}
}

#[derive(Debug, Deserialize)]
pub(crate) struct WireRateLimit {
	#[serde(default)]
	pub(crate) retry_after: Option<f64>,
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn message_prefers_nick_then_global_name() {
		let raw = json!({
			"id": "1100", "channel_id": "22", "guild_id": "33",
			"author": {"id": "7", "username": "alice_", "global_name": "Alice", "avatar": "abc"},
			"member": {"nick": "Ali"},
			"content": "hi",
			"attachments": [{"id": "5", "filename": "a.png", "url": "https://cdn/a.png", "content_type": "image/png"}],
			"message_reference": {"message_id": "1099"},
			"timestamp": "2024-05-01T12:00:00.000000+00:00"
		});
		let message = serde_json::from_value::<WireMessage>(raw)
			.unwrap()
			.into_message(None);

		assert_eq!(message.id, 1100);
		assert_eq!(message.author.name, "Ali");
		assert_eq!(
			message.author.avatar_url.as_deref(),
			Some("https://cdn.discordapp.com/avatars/7/abc.png")
		);
		assert_eq!(message.reply_to, Some(1099));
		assert_eq!(message.attachments[0].id, 5);

		let raw = json!({
			"id": "1", "channel_id": "2",
			"author": {"id": "7", "username": "alice_", "global_name": "Alice"},
			"timestamp": "2024-05-01T12:00:00Z"
		});
		let message = serde_json::from_value::<WireMessage>(raw)
			.unwrap()
			.into_message(Some(9));
		assert_eq!(message.author.name, "Alice");
		assert_eq!(message.guild_id, Some(9));
	}

	#[test]
	fn thread_channel_maps_metadata_and_tags() {
		let raw = json!({
			"id": "500", "type": 11, "guild_id": "1", "parent_id": "2", "owner_id": "3",
			"name": "[widgets] Crash", "applied_tags": ["10", "11"],
			"thread_metadata": {"archived": true, "locked": false},
			"last_message_id": "777"
		});
		let thread = serde_json::from_value::<WireChannel>(raw)
			.unwrap()
			.into_thread();
		assert_eq!(thread.applied_tags, vec![10, 11]);
		assert!(thread.archived);
		assert!(thread.public);
		assert_eq!(thread.last_message_id, Some(777));
	}

	#[test]
	fn malformed_snowflake_is_rejected() {
		let raw = json!({"id": "abc", "type": 11});
		assert!(serde_json::from_value::<WireChannel>(raw).is_err());
	}
}
