// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Platform-neutral chat entities. Snowflakes are carried as `i64`; adapters
//! parse string ids at their boundary.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
	pub id: i64,
	/// Display name as shown in the guild.
	pub name: String,
	#[serde(default)]
	pub avatar_url: Option<String>,
	#[serde(default)]
	pub bot: bool,
}

impl Author {
	pub fn mention(&self) -> String {
		format!("<@{}>", self.id)
	}

	pub fn identity(&self) -> Identity {
		Identity {
			name: self.name.clone(),
			avatar_url: self.avatar_url.clone(),
		}
	}
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Embed {
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub title: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub description: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub color: Option<u32>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
	pub id: i64,
	pub filename: String,
	pub url: String,
	#[serde(default)]
	pub content_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
	pub id: i64,
	pub channel_id: i64,
	#[serde(default)]
	pub guild_id: Option<i64>,
	pub author: Author,
	#[serde(default)]
	pub content: String,
	#[serde(default)]
	pub embeds: Vec<Embed>,
	#[serde(default)]
	pub attachments: Vec<Attachment>,
	/// Id of the message this one explicitly replies to.
	#[serde(default)]
	pub reply_to: Option<i64>,
	/// Set when the message was posted through a webhook.
	#[serde(default)]
	pub webhook_id: Option<i64>,
	pub created_at: DateTime<Utc>,
}

impl ChatMessage {
	/// Bot and webhook messages are never relayed to the tracker, which also
	/// covers mirrors posted by the replicator.
	pub fn is_automated(&self) -> bool {
		self.author.bot || self.webhook_id.is_some()
	}

	pub fn reference(&self) -> MessageRef {
		MessageRef {
			guild_id: self.guild_id,
			channel_id: self.channel_id,
			message_id: self.id,
		}
	}

	pub fn jump_url(&self) -> String {
		self.reference().jump_url()
	}

	/// Text describing the message for a thread's starting-message column.
	pub fn summary_text(&self) -> String {
		if !self.content.is_empty() {
			return self.content.clone();
		}
		if let Some(embed) = self.embeds.first() {
			if let Some(description) = embed.description.as_ref().filter(|d| !d.is_empty()) {
				return description.clone();
			}
			if let Some(title) = embed.title.as_ref().filter(|t| !t.is_empty()) {
				return title.clone();
			}
		}
		if let Some(attachment) = self.attachments.first() {
			return attachment.filename.clone();
		}
		"[None]".to_string()
	}
}

/// Address of a message, enough to build a jump link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRef {
	pub guild_id: Option<i64>,
	pub channel_id: i64,
	pub message_id: i64,
}

impl MessageRef {
	pub fn jump_url(&self) -> String {
		let guild = self
			.guild_id
			.map(|g| g.to_string())
			.unwrap_or_else(|| "@me".to_string());
		format!(
			"https://discord.com/channels/{guild}/{}/{}",
			self.channel_id, self.message_id
		)
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatThread {
	pub id: i64,
	pub guild_id: i64,
	/// Forum or text channel the thread lives under.
	pub parent_id: i64,
	pub owner_id: i64,
	pub name: String,
	#[serde(default)]
	pub applied_tags: Vec<i64>,
	#[serde(default)]
	pub archived: bool,
	#[serde(default)]
	pub locked: bool,
	#[serde(default = "default_public")]
	pub public: bool,
	#[serde(default)]
	pub last_message_id: Option<i64>,
}

fn default_public() -> bool {
	true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumTag {
	pub id: i64,
	pub name: String,
	#[serde(default)]
	pub moderated: bool,
}

/// Partial thread modification. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThreadEdit {
	pub name: Option<String>,
	pub archived: Option<bool>,
	pub locked: Option<bool>,
	pub applied_tags: Option<Vec<i64>>,
	pub rate_limit_per_user: Option<u32>,
}

impl ThreadEdit {
	pub fn is_empty(&self) -> bool {
		*self == ThreadEdit::default()
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Webhook {
	pub id: i64,
	pub channel_id: i64,
	pub name: String,
	/// Absent on webhooks the bot cannot execute.
	#[serde(default)]
	pub token: Option<String>,
}

/// Display identity a webhook message is posted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
	pub name: String,
	#[serde(default)]
	pub avatar_url: Option<String>,
}

impl Identity {
	pub fn new(name: impl Into<String>, avatar_url: Option<String>) -> Self {
		Self {
			name: name.into(),
			avatar_url,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpload {
	pub filename: String,
	pub content_type: Option<String>,
	pub data: Bytes,
}

/// A message to post through an impersonation webhook. Mentions are never
/// allowed to ping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
	pub identity: Identity,
	pub content: String,
	pub embeds: Vec<Embed>,
	pub files: Vec<FileUpload>,
	/// Mirror of the message being replied to, rendered by the adapter.
	pub reply: Option<MessageRef>,
}

impl OutgoingMessage {
	pub fn text(identity: Identity, content: impl Into<String>) -> Self {
		Self {
			identity,
			content: content.into(),
			embeds: Vec::new(),
			files: Vec::new(),
			reply: None,
		}
	}
}

/// Where replicated content lands. Webhooks belong to the parent channel, so
/// a thread destination carries both ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Destination {
	Channel(i64),
	Thread { parent_id: i64, thread_id: i64 },
}

impl Destination {
	pub fn webhook_channel(&self) -> i64 {
		match self {
			Destination::Channel(id) => *id,
			Destination::Thread { parent_id, .. } => *parent_id,
		}
	}

	pub fn thread_id(&self) -> Option<i64> {
		match self {
			Destination::Channel(_) => None,
			Destination::Thread { thread_id, .. } => Some(*thread_id),
		}
	}
}
