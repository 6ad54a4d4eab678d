// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Replays messages into another channel or thread under the original
//! author's name and avatar.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{ChatError, ReplicateError};
use crate::platform::{ExecuteTarget, WebhookTransport};
use crate::types::{
	ChatMessage, Destination, FileUpload, Identity, MessageRef, OutgoingMessage, Webhook,
};

pub const DEFAULT_WEBHOOK_NAME: &str = "Mikro Sender";

/// Source message id to the mirror that replaced it.
pub type MirrorMap = BTreeMap<i64, MessageRef>;

pub struct MessageReplicator {
	transport: Arc<dyn WebhookTransport>,
	webhook_name: String,
	/// One webhook per parent channel.
	webhooks: Mutex<HashMap<i64, Webhook>>,
}

impl MessageReplicator {
	pub fn new(transport: Arc<dyn WebhookTransport>) -> Self {
		Self {
			transport,
			webhook_name: DEFAULT_WEBHOOK_NAME.to_string(),
			webhooks: Mutex::new(HashMap::new()),
		}
	}

	pub fn with_webhook_name(mut self, name: impl Into<String>) -> Self {
		self.webhook_name = name.into();
		self
	}

	pub fn webhook_name(&self) -> &str {
		&self.webhook_name
	}

	/// Find the named webhook in `channel_id`, creating it when absent.
	async fn webhook(&self, channel_id: i64) -> Result<Webhook, ReplicateError> {
		let mut cache = self.webhooks.lock().await;
		if let Some(webhook) = cache.get(&channel_id) {
			return Ok(webhook.clone());
		}

		let wrap = |source| ReplicateError::Webhook { channel_id, source };
		let existing = self.transport.list_webhooks(channel_id).await.map_err(wrap)?;
		let webhook = match existing
			.into_iter()
			.find(|w| w.name == self.webhook_name && w.token.is_some())
		{
			Some(webhook) => webhook,
			None => {
				info!(channel_id, name = %self.webhook_name, "Creating impersonation webhook");
				self
					.transport
					.create_webhook(channel_id, &self.webhook_name)
					.await
					.map_err(wrap)?
			}
		};

		cache.insert(channel_id, webhook.clone());
		Ok(webhook)
	}

	async fn evict(&self, channel_id: i64) {
		self.webhooks.lock().await.remove(&channel_id);
	}

	async fn execute(
		&self,
		channel_id: i64,
		target: ExecuteTarget,
		message: &OutgoingMessage,
	) -> Result<ChatMessage, ReplicateError> {
		let webhook = self.webhook(channel_id).await?;
		match self.transport.execute(&webhook, &target, message).await {
			Ok(sent) => Ok(sent),
			Err(e) => {
				if e.is_not_found() {
					warn!(channel_id, webhook_id = webhook.id, "Cached webhook is gone");
					self.evict(channel_id).await;
				}
				Err(ReplicateError::Execute(e))
			}
		}
	}

	async fn download_attachments(&self, source: &ChatMessage) -> Vec<FileUpload> {
		let mut files = Vec::with_capacity(source.attachments.len());
		for attachment in &source.attachments {
			match self.transport.download(attachment).await {
				Ok(data) => files.push(FileUpload {
					filename: attachment.filename.clone(),
					content_type: attachment.content_type.clone(),
					data,
				}),
				Err(e) => warn!(
					message_id = source.id,
					attachment = %attachment.filename,
					error = %e,
					"Dropping attachment that could not be downloaded"
				),
			}
		}
		files
	}

	/// Post a copy of `source` into `destination`.
	///
	/// A reply is kept only when its target already has a mirror in
	/// `mirrors`.
	#[instrument(skip(self, source, mirrors), fields(message_id = source.id))]
	pub async fn replicate(
		&self,
		source: &ChatMessage,
		destination: Destination,
		mirrors: &MirrorMap,
	) -> Result<ChatMessage, ReplicateError> {
		let files = self.download_attachments(source).await;
		let outgoing = OutgoingMessage {
			identity: source.author.identity(),
			content: source.content.clone(),
			embeds: source.embeds.clone(),
			files,
			reply: source.reply_to.and_then(|id| mirrors.get(&id).copied()),
		};

		let sent = self
			.execute(destination.webhook_channel(), target_for(destination), &outgoing)
			.await?;
		debug!(mirror_id = sent.id, "Message replicated");
		Ok(sent)
	}

	/// Replicate `messages` in order, threading replies through the mirrors
	/// created along the way.
	pub async fn replicate_all(
		&self,
		messages: &[ChatMessage],
		destination: Destination,
	) -> Result<Vec<ChatMessage>, ReplicateError> {
		let mut mirrors = MirrorMap::new();
		let mut sent = Vec::with_capacity(messages.len());
		for message in messages {
			let mirror = self.replicate(message, destination, &mirrors).await?;
			mirrors.insert(message.id, mirror.reference());
			sent.push(mirror);
		}
		Ok(sent)
	}

	pub async fn send_as(
		&self,
		identity: &Identity,
		content: &str,
		destination: Destination,
	) -> Result<ChatMessage, ReplicateError> {
		let outgoing = OutgoingMessage::text(identity.clone(), content);
		self
			.execute(destination.webhook_channel(), target_for(destination), &outgoing)
			.await
	}

	/// Start a forum post. The returned message's `channel_id` is the new
	/// thread.
	#[instrument(skip(self, identity, content))]
	pub async fn create_forum_post(
		&self,
		forum_id: i64,
		name: &str,
		identity: &Identity,
		content: &str,
		tag_ids: Vec<i64>,
	) -> Result<ChatMessage, ReplicateError> {
		let outgoing = OutgoingMessage::text(identity.clone(), content);
		let target = ExecuteTarget::ForumPost {
			name: name.to_string(),
			applied_tags: tag_ids,
		};
		self.execute(forum_id, target, &outgoing).await
	}

	/// Edit a message previously sent through this channel's webhook.
	pub async fn edit(
		&self,
		destination: Destination,
		message_id: i64,
		content: &str,
	) -> Result<ChatMessage, ReplicateError> {
		let webhook = self.webhook(destination.webhook_channel()).await?;
		self
			.transport
			.edit_message(&webhook, destination.thread_id(), message_id, content)
			.await
			.map_err(ReplicateError::Execute)
	}
}

fn target_for(destination: Destination) -> ExecuteTarget {
	match destination.thread_id() {
		Some(thread_id) => ExecuteTarget::Thread(thread_id),
		None => ExecuteTarget::Channel,
	}
}

impl ReplicateError {
	/// The underlying platform error.
	pub fn chat_error(&self) -> &ChatError {
		match self {
			ReplicateError::Webhook { source, .. } => source,
			ReplicateError::Execute(source) => source,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::{message, FakeWebhookTransport};
	use crate::types::Attachment;

	fn image(url: &str) -> Attachment {
		Attachment {
			id: 1,
			filename: "screenshot.png".into(),
			url: url.into(),
			content_type: Some("image/png".into()),
		}
	}

	#[tokio::test]
	async fn replicated_message_keeps_identity_and_reuploads_attachment() {
		let transport = Arc::new(FakeWebhookTransport::new());
		transport.add_download("https://cdn.example/a.png", b"png-bytes");
		let replicator = MessageReplicator::new(transport.clone());

		let mut source = message(1, 500, "look at this");
		source.author.name = "Alice".into();
		source.author.avatar_url = Some("https://cdn.example/alice.png".into());
		source.attachments.push(image("https://cdn.example/a.png"));

		let mirror = replicator
			.replicate(&source, Destination::Channel(900), &MirrorMap::new())
			.await
			.unwrap();

		let executed = transport.executed();
		assert_eq!(executed.len(), 1);
		let sent = &executed[0].message;
		assert_eq!(sent.identity.name, "Alice");
		assert_eq!(
			sent.identity.avatar_url.as_deref(),
			Some("https://cdn.example/alice.png")
		);
		assert_eq!(sent.files.len(), 1);
		assert_eq!(&sent.files[0].data[..], b"png-bytes");
		assert_eq!(mirror.author.name, "Alice");
		assert_eq!(mirror.channel_id, 900);
	}

	#[tokio::test]
	async fn failed_download_sends_without_attachment() {
		let transport = Arc::new(FakeWebhookTransport::new());
		let replicator = MessageReplicator::new(transport.clone());

		let mut source = message(1, 500, "broken link");
		source.attachments.push(image("https://cdn.example/expired.png"));

		replicator
			.replicate(&source, Destination::Channel(900), &MirrorMap::new())
			.await
			.unwrap();

		let executed = transport.executed();
		assert!(executed[0].message.files.is_empty());
		assert_eq!(executed[0].message.content, "broken link");
	}

	#[tokio::test]
	async fn webhook_is_reused_per_channel() {
		let transport = Arc::new(FakeWebhookTransport::new());
		transport.add_webhook(900, DEFAULT_WEBHOOK_NAME);
		let replicator = MessageReplicator::new(transport.clone());

		let first = message(1, 500, "one");
		let second = message(2, 500, "two");
		replicator
			.replicate_all(&[first, second], Destination::Channel(900))
			.await
			.unwrap();
		replicator
			.send_as(&Identity::new("octocat", None), "three", Destination::Channel(901))
			.await
			.unwrap();

		assert_eq!(transport.webhooks_created(), 1);
		assert_eq!(transport.list_calls(), 2);
	}

	#[tokio::test]
	async fn replies_point_at_mirrors_and_unknown_targets_are_dropped() {
		let transport = Arc::new(FakeWebhookTransport::new());
		let replicator = MessageReplicator::new(transport.clone());

		let root = message(1, 500, "question");
		let mut answer = message(2, 500, "answer");
		answer.reply_to = Some(1);
		let mut stray = message(3, 500, "reply to something older");
		stray.reply_to = Some(77);

		let mirrors = replicator
			.replicate_all(
				&[root, answer, stray],
				Destination::Thread {
					parent_id: 900,
					thread_id: 901,
				},
			)
			.await
			.unwrap();

		let executed = transport.executed();
		assert_eq!(executed[0].target, ExecuteTarget::Thread(901));
		assert_eq!(executed[1].message.reply, Some(mirrors[0].reference()));
		assert_eq!(executed[2].message.reply, None);
	}

	#[tokio::test]
	async fn execute_failure_is_fatal_and_evicts_missing_webhook() {
		let transport = Arc::new(FakeWebhookTransport::new());
		let replicator = MessageReplicator::new(transport.clone());
		transport.fail_execute(Some(ChatError::NotFound("Unknown Webhook".into())));

		let err = replicator
			.send_as(&Identity::new("octocat", None), "hi", Destination::Channel(900))
			.await
			.unwrap_err();
		assert!(matches!(err, ReplicateError::Execute(ChatError::NotFound(_))));

		transport.fail_execute(None);
		replicator
			.send_as(&Identity::new("octocat", None), "hi", Destination::Channel(900))
			.await
			.unwrap();
		assert_eq!(transport.list_calls(), 2);
	}

	#[tokio::test]
	async fn forum_post_starts_a_new_thread() {
		let transport = Arc::new(FakeWebhookTransport::new());
		let replicator = MessageReplicator::new(transport.clone());

		let starter = replicator
			.create_forum_post(
				700,
				"[widgets] Crash on load",
				&Identity::new("octocat", None),
				"Steps to reproduce",
				vec![11, 12],
			)
			.await
			.unwrap();

		let executed = transport.executed();
		assert_eq!(
			executed[0].target,
			ExecuteTarget::ForumPost {
				name: "[widgets] Crash on load".into(),
				applied_tags: vec![11, 12],
			}
		);
		assert_eq!(starter.channel_id, starter.id);
	}
}
