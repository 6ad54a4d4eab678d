// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use async_trait::async_trait;
use bytes::Bytes;
use mikro_chat_core::{
	Attachment, ChatError, ChatMessage, ExecuteTarget, OutgoingMessage, Result, Webhook,
	WebhookTransport,
};
use reqwest::multipart::{Form, Part};
use reqwest::Method;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::client::{truncate_content, DiscordClient};
use crate::wire::{WireMessage, WireWebhook};

fn webhook_path(webhook: &Webhook) -> Result<String> {
	let token = webhook.token.as_deref().ok_or_else(|| {
		ChatError::InvalidRequest(format!("webhook {} has no token", webhook.id))
	})?;
	Ok(format!("webhooks/{}/{token}", webhook.id))
}

/// Content with a quoted jump link to the replied-to mirror.
fn render_content(message: &OutgoingMessage) -> String {
	let content = match &message.reply {
		Some(reply) => format!("> [Reply to]({})\n{}", reply.jump_url(), message.content),
		None => message.content.clone(),
	};
	truncate_content(&content)
}

fn execute_payload(target: &ExecuteTarget, message: &OutgoingMessage) -> Value {
	let mut payload = json!({
		"username": message.identity.name,
		"allowed_mentions": { "parse": [] },
	});
	let content = render_content(message);
	if !content.is_empty() {
		payload["content"] = json!(content);
	}
	if let Some(avatar) = &message.identity.avatar_url {
		payload["avatar_url"] = json!(avatar);
	}
	if !message.embeds.is_empty() {
		payload["embeds"] = json!(message.embeds);
	}
	if let ExecuteTarget::ForumPost { name, applied_tags } = target {
		payload["thread_name"] = json!(name);
		let tags: Vec<String> = applied_tags.iter().map(i64::to_string).collect();
		payload["applied_tags"] = json!(tags);
	}
	payload
}

fn multipart_form(payload: &Value, message: &OutgoingMessage) -> Result<Form> {
	let mut form = Form::new().text("payload_json", payload.to_string());
	for (index, file) in message.files.iter().enumerate() {
		let mut part = Part::bytes(file.data.to_vec()).file_name(file.filename.clone());
		if let Some(content_type) = &file.content_type {
			part = part
				.mime_str(content_type)
				.map_err(|e| ChatError::InvalidRequest(format!("content type: {e}")))?;
		}
		form = form.part(format!("files[{index}]"), part);
	}
	Ok(form)
}

#[async_trait]
impl WebhookTransport for DiscordClient {
	async fn list_webhooks(&self, channel_id: i64) -> Result<Vec<Webhook>> {
		let hooks: Vec<WireWebhook> = self
			.get_json(&format!("channels/{channel_id}/webhooks"), &[])
			.await?;
		Ok(hooks
			.into_iter()
			.map(|h| h.into_webhook(channel_id))
			.collect())
	}

	#[instrument(skip(self))]
	async fn create_webhook(&self, channel_id: i64, name: &str) -> Result<Webhook> {
		let hook: WireWebhook = self
			.bot_json(
				Method::POST,
				&format!("channels/{channel_id}/webhooks"),
				Some(&json!({ "name": name })),
			)
			.await?;
		Ok(hook.into_webhook(channel_id))
	}

	#[instrument(skip(self, webhook, message), fields(webhook_id = webhook.id, files = message.files.len()))]
	async fn execute(
		&self,
		webhook: &Webhook,
		target: &ExecuteTarget,
		message: &OutgoingMessage,
	) -> Result<ChatMessage> {
		let mut query = vec![("wait", "true".to_string())];
		if let ExecuteTarget::Thread(thread_id) = target {
			query.push(("thread_id", thread_id.to_string()));
		}

		let payload = execute_payload(target, message);
		let request = self
			.webhook_request(Method::POST, &webhook_path(webhook)?)
			.query(&query);
		let request = if message.files.is_empty() {
			request.json(&payload)
		} else {
			request.multipart(multipart_form(&payload, message)?)
		};

		let sent: WireMessage = self.send_json(request).await?;
		let sent = sent.into_message(None);
		debug!(message_id = sent.id, channel_id = sent.channel_id, "Webhook message sent");
		Ok(sent)
	}

	async fn edit_message(
		&self,
		webhook: &Webhook,
		thread_id: Option<i64>,
		message_id: i64,
		content: &str,
	) -> Result<ChatMessage> {
		let path = format!("{}/messages/{message_id}", webhook_path(webhook)?);
		let mut request = self.webhook_request(Method::PATCH, &path).json(&json!({
			"content": truncate_content(content),
			"allowed_mentions": { "parse": [] },
		}));
		if let Some(thread_id) = thread_id {
			request = request.query(&[("thread_id", thread_id.to_string())]);
		}
		let edited: WireMessage = self.send_json(request).await?;
		Ok(edited.into_message(None))
	}

	async fn download(&self, attachment: &Attachment) -> Result<Bytes> {
		self.download_url(&attachment.url).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use httpmock::prelude::*;
	use mikro_chat_core::{FileUpload, Identity, MessageRef};
	use mikro_common_http::RetryConfig;

	fn client(server: &MockServer) -> DiscordClient {
		DiscordClient::new("bot-token")
			.unwrap()
			.with_api_base(server.url("/api/v10"))
			.with_retry_config(RetryConfig::no_retry())
	}

	fn webhook() -> Webhook {
		Webhook {
			id: 55,
			channel_id: 900,
			name: "Mikro Sender".into(),
			token: Some("secret".into()),
		}
	}

	fn sent_json(channel_id: &str) -> Value {
		json!({
			"id": "1234", "channel_id": channel_id, "webhook_id": "55",
			"author": {"id": "55", "username": "Alice", "bot": true},
			"content": "hello",
			"timestamp": "2024-05-01T12:00:00Z"
		})
	}

	#[tokio::test]
	async fn execute_posts_identity_into_thread_without_mentions() {
		let server = MockServer::start();
		let mock = server.mock(|when, then| {
			when.method(POST)
				.path("/api/v10/webhooks/55/secret")
				.query_param("wait", "true")
				.query_param("thread_id", "901")
				.json_body(json!({
					"username": "Alice",
					"avatar_url": "https://cdn.example/alice.png",
					"content": "hello",
					"allowed_mentions": {"parse": []}
				}));
			then.status(200).json_body(sent_json("901"));
		});

		let message = OutgoingMessage::text(
			Identity::new("Alice", Some("https://cdn.example/alice.png".into())),
			"hello",
		);
		let sent = client(&server)
			.execute(&webhook(), &ExecuteTarget::Thread(901), &message)
			.await
			.unwrap();

		assert_eq!(sent.channel_id, 901);
		assert_eq!(sent.webhook_id, Some(55));
		mock.assert();
	}

	#[tokio::test]
	async fn attachments_are_uploaded_as_multipart() {
		let server = MockServer::start();
		let mock = server.mock(|when, then| {
			when.method(POST)
				.path("/api/v10/webhooks/55/secret")
				.body_includes("payload_json")
				.body_includes("filename=\"screenshot.png\"")
				.body_includes("png-bytes");
			then.status(200).json_body(sent_json("900"));
		});

		let mut message = OutgoingMessage::text(Identity::new("Alice", None), "see attached");
		message.files.push(FileUpload {
			filename: "screenshot.png".into(),
			content_type: Some("image/png".into()),
			data: Bytes::from_static(b"png-bytes"),
		});

		client(&server)
			.execute(&webhook(), &ExecuteTarget::Channel, &message)
			.await
			.unwrap();
		mock.assert();
	}

	#[test]
	fn forum_post_payload_carries_name_and_tags() {
		let message = OutgoingMessage::text(Identity::new("octocat", None), "body");
		let payload = execute_payload(
			&ExecuteTarget::ForumPost {
				name: "[widgets] Crash".into(),
				applied_tags: vec![10, 11],
			},
			&message,
		);
		assert_eq!(payload["thread_name"], "[widgets] Crash");
		assert_eq!(payload["applied_tags"], json!(["10", "11"]));
	}

	#[test]
	fn reply_is_rendered_as_quoted_jump_link() {
		let mut message = OutgoingMessage::text(Identity::new("Alice", None), "agreed");
		message.reply = Some(MessageRef {
			guild_id: Some(1),
			channel_id: 2,
			message_id: 3,
		});
		assert_eq!(
			render_content(&message),
			"> [Reply to](https://discord.com/channels/1/2/3)\nagreed"
		);
	}

	#[test]
	fn webhook_without_token_cannot_execute() {
		let mut hook = webhook();
		hook.token = None;
		assert!(matches!(
			webhook_path(&hook),
			Err(ChatError::InvalidRequest(_))
		));
	}
}
