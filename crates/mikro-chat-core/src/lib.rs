// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Chat-side building blocks shared by the sync engine and the move commands.
//!
//! Nothing here holds a live session. Platform access goes through
//! [`ChatPlatform`] and [`WebhookTransport`], so the reply graph and the
//! replicator can be driven entirely from fetched message lists.

pub mod error;
pub mod events;
pub mod platform;
pub mod replicator;
pub mod reply_graph;
pub mod testing;
pub mod types;

pub use error::{ChatError, ReplicateError, Result};
pub use events::{ChatCommand, ChatEvent};
pub use platform::{ChatPlatform, ExecuteTarget, WebhookTransport};
pub use replicator::{MessageReplicator, MirrorMap, DEFAULT_WEBHOOK_NAME};
pub use reply_graph::{reply_chain, thread_name, ReplyChainOptions, ReplyGraph, ReplyNode};
pub use types::{
	Attachment, Author, ChatMessage, ChatThread, Destination, Embed, FileUpload, ForumTag, Identity,
	MessageRef, OutgoingMessage, ThreadEdit, Webhook,
};
