// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Synchronization between chat forum threads and tracker issues.
//!
//! [`SyncEngine`] consumes relayed chat events and verified tracker webhooks,
//! compares each field against the correlation rows and pushes only what
//! diverges. Every tracker mutation for an installation runs under that
//! installation's lock in [`InstallationLockRegistry`], which is what keeps a
//! webhook echo from racing the write that caused it.

pub mod cache;
pub mod commands;
pub mod content;
pub mod conversation;
pub mod engine;
pub mod error;
pub mod lock_registry;
pub mod reconcile;
pub mod repos;
pub mod testing;
pub mod thread_registry;

pub use cache::BoundedCache;
pub use commands::CommandOutcome;
pub use content::{format_comment_body, EMPTY_BODY};
pub use conversation::{ConversationMover, MovedConversation};
pub use engine::{LinkedRepo, SyncEngine, SyncSettings};
pub use error::{Result, SyncError};
pub use lock_registry::{InstallationGuard, InstallationLockRegistry};
pub use reconcile::{
	format_thread_title, split_title, title_matches, MirrorReport, ReconcileReport, SyncedField,
	TrackerState,
};
pub use repos::IssueSync;
pub use thread_registry::{ThreadLookup, ThreadRegistry};

