// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Thread metadata: a bounded hot cache in front of [`ThreadStore`], filled
//! lazily from the chat platform on a miss.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use mikro_chat_core::{ChatPlatform, ChatThread, ThreadEdit};
use mikro_server_db::{ThreadRecord, ThreadStore};
use tracing::{debug, info, instrument, warn};

use crate::cache::BoundedCache;
use crate::error::Result;

pub const DEFAULT_THREAD_CACHE_SIZE: usize = 1024;

const NO_STARTING_MESSAGE: &str = "[None]";

/// Outcome of [`ThreadRegistry::get_or_fetch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadLookup {
	/// Already in the cache or the store.
	Known(ThreadRecord),
	/// Built from the live thread and persisted by this call.
	Backfilled(ThreadRecord),
}

impl ThreadLookup {
	pub fn record(&self) -> &ThreadRecord {
		match self {
			ThreadLookup::Known(record) | ThreadLookup::Backfilled(record) => record,
		}
	}

	pub fn into_record(self) -> ThreadRecord {
		match self {
			ThreadLookup::Known(record) | ThreadLookup::Backfilled(record) => record,
		}
	}

	pub fn was_backfilled(&self) -> bool {
		matches!(self, ThreadLookup::Backfilled(_))
	}
}

pub struct ThreadRegistry {
	store: Arc<dyn ThreadStore>,
	platform: Arc<dyn ChatPlatform>,
	cache: Mutex<BoundedCache<i64, ThreadRecord>>,
	creation_lock: Arc<tokio::sync::Mutex<()>>,
}

impl ThreadRegistry {
	pub fn new(store: Arc<dyn ThreadStore>, platform: Arc<dyn ChatPlatform>) -> Self {
		Self::with_capacity(store, platform, DEFAULT_THREAD_CACHE_SIZE)
	}

	pub fn with_capacity(
		store: Arc<dyn ThreadStore>,
		platform: Arc<dyn ChatPlatform>,
		cache_size: usize,
	) -> Self {
		Self {
			store,
			platform,
			cache: Mutex::new(BoundedCache::new(cache_size)),
			creation_lock: Arc::new(tokio::sync::Mutex::new(())),
		}
	}

	/// Serializes "create a thread on the platform, then persist it" against
	/// the thread-create listener.
	pub fn creation_lock(&self) -> Arc<tokio::sync::Mutex<()>> {
		Arc::clone(&self.creation_lock)
	}

	fn cache(&self) -> MutexGuard<'_, BoundedCache<i64, ThreadRecord>> {
		self.cache.lock().unwrap_or_else(|e| e.into_inner())
	}

	pub fn cached(&self, thread_id: i64) -> Option<ThreadRecord> {
		self.cache().get(&thread_id)
	}

	/// Cache, then store, then the live thread. Fails only when the thread
	/// does not exist on the platform either.
	#[instrument(skip(self))]
	pub async fn get_or_fetch(&self, thread_id: i64) -> Result<ThreadLookup> {
		if let Some(record) = self.cached(thread_id) {
			return Ok(ThreadLookup::Known(record));
		}

		if let Some(record) = self.store.get(thread_id).await? {
			self.cache().insert(thread_id, record.clone());
			return Ok(ThreadLookup::Known(record));
		}

		let thread = self.platform.get_thread(thread_id).await?;
		let record = self.build_record(&thread).await;
		self.sync(&record, false).await?;

		let stored = self.store.get(thread_id).await?.unwrap_or(record);
		self.cache().insert(thread_id, stored.clone());
		info!(thread_id, "thread backfilled from platform");
		Ok(ThreadLookup::Backfilled(stored))
	}

	pub async fn get(&self, thread_id: i64) -> Result<ThreadRecord> {
		Ok(self.get_or_fetch(thread_id).await?.into_record())
	}

	/// Idempotent upsert followed by a direct cache write.
	pub async fn sync(&self, record: &ThreadRecord, update_if_exists: bool) -> Result<bool> {
		let written = self.store.upsert(record, update_if_exists).await?;
		if update_if_exists || written {
			self.cache().insert(record.thread_id, record.clone());
		} else if let Some(stored) = self.store.get(record.thread_id).await? {
			self.cache().insert(record.thread_id, stored);
		}
		Ok(written)
	}

	async fn build_record(&self, thread: &ChatThread) -> ThreadRecord {
		let starting_message = match self.platform.get_message(thread.id, thread.id).await {
			Ok(message) => message.summary_text(),
			Err(e) => {
				debug!(thread_id = thread.id, error = %e, "starting message unavailable");
				NO_STARTING_MESSAGE.to_string()
			}
		};

		ThreadRecord {
			thread_id: thread.id,
			guild_id: thread.guild_id,
			channel_id: thread.parent_id,
			owner_id: thread.owner_id,
			title: thread.name.clone(),
			starting_message: Some(starting_message),
			tags: self.tag_names(thread).await,
			description: None,
			disable_archive: false,
			public: thread.public,
			last_message_id: thread.last_message_id,
		}
	}

	/// Names of the thread's applied forum tags. Best effort.
	pub async fn tag_names(&self, thread: &ChatThread) -> Vec<String> {
		if thread.applied_tags.is_empty() {
			return Vec::new();
		}
		match self.platform.forum_tags(thread.parent_id).await {
			Ok(available) => {
				let names: HashMap<i64, String> =
					available.into_iter().map(|t| (t.id, t.name)).collect();
				thread
					.applied_tags
					.iter()
					.filter_map(|id| names.get(id).cloned())
					.collect()
			}
			Err(e) => {
				warn!(thread_id = thread.id, error = %e, "could not resolve forum tags");
				Vec::new()
			}
		}
	}

	pub async fn update_title(&self, thread_id: i64, title: &str) -> Result<()> {
		self.store.update_title(thread_id, title).await?;
		self.cache().update(&thread_id, |r| r.title = title.to_string());
		Ok(())
	}

	pub async fn update_tags(&self, thread_id: i64, tags: &[String]) -> Result<()> {
		self.store.update_tags(thread_id, tags).await?;
		self.cache().update(&thread_id, |r| r.tags = tags.to_vec());
		Ok(())
	}

	pub async fn update_owner(&self, thread_id: i64, owner_id: i64) -> Result<()> {
		self.store.update_owner(thread_id, owner_id).await?;
		self.cache().update(&thread_id, |r| r.owner_id = owner_id);
		Ok(())
	}

	pub async fn update_description(&self, thread_id: i64, description: Option<&str>) -> Result<()> {
		self.store.update_description(thread_id, description).await?;
		self
			.cache()
			.update(&thread_id, |r| r.description = description.map(str::to_string));
		Ok(())
	}

	pub async fn update_disable_archive(&self, thread_id: i64, disable: bool) -> Result<()> {
		self.store.update_disable_archive(thread_id, disable).await?;
		self.cache().update(&thread_id, |r| r.disable_archive = disable);
		Ok(())
	}

	/// Never lowers the stored value.
	pub async fn update_last_message_id(&self, thread_id: i64, message_id: i64) -> Result<()> {
		if self.store.raise_last_message_id(thread_id, message_id).await? {
			self.cache().update(&thread_id, |r| {
				r.last_message_id = Some(r.last_message_id.map_or(message_id, |m| m.max(message_id)));
			});
		}
		Ok(())
	}

	pub async fn remove(&self, thread_id: i64) -> Result<bool> {
		let removed = self.store.delete(thread_id).await?;
		self.cache().remove(&thread_id);
		Ok(removed)
	}

	pub async fn on_thread_create(&self, thread: &ChatThread) -> Result<()> {
		let _creating = self.creation_lock.lock().await;
		if self.cache().contains(&thread.id) {
			return Ok(());
		}
		let record = self.build_record(thread).await;
		self.sync(&record, false).await?;
		debug!(thread_id = thread.id, "thread registered");
		Ok(())
	}

	/// Raises `last_message_id` for threads the registry already knows.
	pub async fn on_message(&self, channel_id: i64, message_id: i64) -> Result<()> {
		let known = self.cached(channel_id).is_some() || self.store.get(channel_id).await?.is_some();
		if known {
			self.update_last_message_id(channel_id, message_id).await?;
		}
		Ok(())
	}

	/// Apply registry policy to an update and return the thread as it stands
	/// afterwards.
	#[instrument(skip(self, before, after), fields(thread_id = after.id))]
	pub async fn on_thread_update(
		&self,
		before: Option<&ChatThread>,
		after: &ChatThread,
	) -> Result<ChatThread> {
		let record = match self.get_or_fetch(after.id).await {
			Ok(lookup) => lookup.into_record(),
			Err(e) if e.is_not_found() => return Ok(after.clone()),
			Err(e) => return Err(e),
		};
		let mut effective = after.clone();

		if record.disable_archive && after.archived {
			let edit = ThreadEdit {
				archived: Some(false),
				..ThreadEdit::default()
			};
			match self.platform.edit_thread(after.id, &edit).await {
				Ok(thread) => {
					info!(thread_id = after.id, "persistent thread unarchived");
					effective = thread;
				}
				Err(e) => warn!(thread_id = after.id, error = %e, "could not unarchive thread"),
			}
		}

		let renamed = before.map_or(record.title != after.name, |b| b.name != after.name);
		if renamed {
			self.update_title(after.id, &after.name).await?;
		}

		if before.map_or(true, |b| b.applied_tags != after.applied_tags) {
			let tags = self.tag_names(after).await;
			if tags != record.tags {
				self.update_tags(after.id, &tags).await?;
			}
		}

		Ok(effective)
	}

	pub async fn on_thread_delete(&self, thread_id: i64) -> Result<()> {
		if self.remove(thread_id).await? {
			info!(thread_id, "thread record removed");
		}
		Ok(())
	}

	/// Insert-or-update every live thread and reset its `last_message_id` to
	/// the platform's value. Locally owned fields survive.
	pub async fn backfill(&self, threads: &[ChatThread]) -> Result<usize> {
		let mut written = 0;
		for thread in threads {
			let mut record = self.build_record(thread).await;
			if let Some(existing) = self.store.get(thread.id).await? {
				record.disable_archive = existing.disable_archive;
				record.description = existing.description;
			}
			self.sync(&record, true).await?;
			self
				.store
				.reset_last_message_id(thread.id, thread.last_message_id)
				.await?;
			written += 1;
		}
		info!(count = written, "threads backfilled");
		Ok(written)
	}
}
