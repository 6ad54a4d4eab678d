// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! One async mutex per app installation, created on demand and dropped once
//! nobody holds or waits for it.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::trace;

#[derive(Default)]
struct LockEntry {
	mutex: Arc<AsyncMutex<()>>,
	/// Holders plus waiters. Only changed while the map lock is held.
	users: AtomicUsize,
}

type Entries = Arc<Mutex<HashMap<i64, Arc<LockEntry>>>>;

fn lock_map(entries: &Entries) -> MutexGuard<'_, HashMap<i64, Arc<LockEntry>>> {
	entries.lock().unwrap_or_else(|e| e.into_inner())
}

#[derive(Clone, Default)]
pub struct InstallationLockRegistry {
	entries: Entries,
}

impl InstallationLockRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Wait for the installation's mutex. The returned guard releases it on
	/// drop, including when the waiting future itself is dropped.
	pub async fn acquire(&self, installation_id: i64) -> InstallationGuard {
		let entry = {
			let mut map = lock_map(&self.entries);
			let entry = Arc::clone(map.entry(installation_id).or_default());
			entry.users.fetch_add(1, Ordering::SeqCst);
			entry
		};

		let mut guard = InstallationGuard {
			installation_id,
			entry: Arc::clone(&entry),
			entries: Arc::clone(&self.entries),
			held: None,
		};
		guard.held = Some(Arc::clone(&entry.mutex).lock_owned().await);
		trace!(installation_id, "installation lock acquired");
		guard
	}

	pub async fn with_lock<F, Fut, T>(&self, installation_id: i64, body: F) -> T
	where
		F: FnOnce() -> Fut,
		Fut: Future<Output = T>,
	{
		let _guard = self.acquire(installation_id).await;
		body().await
	}

	pub fn len(&self) -> usize {
		lock_map(&self.entries).len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn contains(&self, installation_id: i64) -> bool {
		lock_map(&self.entries).contains_key(&installation_id)
	}
}

pub struct InstallationGuard {
	installation_id: i64,
	entry: Arc<LockEntry>,
	entries: Entries,
	held: Option<OwnedMutexGuard<()>>,
}

impl InstallationGuard {
	pub fn installation_id(&self) -> i64 {
		self.installation_id
	}
}

impl Drop for InstallationGuard {
	fn drop(&mut self) {
		let mut map = lock_map(&self.entries);
		self.held.take();
		if self.entry.users.fetch_sub(1, Ordering::SeqCst) == 1
			&& map
				.get(&self.installation_id)
				.is_some_and(|current| Arc::ptr_eq(current, &self.entry))
		{
			map.remove(&self.installation_id);
			trace!(installation_id = self.installation_id, "installation lock released and removed");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::time::Duration;

	#[tokio::test]
	async fn entry_is_removed_after_release() {
		let registry = InstallationLockRegistry::new();

		let value = registry.with_lock(7, || async { 42 }).await;

		assert_eq!(value, 42);
		assert!(registry.is_empty());
		assert!(!registry.contains(7));
	}

	#[tokio::test]
	async fn entry_survives_while_someone_waits() {
		let registry = InstallationLockRegistry::new();
		let first = registry.acquire(7).await;

		let waiter = {
			let registry = registry.clone();
			tokio::spawn(async move {
				let _guard = registry.acquire(7).await;
			})
		};
		tokio::time::sleep(Duration::from_millis(20)).await;

		drop(first);
		assert!(registry.contains(7) || waiter.is_finished());

		waiter.await.unwrap();
		assert!(registry.is_empty());
	}

	#[tokio::test]
	async fn cancelled_waiter_does_not_leak_its_entry() {
		let registry = InstallationLockRegistry::new();
		let held = registry.acquire(9).await;

		let attempt = tokio::time::timeout(Duration::from_millis(10), registry.acquire(9)).await;
		assert!(attempt.is_err());
		assert!(registry.contains(9));

		drop(held);
		assert!(registry.is_empty());
	}

	#[tokio::test]
	async fn distinct_installations_do_not_block_each_other() {
		let registry = InstallationLockRegistry::new();
		let _a = registry.acquire(1).await;

		let b = tokio::time::timeout(Duration::from_millis(50), registry.acquire(2)).await;
		assert!(b.is_ok());
		assert_eq!(registry.len(), 2);
	}

	#[tokio::test]
	async fn bodies_for_one_installation_never_overlap() {
		let registry = InstallationLockRegistry::new();
		let active = Arc::new(AtomicUsize::new(0));
		let peak = Arc::new(AtomicUsize::new(0));

		let mut tasks = Vec::new();
		for _ in 0..16 {
			let registry = registry.clone();
			let active = Arc::clone(&active);
			let peak = Arc::clone(&peak);
			tasks.push(tokio::spawn(async move {
				registry
					.with_lock(3, || async {
						let now = active.fetch_add(1, Ordering::SeqCst) + 1;
						peak.fetch_max(now, Ordering::SeqCst);
						tokio::time::sleep(Duration::from_millis(1)).await;
						active.fetch_sub(1, Ordering::SeqCst);
					})
					.await;
			}));
		}
		for task in tasks {
			task.await.unwrap();
		}

		assert_eq!(peak.load(Ordering::SeqCst), 1);
		assert!(registry.is_empty());
	}
}
