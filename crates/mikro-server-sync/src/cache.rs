// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone)]
struct CacheEntry<V> {
	value: V,
	last_used: u64,
}

/// Small least-recently-used map for hot lookups in front of the store.
#[derive(Debug)]
pub struct BoundedCache<K, V> {
	entries: HashMap<K, CacheEntry<V>>,
	max_entries: usize,
	clock: u64,
}

impl<K: Eq + Hash + Clone, V: Clone> BoundedCache<K, V> {
	pub fn new(max_entries: usize) -> Self {
		BoundedCache {
			entries: HashMap::new(),
			max_entries: max_entries.max(1),
			clock: 0,
		}
	}

	fn tick(&mut self) -> u64 {
		self.clock += 1;
		self.clock
	}

	pub fn insert(&mut self, key: K, value: V) {
		let now = self.tick();

		if !self.entries.contains_key(&key) && self.entries.len() >= self.max_entries {
			self.evict_lru();
		}

		self.entries.insert(
			key,
			CacheEntry {
				value,
				last_used: now,
			},
		);
	}

	pub fn get(&mut self, key: &K) -> Option<V> {
		let now = self.tick();
		let entry = self.entries.get_mut(key)?;
		entry.last_used = now;
		Some(entry.value.clone())
	}

	/// Apply `f` to a cached value in place. Returns whether the key was present.
	pub fn update(&mut self, key: &K, f: impl FnOnce(&mut V)) -> bool {
		match self.entries.get_mut(key) {
			Some(entry) => {
				f(&mut entry.value);
				true
			}
			None => false,
		}
	}

	pub fn contains(&self, key: &K) -> bool {
		self.entries.contains_key(key)
	}

	pub fn remove(&mut self, key: &K) -> Option<V> {
		self.entries.remove(key).map(|e| e.value)
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	fn evict_lru(&mut self) {
		if let Some(oldest) = self
			.entries
			.iter()
			.min_by_key(|(_, entry)| entry.last_used)
			.map(|(k, _)| k.clone())
		{
			self.entries.remove(&oldest);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn insert_and_get() {
		let mut cache = BoundedCache::new(4);
		cache.insert(1_i64, "general".to_string());

		assert_eq!(cache.get(&1), Some("general".to_string()));
		assert_eq!(cache.get(&2), None);
	}

	#[test]
	fn least_recently_used_is_evicted() {
		let mut cache = BoundedCache::new(3);
		cache.insert(1_i64, 'a');
		cache.insert(2, 'b');
		cache.insert(3, 'c');

		cache.get(&1);
		cache.get(&3);
		cache.insert(4, 'd');

		assert!(!cache.contains(&2));
		assert!(cache.contains(&1));
		assert!(cache.contains(&3));
		assert!(cache.contains(&4));
	}

	#[test]
	fn overwriting_a_key_does_not_evict() {
		let mut cache = BoundedCache::new(2);
		cache.insert(1_i64, 1);
		cache.insert(2, 2);
		cache.insert(2, 20);

		assert_eq!(cache.len(), 2);
		assert_eq!(cache.get(&1), Some(1));
		assert_eq!(cache.get(&2), Some(20));
	}

	#[test]
	fn update_in_place() {
		let mut cache = BoundedCache::new(2);
		cache.insert(7_i64, vec!["bug".to_string()]);

		assert!(cache.update(&7, |tags| tags.push("help".into())));
		assert!(!cache.update(&8, |tags| tags.clear()));
		assert_eq!(cache.get(&7).unwrap().len(), 2);
	}

	#[test]
	fn max_entries_enforced() {
		let mut cache = BoundedCache::new(100);
		for i in 0..200_i64 {
			cache.insert(i, i);
		}

		assert_eq!(cache.len(), 100);
		assert!(cache.contains(&199));
	}
}
