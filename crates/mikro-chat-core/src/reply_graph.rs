// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Reply-cluster reconstruction from a flat, oldest-first message window.
//!
//! Messages are linked explicitly (a reply pointer whose target is in the
//! window) or, in loose mode, by adjacency to the most recent anchor. A
//! bounded counter limits how many unpointed messages in a row are assumed to
//! belong to the same conversation; every explicit reply resets it.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};

use crate::types::ChatMessage;

pub trait ReplyNode {
	fn id(&self) -> i64;
	fn reply_to(&self) -> Option<i64>;
	fn created_at(&self) -> DateTime<Utc>;
}

impl ReplyNode for ChatMessage {
	fn id(&self) -> i64 {
		self.id
	}

	fn reply_to(&self) -> Option<i64> {
		self.reply_to
	}

	fn created_at(&self) -> DateTime<Utc> {
		self.created_at
	}
}

impl<T: ReplyNode + ?Sized> ReplyNode for &T {
	fn id(&self) -> i64 {
		(**self).id()
	}

	fn reply_to(&self) -> Option<i64> {
		(**self).reply_to()
	}

	fn created_at(&self) -> DateTime<Utc> {
		(**self).created_at()
	}
}

/// Replies per anchor, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplyGraph {
	replies: BTreeMap<i64, Vec<i64>>,
	parents: BTreeMap<i64, i64>,
	explicit: BTreeSet<i64>,
}

impl ReplyGraph {
	/// `depth` bounds consecutive loosely linked messages; `None` is unbounded.
	pub fn build<N: ReplyNode>(messages: &[N], loose: bool, depth: Option<usize>) -> Self {
		let ids: BTreeSet<i64> = messages.iter().map(ReplyNode::id).collect();
		let mut graph = Self::default();
		let mut last_found: Option<i64> = None;
		let mut remaining = depth;

		for message in messages {
			let id = message.id();
			match message.reply_to() {
				Some(target) => {
					if target == id || !ids.contains(&target) {
						continue;
					}
					graph.link(target, id);
					graph.explicit.insert(id);
					last_found = Some(target);
					remaining = depth;
				}
				None => {
					if loose && last_found.is_none() {
						last_found = Some(id);
						continue;
					}
					if remaining == Some(0) {
						continue;
					}
					if let Some(d) = remaining.as_mut() {
						*d -= 1;
					}
					if let (true, Some(anchor)) = (loose, last_found) {
						graph.link(anchor, id);
						last_found = Some(id);
					}
				}
			}
		}

		graph
	}

	fn link(&mut self, anchor: i64, reply: i64) {
		self.replies.entry(anchor).or_default().push(reply);
		self.parents.insert(reply, anchor);
	}

	pub fn replies_to(&self, id: i64) -> &[i64] {
		self.replies.get(&id).map(Vec::as_slice).unwrap_or(&[])
	}

	pub fn is_anchor(&self, id: i64) -> bool {
		self.replies.contains_key(&id)
	}

	pub fn is_explicit(&self, id: i64) -> bool {
		self.explicit.contains(&id)
	}

	pub fn anchors(&self) -> impl Iterator<Item = (&i64, &Vec<i64>)> {
		self.replies.iter()
	}

	/// Walk antecedents from `id` to the top of its cluster.
	pub fn find_root(&self, id: i64) -> i64 {
		let mut current = id;
		let mut seen = BTreeSet::from([id]);
		while let Some(&parent) = self.parents.get(&current) {
			if !seen.insert(parent) {
				break;
			}
			current = parent;
		}
		current
	}

	/// Descendants of `root` in discovery order. Each explicitly linked node
	/// restarts its children at the full `depth`.
	pub fn collect_subtree(&self, root: i64, depth: Option<usize>) -> Vec<i64> {
		let mut collected = Vec::new();
		let mut seen = BTreeSet::from([root]);
		self.extend(root, depth, depth, &mut collected, &mut seen);
		collected
	}

	fn extend(
		&self,
		node: i64,
		remaining: Option<usize>,
		depth: Option<usize>,
		collected: &mut Vec<i64>,
		seen: &mut BTreeSet<i64>,
	) {
		if remaining == Some(0) {
			return;
		}
		for &child in self.replies_to(node) {
			if !seen.insert(child) {
				continue;
			}
			collected.push(child);
			let base = if self.is_explicit(child) { depth } else { remaining };
			let next = base.map(|d| d.saturating_sub(1));
			self.extend(child, next, depth, collected, seen);
		}
	}
}

/// Parameters for [`reply_chain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyChainOptions {
	/// How many messages before the seed the caller fetches.
	pub lookback: usize,
	pub loose: bool,
	/// Bound used when collecting the cluster.
	pub depth: Option<usize>,
	/// Bound used when building the graph.
	pub build_depth: Option<usize>,
}

impl ReplyChainOptions {
	/// Explicit replies only, followed as deep as the lookback.
	pub fn replies(lookback: usize) -> Self {
		Self {
			lookback,
			loose: false,
			depth: Some(lookback),
			build_depth: None,
		}
	}

	/// Explicit replies plus nearby unpointed messages.
	pub fn conversation(lookback: usize) -> Self {
		Self {
			lookback: lookback.clamp(10, 80),
			loose: true,
			depth: Some(5),
			build_depth: Some(4),
		}
	}
}

/// The cluster the seed belongs to, oldest first.
///
/// `window` is the oldest-first history that precedes the seed; the seed is
/// appended when it is not already the last element. A seed that does not
/// reply to anything inside the window comes back alone.
pub fn reply_chain<'a, N: ReplyNode>(
	window: &'a [N],
	seed: &'a N,
	options: &ReplyChainOptions,
) -> Vec<&'a N> {
	let Some(target) = seed.reply_to() else {
		return vec![seed];
	};

	let mut messages: Vec<&N> = window.iter().filter(|m| m.id() != seed.id()).collect();
	messages.push(seed);

	let graph = ReplyGraph::build(&messages, options.loose, options.build_depth);
	if !graph.is_anchor(target) {
		return vec![seed];
	}

	let root = graph.find_root(seed.id());
	let mut ids = vec![root];
	ids.extend(graph.collect_subtree(root, options.depth));

	let by_id: BTreeMap<i64, &N> = messages.iter().map(|m| (m.id(), *m)).collect();
	let mut chain: Vec<&N> = ids.iter().filter_map(|id| by_id.get(id).copied()).collect();
	chain.sort_by_key(|m| (m.created_at(), m.id()));
	chain
}

/// Thread name derived from message text: brackets removed, first five
/// whitespace-separated pieces, at most 30 characters.
pub fn thread_name(text: &str) -> String {
	let stripped: String = text.chars().filter(|c| *c != '[' && *c != ']').collect();
	let words: Vec<&str> = stripped.split(char::is_whitespace).take(5).collect();
	words.join(" ").chars().take(30).collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use chrono::TimeZone;
	use proptest::prelude::*;

	#[derive(Debug, Clone, PartialEq)]
	struct Node {
		id: i64,
		reply_to: Option<i64>,
	}

	impl ReplyNode for Node {
		fn id(&self) -> i64 {
			self.id
		}

		fn reply_to(&self) -> Option<i64> {
			self.reply_to
		}

		fn created_at(&self) -> DateTime<Utc> {
			Utc.timestamp_opt(1_700_000_000 + self.id, 0).unwrap()
		}
	}

	fn node(id: i64, reply_to: Option<i64>) -> Node {
		Node { id, reply_to }
	}

	fn ids(nodes: &[&Node]) -> Vec<i64> {
		nodes.iter().map(|n| n.id).collect()
	}

	#[test]
	fn loose_mode_links_adjacent_messages_to_first_anchor() {
		let messages = [node(1, None), node(2, None), node(3, None)];

		let graph = ReplyGraph::build(&messages, true, Some(2));
		assert_eq!(graph.replies_to(1), &[2]);
		assert_eq!(graph.replies_to(2), &[3]);
		assert_eq!(graph.find_root(3), 1);
		assert_eq!(graph.collect_subtree(1, None), vec![2, 3]);

		let graph = ReplyGraph::build(&messages, true, Some(0));
		assert!(graph.replies_to(1).is_empty());
		assert!(graph.replies_to(2).is_empty());
		assert_eq!(graph.find_root(3), 3);
	}

	#[test]
	fn strict_mode_ignores_unpointed_messages() {
		let messages = [node(1, None), node(2, None), node(3, Some(1))];
		let graph = ReplyGraph::build(&messages, false, None);
		assert_eq!(graph.replies_to(1), &[3]);
		assert!(graph.replies_to(2).is_empty());
		assert!(graph.is_explicit(3));
	}

	#[test]
	fn target_outside_window_leaves_message_unlinked_without_consuming_depth() {
		let messages = [node(1, None), node(2, Some(99)), node(3, None)];
		let graph = ReplyGraph::build(&messages, true, Some(1));
		assert!(!graph.is_explicit(2));
		assert_eq!(graph.replies_to(1), &[3]);
	}

	#[test]
	fn explicit_links_reset_collection_depth() {
		let explicit_chain = [
			node(1, None),
			node(2, Some(1)),
			node(3, Some(2)),
			node(4, Some(3)),
			node(5, Some(4)),
		];
		let graph = ReplyGraph::build(&explicit_chain, false, None);
		assert_eq!(graph.collect_subtree(1, Some(2)), vec![2, 3, 4, 5]);

		let loose_chain = [
			node(1, None),
			node(2, None),
			node(3, None),
			node(4, None),
			node(5, None),
		];
		let graph = ReplyGraph::build(&loose_chain, true, None);
		assert_eq!(graph.collect_subtree(1, Some(2)), vec![2, 3]);
	}

	#[test]
	fn depth_reset_is_scoped_per_node() {
		// 1 has an explicit child 2 and a loose child 3.
		let messages = [
			node(1, None),
			node(2, Some(1)),
			node(3, None),
			node(5, Some(3)),
		];
		let mut graph = ReplyGraph::build(&messages, true, None);
		assert_eq!(graph.replies_to(1), &[2, 3]);
		assert_eq!(graph.replies_to(3), &[5]);

		graph.link(5, 6);
		// 3 is loose, so its subtree stops at depth 1.
		assert_eq!(graph.collect_subtree(1, Some(1)), vec![2, 3]);
		// 5 is explicit, so its loose child is reached with depth 2.
		assert_eq!(graph.collect_subtree(1, Some(2)), vec![2, 3, 5, 6]);
	}

	#[test]
	fn reply_chain_returns_seed_alone_without_reply() {
		let window = [node(1, None), node(2, None)];
		let seed = node(3, None);
		let chain = reply_chain(&window, &seed, &ReplyChainOptions::replies(80));
		assert_eq!(ids(&chain), vec![3]);
	}

	#[test]
	fn reply_chain_returns_seed_alone_when_target_outside_window() {
		let window = [node(1, None), node(2, None)];
		let seed = node(3, Some(42));
		let chain = reply_chain(&window, &seed, &ReplyChainOptions::replies(80));
		assert_eq!(ids(&chain), vec![3]);
	}

	#[test]
	fn reply_chain_follows_explicit_replies_to_root() {
		let window = [
			node(1, None),
			node(2, None),
			node(3, Some(2)),
			node(4, None),
			node(5, Some(3)),
		];
		let seed = node(6, Some(5));
		let chain = reply_chain(&window, &seed, &ReplyChainOptions::replies(80));
		assert_eq!(ids(&chain), vec![2, 3, 5, 6]);
	}

	#[test]
	fn conversation_chain_includes_nearby_messages() {
		let window = [node(1, None), node(2, None), node(3, Some(1)), node(4, None)];
		let seed = node(5, Some(4));
		let chain = reply_chain(&window, &seed, &ReplyChainOptions::conversation(80));
		assert_eq!(ids(&chain), vec![1, 2, 3, 4, 5]);
	}

	#[test]
	fn conversation_lookback_is_clamped() {
		assert_eq!(ReplyChainOptions::conversation(500).lookback, 80);
		assert_eq!(ReplyChainOptions::conversation(1).lookback, 10);
		assert_eq!(ReplyChainOptions::conversation(40).lookback, 40);
	}

	#[test]
	fn find_root_terminates_on_cycles() {
		let messages = [node(1, Some(2)), node(2, Some(1))];
		let graph = ReplyGraph::build(&messages, false, None);
		let root = graph.find_root(1);
		assert!(root == 1 || root == 2);
	}

	#[test]
	fn thread_name_examples() {
		assert_eq!(thread_name("[Bug] the game crashes on load"), "Bug the game crashes on");
		assert_eq!(thread_name("hello"), "hello");
		assert_eq!(
			thread_name("supercalifragilisticexpialidocious words"),
			"supercalifragilisticexpialidoc"
		);
		assert_eq!(thread_name(""), "");
	}

	fn window_strategy() -> impl Strategy<Value = Vec<Node>> {
		prop::collection::vec(prop::option::of(0i64..40), 1..30).prop_map(|pointers| {
			pointers
				.into_iter()
				.enumerate()
				.map(|(i, reply_to)| node(i as i64, reply_to))
				.collect()
		})
	}

	proptest! {
		#[test]
		fn build_is_deterministic(
			messages in window_strategy(),
			loose in any::<bool>(),
			depth in prop::option::of(0usize..6),
		) {
			let first = ReplyGraph::build(&messages, loose, depth);
			let second = ReplyGraph::build(&messages, loose, depth);
			prop_assert_eq!(first, second);
		}

		#[test]
		fn chain_is_sorted_unique_and_from_window(
			messages in window_strategy(),
			loose in any::<bool>(),
		) {
			let (seed, window) = messages.split_last().unwrap();
			let options = ReplyChainOptions {
				lookback: 80,
				loose,
				depth: Some(5),
				build_depth: Some(4),
			};
			let chain = ids(&reply_chain(window, seed, &options));

			let mut sorted = chain.clone();
			sorted.sort();
			sorted.dedup();
			prop_assert_eq!(&sorted, &chain);
			prop_assert!(chain.iter().all(|id| messages.iter().any(|m| m.id == *id)));
		}

		#[test]
		fn thread_name_is_bounded_and_bracket_free(text in ".{0,80}") {
			let name = thread_name(&text);
			prop_assert!(name.chars().count() <= 30);
			prop_assert!(!name.contains('[') && !name.contains(']'));
		}
	}
}
