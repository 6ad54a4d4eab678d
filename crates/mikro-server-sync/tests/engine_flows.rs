// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! End-to-end sync flows against the in-memory store and fakes.

use std::sync::Arc;

use mikro_chat_core::testing::{message, thread, FakeChatPlatform, FakeWebhookTransport};
use mikro_chat_core::{ChatEvent, ChatThread, ExecuteTarget, MessageReplicator};
use mikro_server_db::testing::create_test_pool;
use mikro_server_db::{
	CorrelationRepository, CorrelationStore, IssueRecord, RepositoryRecord, ThreadRepository,
	ISSUE_BODY_COMMENT_ID,
};
use mikro_server_github_app::webhook::{IssueCommentEvent, IssuesEvent};
use mikro_server_github_app::{
	Installation, Issue, IssueComment, IssueState, IssueUpdate, Repository, WebhookEvent,
};
use mikro_server_sync::testing::{comment, issue, label, FakeIssueTracker, TrackerCall};
use mikro_server_sync::{SyncEngine, SyncError, SyncedField, ThreadRegistry};

const REPO_ID: i64 = 55;
const FULL_NAME: &str = "acme/widgets";
const INSTALLATION_ID: i64 = 3131;
const GUILD_ID: i64 = 100;
const FORUM_ID: i64 = 20;

struct Harness {
	engine: SyncEngine,
	correlations: Arc<CorrelationRepository>,
	platform: Arc<FakeChatPlatform>,
	transport: Arc<FakeWebhookTransport>,
	tracker: Arc<FakeIssueTracker>,
}

async fn harness() -> Harness {
	let pool = create_test_pool().await;
	let correlations = Arc::new(CorrelationRepository::new(pool.clone()));
	let threads = Arc::new(ThreadRepository::new(pool));
	let platform = Arc::new(FakeChatPlatform::new());
	let transport = Arc::new(FakeWebhookTransport::new());
	let tracker = Arc::new(FakeIssueTracker::new());

	let registry = Arc::new(ThreadRegistry::new(threads, platform.clone()));
	let replicator = Arc::new(MessageReplicator::new(transport.clone()));
	let engine = SyncEngine::new(
		correlations.clone(),
		registry,
		tracker.clone(),
		platform.clone(),
		replicator,
	);

	Harness {
		engine,
		correlations,
		platform,
		transport,
		tracker,
	}
}

async fn linked_harness() -> Harness {
	let h = harness().await;
	h.tracker.add_repository(REPO_ID, FULL_NAME, INSTALLATION_ID);
	h.correlations
		.insert_repository(&RepositoryRecord {
			repository_id: REPO_ID,
			name: "widgets".into(),
			full_name: FULL_NAME.into(),
			guild_id: GUILD_ID,
			forum_id: FORUM_ID,
			installation_id: Some(INSTALLATION_ID),
		})
		.await
		.unwrap();
	h
}

/// A forum thread already linked to issue `#number`.
async fn linked_issue(h: &Harness, thread_id: i64, issue_id: i64, number: i64, title: &str) -> ChatThread {
	let live = thread(thread_id, FORUM_ID, &format!("[widgets] {title}"));
	h.platform.add_thread(live.clone());
	h.tracker.add_issue(FULL_NAME, issue(issue_id, number, title));
	h.correlations
		.insert_issue(&IssueRecord {
			issue_id,
			repository_id: REPO_ID,
			thread_id,
			number,
			pull_request: false,
			closed: false,
			locked: false,
			labels: Vec::new(),
			author_id: 5,
			title: title.into(),
		})
		.await
		.unwrap();
	live
}

fn repository() -> Repository {
	Repository {
		id: REPO_ID,
		name: "widgets".into(),
		full_name: FULL_NAME.into(),
		private: false,
	}
}

fn comment_event(action: &str, issue: Issue, comment: IssueComment) -> WebhookEvent {
	WebhookEvent::IssueComment(IssueCommentEvent {
		action: action.into(),
		issue,
		comment,
		repository: repository(),
		installation: Some(Installation { id: INSTALLATION_ID }),
	})
}

fn issues_event(action: &str, issue: Issue) -> WebhookEvent {
	WebhookEvent::Issues(IssuesEvent {
		action: action.into(),
		issue,
		repository: repository(),
		installation: Some(Installation { id: INSTALLATION_ID }),
		label: None,
	})
}

#[tokio::test]
async fn chat_message_becomes_a_tracker_comment() {
	let h = linked_harness().await;
	linked_issue(&h, 500, 1001, 7, "Crash on start").await;

	let event = ChatEvent::MessageCreate {
		message: message(900, 500, "Same on Linux"),
	};
	h.engine.handle_chat_event(&event).await.unwrap();

	assert_eq!(
		h.tracker.calls(),
		vec![TrackerCall::CreateComment {
			number: 7,
			body: "`Comment from: alice`\nSame on Linux".into(),
		}]
	);
	let row = h.correlations.get_comment_by_message(900).await.unwrap().unwrap();
	assert!(!row.github_origin);
	assert_eq!(row.issue_id, 1001);
	assert_eq!(row.content, "Same on Linux");
}

#[tokio::test]
async fn bot_and_webhook_messages_are_not_forwarded() {
	let h = linked_harness().await;
	linked_issue(&h, 500, 1001, 7, "Crash on start").await;

	let mut from_webhook = message(901, 500, "mirror");
	from_webhook.webhook_id = Some(1);
	let mut from_bot = message(902, 500, "beep");
	from_bot.author.bot = true;

	for message in [from_webhook, from_bot] {
		h.engine
			.handle_chat_event(&ChatEvent::MessageCreate { message })
			.await
			.unwrap();
	}

	assert!(h.tracker.calls().is_empty());
}

#[tokio::test]
async fn tracker_echo_of_a_chat_comment_is_dropped() {
	let h = linked_harness().await;
	linked_issue(&h, 500, 1001, 7, "Crash on start").await;
	h.engine
		.handle_chat_event(&ChatEvent::MessageCreate {
			message: message(900, 500, "Same on Linux"),
		})
		.await
		.unwrap();
	let row = h.correlations.get_comment_by_message(900).await.unwrap().unwrap();

	let echo = comment_event(
		"created",
		issue(1001, 7, "Crash on start"),
		comment(row.comment_id, "mikro[bot]", "`Comment from: alice`\nSame on Linux"),
	);
	h.engine.handle_webhook(&echo).await.unwrap();

	assert!(h.transport.executed().is_empty());
}

#[tokio::test]
async fn tracker_comment_is_mirrored_and_never_pushed_back() {
	let h = linked_harness().await;
	linked_issue(&h, 500, 1001, 7, "Crash on start").await;

	let event = comment_event(
		"created",
		issue(1001, 7, "Crash on start"),
		comment(77, "hubot", "Fixed in main"),
	);
	h.engine.handle_webhook(&event).await.unwrap();

	let executed = h.transport.executed();
	assert_eq!(executed.len(), 1);
	assert_eq!(executed[0].target, ExecuteTarget::Thread(500));
	assert_eq!(executed[0].message.identity.name, "hubot");
	let row = h.correlations.get_comment(1001, 77).await.unwrap().unwrap();
	assert!(row.github_origin);
	assert_eq!(row.message_id, executed[0].result.id);

	let mut edited = executed[0].result.clone();
	edited.content = "tampered".into();
	h.engine
		.handle_chat_event(&ChatEvent::MessageEdit { message: edited })
		.await
		.unwrap();

	assert!(h.tracker.calls().is_empty());
}

#[tokio::test]
async fn tracker_edit_of_chat_authored_comment_is_ignored() {
	let h = linked_harness().await;
	linked_issue(&h, 500, 1001, 7, "Crash on start").await;
	h.engine
		.handle_chat_event(&ChatEvent::MessageCreate {
			message: message(900, 500, "Same on Linux"),
		})
		.await
		.unwrap();
	let row = h.correlations.get_comment_by_message(900).await.unwrap().unwrap();

	let event = comment_event(
		"edited",
		issue(1001, 7, "Crash on start"),
		comment(row.comment_id, "mikro[bot]", "edited upstream"),
	);
	h.engine.handle_webhook(&event).await.unwrap();

	assert!(h.transport.edits().is_empty());
}

#[tokio::test]
async fn chat_edit_updates_the_tracker_comment() {
	let h = linked_harness().await;
	linked_issue(&h, 500, 1001, 7, "Crash on start").await;
	let original = message(900, 500, "Same on Linux");
	h.engine
		.handle_chat_event(&ChatEvent::MessageCreate {
			message: original.clone(),
		})
		.await
		.unwrap();
	let row = h.correlations.get_comment_by_message(900).await.unwrap().unwrap();

	let mut edited = original;
	edited.content = "Same on Linux and macOS".into();
	h.engine
		.handle_chat_event(&ChatEvent::MessageEdit { message: edited })
		.await
		.unwrap();

	assert_eq!(
		h.tracker.calls().last(),
		Some(&TrackerCall::UpdateComment {
			comment_id: row.comment_id,
			body: "`Comment from: alice`\nSame on Linux and macOS".into(),
		})
	);
	let row = h.correlations.get_comment_by_message(900).await.unwrap().unwrap();
	assert_eq!(row.content, "Same on Linux and macOS");
}

#[tokio::test]
async fn deletes_remove_rows_and_clean_up_the_other_side() {
	let h = linked_harness().await;
	linked_issue(&h, 500, 1001, 7, "Crash on start").await;

	h.engine
		.handle_chat_event(&ChatEvent::MessageCreate {
			message: message(900, 500, "Same on Linux"),
		})
		.await
		.unwrap();
	let chat_row = h.correlations.get_comment_by_message(900).await.unwrap().unwrap();
	h.engine
		.handle_chat_event(&ChatEvent::MessageDelete {
			channel_id: 500,
			message_id: 900,
		})
		.await
		.unwrap();
	assert_eq!(
		h.tracker.calls().last(),
		Some(&TrackerCall::DeleteComment {
			comment_id: chat_row.comment_id
		})
	);
	assert!(h.correlations.get_comment_by_message(900).await.unwrap().is_none());

	h.engine
		.handle_webhook(&comment_event(
			"created",
			issue(1001, 7, "Crash on start"),
			comment(77, "hubot", "Fixed in main"),
		))
		.await
		.unwrap();
	let mirror = h.correlations.get_comment(1001, 77).await.unwrap().unwrap();
	h.engine
		.handle_webhook(&comment_event(
			"deleted",
			issue(1001, 7, "Crash on start"),
			comment(77, "hubot", "Fixed in main"),
		))
		.await
		.unwrap();

	assert_eq!(h.platform.deleted_messages(), vec![(500, mirror.message_id)]);
	assert!(h.correlations.get_comment(1001, 77).await.unwrap().is_none());
}

#[tokio::test]
async fn renamed_thread_pushes_exactly_one_title_update() {
	let h = linked_harness().await;
	let before = linked_issue(&h, 500, 1001, 7, "Old title").await;
	let mut after = before.clone();
	after.name = "[widgets]   New title".into();
	h.platform.add_thread(after.clone());

	h.engine
		.handle_chat_event(&ChatEvent::ThreadUpdate {
			before: Some(before),
			after,
		})
		.await
		.unwrap();

	assert_eq!(
		h.tracker.calls(),
		vec![TrackerCall::UpdateIssue {
			number: 7,
			update: IssueUpdate::title("New title"),
		}]
	);
	let stored = h.correlations.get_issue(1001).await.unwrap().unwrap();
	assert_eq!(stored.title, "New title");
}

#[tokio::test]
async fn thread_without_prefix_is_renamed_instead_of_pushed() {
	let h = linked_harness().await;
	let mut live = linked_issue(&h, 500, 1001, 7, "Old title").await;
	live.name = "Something else".into();
	h.platform.add_thread(live.clone());

	let report = h.engine.reconcile_thread(&live).await.unwrap();

	assert!(report.renamed);
	assert!(report.pushed.is_empty());
	assert!(h.tracker.calls().is_empty());
	assert_eq!(h.platform.thread(500).unwrap().name, "[widgets] Old title");
}

#[tokio::test]
async fn failed_push_does_not_block_later_fields() {
	let h = linked_harness().await;
	let mut live = linked_issue(&h, 500, 1001, 7, "Crash on start").await;
	live.locked = true;
	live.archived = true;
	h.tracker.fail_locking(true);

	let report = h.engine.reconcile_thread(&live).await.unwrap();

	assert_eq!(report.failed, vec![SyncedField::Locked]);
	assert_eq!(report.pushed, vec![SyncedField::Closed]);
	let stored = h.correlations.get_issue(1001).await.unwrap().unwrap();
	assert!(stored.closed);
	assert!(!stored.locked);
}

#[tokio::test]
async fn unlinked_thread_update_is_a_quiet_no_op() {
	let h = linked_harness().await;
	let live = thread(600, FORUM_ID, "General chat");
	h.platform.add_thread(live.clone());

	let err = h.engine.reconcile_thread(&live).await.unwrap_err();
	assert!(matches!(err, SyncError::NotLinked { thread_id: 600 }));

	h.engine
		.handle_chat_event(&ChatEvent::ThreadUpdate {
			before: None,
			after: live,
		})
		.await
		.unwrap();
	assert!(h.tracker.calls().is_empty());
}

#[tokio::test]
async fn tracker_close_and_label_mirror_without_echo() {
	let h = linked_harness().await;
	let before = linked_issue(&h, 500, 1001, 7, "Crash on start").await;
	h.platform.add_tag(FORUM_ID, 1, "bug");

	let mut closed = issue(1001, 7, "Crash on start");
	closed.state = IssueState::Closed;
	closed.labels = vec![label("bug"), label("no-such-tag")];
	h.engine
		.handle_webhook(&issues_event("closed", closed))
		.await
		.unwrap();

	let after = h.platform.thread(500).unwrap();
	assert!(after.archived);
	assert_eq!(after.applied_tags, vec![1]);
	let stored = h.correlations.get_issue(1001).await.unwrap().unwrap();
	assert!(stored.closed);
	assert_eq!(stored.labels, vec!["bug".to_string()]);

	h.engine
		.handle_chat_event(&ChatEvent::ThreadUpdate {
			before: Some(before),
			after,
		})
		.await
		.unwrap();
	assert!(h.tracker.calls().is_empty());
}

#[tokio::test]
async fn tracker_rename_keeps_the_thread_prefix() {
	let h = linked_harness().await;
	let mut live = linked_issue(&h, 500, 1001, 7, "Old title").await;
	live.name = "[Bug] Old title".into();
	h.platform.add_thread(live);

	h.engine
		.handle_webhook(&issues_event("edited", issue(1001, 7, "New title")))
		.await
		.unwrap();

	assert_eq!(h.platform.thread(500).unwrap().name, "[Bug] New title");
	let stored = h.correlations.get_issue(1001).await.unwrap().unwrap();
	assert_eq!(stored.title, "New title");
}

#[tokio::test]
async fn long_tracker_title_is_not_echoed_back_shortened() {
	let h = linked_harness().await;
	let before = linked_issue(&h, 500, 1001, 7, "Old title").await;
	let long_title = "A".repeat(120);

	h.engine
		.handle_webhook(&issues_event("edited", issue(1001, 7, &long_title)))
		.await
		.unwrap();
	let renamed = h.platform.thread(500).unwrap();
	assert_eq!(renamed.name.chars().count(), 100);

	h.engine
		.handle_chat_event(&ChatEvent::ThreadUpdate {
			before: Some(before),
			after: renamed.clone(),
		})
		.await
		.unwrap();

	let mut locked = renamed.clone();
	locked.locked = true;
	h.platform.add_thread(locked.clone());
	h.engine
		.handle_chat_event(&ChatEvent::ThreadUpdate {
			before: Some(renamed),
			after: locked,
		})
		.await
		.unwrap();

	assert_eq!(
		h.tracker.calls(),
		vec![TrackerCall::SetLocked {
			number: 7,
			locked: true
		}]
	);
	let stored = h.correlations.get_issue(1001).await.unwrap().unwrap();
	assert_eq!(stored.title, long_title);
}

#[tokio::test]
async fn pinning_an_issue_keeps_its_thread_open() {
	let h = linked_harness().await;
	linked_issue(&h, 500, 1001, 7, "Roadmap").await;

	h.engine
		.handle_webhook(&issues_event("pinned", issue(1001, 7, "Roadmap")))
		.await
		.unwrap();

	assert!(h.engine.registry().get(500).await.unwrap().disable_archive);
}

#[tokio::test]
async fn opened_issue_gets_one_forum_post() {
	let h = linked_harness().await;
	h.platform.add_tag(FORUM_ID, 1, "bug");
	let mut opened = issue(2001, 12, "Feature request");
	opened.labels = vec![label("bug")];

	h.engine
		.handle_webhook(&issues_event("opened", opened.clone()))
		.await
		.unwrap();
	h.engine
		.handle_webhook(&issues_event("opened", opened))
		.await
		.unwrap();

	let executed = h.transport.executed();
	assert_eq!(executed.len(), 1);
	assert_eq!(
		executed[0].target,
		ExecuteTarget::ForumPost {
			name: "[widgets] Feature request".into(),
			applied_tags: vec![1],
		}
	);
	assert_eq!(executed[0].message.identity.name, "octocat");
	assert_eq!(executed[0].message.content, "Body of Feature request");

	let thread_id = executed[0].result.channel_id;
	let record = h.correlations.get_issue(2001).await.unwrap().unwrap();
	assert_eq!(record.thread_id, thread_id);
	assert_eq!(record.labels, vec!["bug".to_string()]);
	let body = h
		.correlations
		.get_comment(2001, ISSUE_BODY_COMMENT_ID)
		.await
		.unwrap()
		.unwrap();
	assert!(body.github_origin);
	assert_eq!(body.message_id, executed[0].result.id);
}

#[tokio::test]
async fn full_resync_mirrors_each_comment_once() {
	let h = linked_harness().await;
	h.tracker.add_issue(FULL_NAME, issue(3001, 30, "Resync me"));
	h.tracker.add_comment(FULL_NAME, 30, comment(1, "ana", "one"));
	h.tracker.add_comment(FULL_NAME, 30, comment(2, "bo", "two"));

	let first = h.engine.sync_full_issue(FULL_NAME, 30).await.unwrap();
	let second = h.engine.sync_full_issue(FULL_NAME, 30).await.unwrap();

	assert_eq!(first.replicated, 2);
	assert_eq!(second.replicated, 0);
	assert_eq!(first.thread_id, second.thread_id);
	assert_eq!(h.transport.executed().len(), 3);
	let slowmode = h
		.platform
		.thread_edits()
		.into_iter()
		.filter(|(id, edit)| *id == first.thread_id && edit.rate_limit_per_user == Some(15))
		.count();
	assert_eq!(slowmode, 2);
}

#[tokio::test]
async fn linking_a_repository_creates_missing_tags() {
	let h = harness().await;
	h.tracker.add_repository(77, "acme/gadgets", 4242);
	h.tracker.add_label("acme/gadgets", "bug");
	h.tracker.add_label("acme/gadgets", "enhancement");
	h.platform.add_tag(21, 5, "bug");

	let record = h.engine.add_repo("acme/gadgets", GUILD_ID, 21).await.unwrap();

	assert_eq!(record.installation_id, Some(4242));
	assert_eq!(h.engine.installation_for(77).await.unwrap(), Some(4242));
	let tags = h.platform.tags(21);
	assert_eq!(tags.len(), 2);
	assert!(tags.iter().any(|t| t.name == "enhancement" && t.moderated));

	let again = h.engine.add_repo("acme/gadgets", GUILD_ID, 21).await.unwrap_err();
	assert!(matches!(again, SyncError::AlreadyLinked(_)));
}

#[tokio::test]
async fn linking_rejects_bad_names_and_unknown_repositories() {
	let h = harness().await;

	let bad = h.engine.add_repo("gadgets", GUILD_ID, 21).await.unwrap_err();
	assert!(matches!(bad, SyncError::InvalidRepositoryName(_)));

	let missing = h.engine.add_repo("acme/missing", GUILD_ID, 21).await.unwrap_err();
	assert!(matches!(missing, SyncError::RepositoryNotFound(_)));
}

#[tokio::test]
async fn repository_without_installation_is_skipped() {
	let h = harness().await;
	h.correlations
		.insert_repository(&RepositoryRecord {
			repository_id: REPO_ID,
			name: "widgets".into(),
			full_name: FULL_NAME.into(),
			guild_id: GUILD_ID,
			forum_id: FORUM_ID,
			installation_id: None,
		})
		.await
		.unwrap();
	linked_issue(&h, 500, 1001, 7, "Crash on start").await;

	h.engine
		.handle_chat_event(&ChatEvent::MessageCreate {
			message: message(900, 500, "hello?"),
		})
		.await
		.unwrap();
	assert!(h.tracker.calls().is_empty());

	h.engine.record_installation(REPO_ID, INSTALLATION_ID).await.unwrap();
	h.engine
		.handle_chat_event(&ChatEvent::MessageCreate {
			message: message(901, 500, "hello again"),
		})
		.await
		.unwrap();
	assert_eq!(h.tracker.calls().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_opened_deliveries_create_one_post() {
	let h = linked_harness().await;
	let opened = issue(2001, 12, "Feature request");
	let first = issues_event("opened", opened.clone());
	let second = issues_event("opened", opened);

	let (a, b) = tokio::join!(h.engine.handle_webhook(&first), h.engine.handle_webhook(&second));
	a.unwrap();
	b.unwrap();

	let executed = h.transport.executed();
	assert_eq!(executed.len(), 1);
	let record = h.correlations.get_issue(2001).await.unwrap().unwrap();
	assert_eq!(record.thread_id, executed[0].result.channel_id);
	let body = h
		.correlations
		.get_comment(2001, ISSUE_BODY_COMMENT_ID)
		.await
		.unwrap()
		.unwrap();
	assert_eq!(body.message_id, executed[0].result.id);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn thread_create_event_racing_issue_post_keeps_one_row() {
	let h = linked_harness().await;
	// Pre-seeded webhook takes the next transport id so the post lands on 10_002.
	h.transport.add_webhook(FORUM_ID, mikro_chat_core::DEFAULT_WEBHOOK_NAME);
	let post_id = 10_002;
	let live = thread(post_id, FORUM_ID, "[widgets] Feature request");
	h.platform.add_thread(live.clone());

	let repo = mikro_server_sync::LinkedRepo {
		record: h.correlations.get_repository(REPO_ID).await.unwrap().unwrap(),
		installation_id: INSTALLATION_ID,
	};
	let opened = issue(2001, 12, "Feature request");

	let (created, listened) = tokio::join!(
		h.engine.create_or_get_issue_thread(&repo, &opened),
		h.engine.registry().on_thread_create(&live),
	);
	let created = created.unwrap();
	listened.unwrap();

	let executed = h.transport.executed();
	assert_eq!(executed.len(), 1);
	assert_eq!(executed[0].result.channel_id, post_id);
	assert_eq!(created.thread_id, post_id);
	assert_eq!(h.engine.registry().get(post_id).await.unwrap().thread_id, post_id);
	let record = h.correlations.get_issue(2001).await.unwrap().unwrap();
	assert_eq!(record.thread_id, post_id);

	// A second look reuses the stored thread.
	h.engine.create_or_get_issue_thread(&repo, &opened).await.unwrap();
	assert_eq!(h.transport.executed().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn chat_comment_racing_its_webhook_echo_is_not_mirrored() {
	let h = linked_harness().await;
	linked_issue(&h, 500, 1001, 7, "Crash on start").await;
	let tracked = issue(1001, 7, "Crash on start");

	let chat = ChatEvent::MessageCreate {
		message: message(900, 500, "Same on Linux"),
	};
	// The echo is delivered as soon as the tracker has the comment, while the
	// chat side may still be writing its row.
	let echo = async {
		loop {
			let created = h
				.tracker
				.calls()
				.into_iter()
				.any(|c| matches!(c, TrackerCall::CreateComment { .. }));
			if created {
				break;
			}
			tokio::task::yield_now().await;
		}
		let event = comment_event(
			"created",
			tracked.clone(),
			comment(9_001, "mikro[bot]", "`Comment from: alice`\nSame on Linux"),
		);
		h.engine.handle_webhook(&event).await
	};

	let (sent, echoed) = tokio::join!(h.engine.handle_chat_event(&chat), echo);
	sent.unwrap();
	echoed.unwrap();

	assert!(h.transport.executed().is_empty());
	let row = h.correlations.get_comment(1001, 9_001).await.unwrap().unwrap();
	assert!(!row.github_origin);
	assert_eq!(row.message_id, 900);
	assert_eq!(h.tracker.calls().len(), 1);
}
