// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Issue, comment and repository correlation rows.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::{CommentRecord, IssueRecord, RepositoryRecord, TrackerUser};

#[async_trait]
pub trait CorrelationStore: Send + Sync {
	async fn get_issue(&self, issue_id: i64) -> Result<Option<IssueRecord>, DbError>;

	async fn get_issue_by_thread(&self, thread_id: i64) -> Result<Option<IssueRecord>, DbError>;

	async fn get_issue_by_number(
		&self,
		repository_id: i64,
		number: i64,
	) -> Result<Option<IssueRecord>, DbError>;

	/// Insert-or-ignore. Returns whether the row was new.
	async fn insert_issue(&self, issue: &IssueRecord) -> Result<bool, DbError>;

	async fn update_issue_locked(&self, issue_id: i64, locked: bool) -> Result<bool, DbError>;

	async fn update_issue_closed(&self, issue_id: i64, closed: bool) -> Result<bool, DbError>;

	async fn update_issue_title(&self, issue_id: i64, title: &str) -> Result<bool, DbError>;

	async fn update_issue_labels(&self, issue_id: i64, labels: &[String]) -> Result<bool, DbError>;

	async fn get_comment(
		&self,
		issue_id: i64,
		comment_id: i64,
	) -> Result<Option<CommentRecord>, DbError>;

	async fn get_comment_by_message(&self, message_id: i64)
		-> Result<Option<CommentRecord>, DbError>;

	/// Insert-or-ignore on either unique key. Returns whether the row was new.
	async fn insert_comment(&self, comment: &CommentRecord) -> Result<bool, DbError>;

	async fn update_comment_content(
		&self,
		issue_id: i64,
		comment_id: i64,
		content: &str,
	) -> Result<bool, DbError>;

	async fn delete_comment(&self, issue_id: i64, comment_id: i64) -> Result<bool, DbError>;

	/// Fails with [`DbError::Conflict`] when the id or full name is taken.
	async fn insert_repository(&self, repository: &RepositoryRecord) -> Result<(), DbError>;

	async fn get_repository(&self, repository_id: i64)
		-> Result<Option<RepositoryRecord>, DbError>;

	async fn get_repository_by_name(
		&self,
		full_name: &str,
	) -> Result<Option<RepositoryRecord>, DbError>;

	async fn set_repository_installation(
		&self,
		repository_id: i64,
		installation_id: i64,
	) -> Result<bool, DbError>;

	async fn get_repository_installation(&self, repository_id: i64) -> Result<Option<i64>, DbError>;

	async fn upsert_tracker_user(&self, user: &TrackerUser) -> Result<(), DbError>;
}

#[derive(Clone)]
pub struct CorrelationRepository {
	pool: SqlitePool,
}

const ISSUE_COLUMNS: &str = "issue_id, repository_id, thread_id, number, pull_request, closed, \
	locked, labels, author_id, title";

const COMMENT_COLUMNS: &str =
	"issue_id, comment_id, github_origin, guild_id, channel_id, message_id, content";

const REPOSITORY_COLUMNS: &str =
	"repository_id, name, full_name, guild_id, forum_id, installation_id";

impl CorrelationRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	async fn fetch_issue(&self, clause: &str, a: i64, b: Option<i64>) -> Result<Option<IssueRecord>, DbError> {
		let sql = format!("SELECT {ISSUE_COLUMNS} FROM issues WHERE {clause}");
		let mut query = sqlx::query(&sql).bind(a);
		if let Some(b) = b {
			query = query.bind(b);
		}
		let row = query.fetch_optional(&self.pool).await?;
		Ok(row.as_ref().map(row_to_issue))
	}

	pub async fn get_issue(&self, issue_id: i64) -> Result<Option<IssueRecord>, DbError> {
		self.fetch_issue("issue_id = ?", issue_id, None).await
	}

	pub async fn get_issue_by_thread(&self, thread_id: i64) -> Result<Option<IssueRecord>, DbError> {
		self.fetch_issue("thread_id = ?", thread_id, None).await
	}

	pub async fn get_issue_by_number(
		&self,
		repository_id: i64,
		number: i64,
	) -> Result<Option<IssueRecord>, DbError> {
		self.fetch_issue("repository_id = ? AND number = ?", repository_id, Some(number))
			.await
	}

	#[tracing::instrument(skip(self, issue), fields(issue_id = issue.issue_id, thread_id = issue.thread_id))]
	pub async fn insert_issue(&self, issue: &IssueRecord) -> Result<bool, DbError> {
		let labels = serde_json::to_string(&issue.labels)?;
		let result = sqlx::query(
			r#"
            INSERT OR IGNORE INTO issues (
                issue_id, repository_id, thread_id, number, pull_request, closed,
                locked, labels, author_id, title, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
		)
		.bind(issue.issue_id)
		.bind(issue.repository_id)
		.bind(issue.thread_id)
		.bind(issue.number)
		.bind(issue.pull_request)
		.bind(issue.closed)
		.bind(issue.locked)
		.bind(&labels)
		.bind(issue.author_id)
		.bind(&issue.title)
		.bind(chrono::Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		let inserted = result.rows_affected() > 0;
		if inserted {
			tracing::info!(number = issue.number, "issue: linked to thread");
		}
		Ok(inserted)
	}

	pub async fn update_issue_locked(&self, issue_id: i64, locked: bool) -> Result<bool, DbError> {
		self.set_issue_column(issue_id, "locked", locked).await
	}

	pub async fn update_issue_closed(&self, issue_id: i64, closed: bool) -> Result<bool, DbError> {
		self.set_issue_column(issue_id, "closed", closed).await
	}

	pub async fn update_issue_title(&self, issue_id: i64, title: &str) -> Result<bool, DbError> {
		self.set_issue_column(issue_id, "title", title.to_string()).await
	}

	pub async fn update_issue_labels(&self, issue_id: i64, labels: &[String]) -> Result<bool, DbError> {
		let labels = serde_json::to_string(labels)?;
		self.set_issue_column(issue_id, "labels", labels).await
	}

	async fn set_issue_column<T>(&self, issue_id: i64, column: &'static str, value: T) -> Result<bool, DbError>
	where
		T: for<'q> sqlx::Encode<'q, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite> + Send + 'static,
	{
		let sql = format!("UPDATE issues SET {column} = ? WHERE issue_id = ?");
		let result = sqlx::query(&sql)
			.bind(value)
			.bind(issue_id)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	pub async fn get_comment(
		&self,
		issue_id: i64,
		comment_id: i64,
	) -> Result<Option<CommentRecord>, DbError> {
		let sql = format!("SELECT {COMMENT_COLUMNS} FROM issue_comments WHERE issue_id = ? AND comment_id = ?");
		let row = sqlx::query(&sql)
			.bind(issue_id)
			.bind(comment_id)
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.as_ref().map(row_to_comment))
	}

	pub async fn get_comment_by_message(&self, message_id: i64) -> Result<Option<CommentRecord>, DbError> {
		let sql = format!("SELECT {COMMENT_COLUMNS} FROM issue_comments WHERE message_id = ?");
		let row = sqlx::query(&sql)
			.bind(message_id)
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.as_ref().map(row_to_comment))
	}

	#[tracing::instrument(skip(self, comment), fields(issue_id = comment.issue_id, comment_id = comment.comment_id, message_id = comment.message_id))]
	pub async fn insert_comment(&self, comment: &CommentRecord) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
            INSERT OR IGNORE INTO issue_comments (
                issue_id, comment_id, github_origin, guild_id, channel_id,
                message_id, content, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
		)
		.bind(comment.issue_id)
		.bind(comment.comment_id)
		.bind(comment.github_origin)
		.bind(comment.guild_id)
		.bind(comment.channel_id)
		.bind(comment.message_id)
		.bind(&comment.content)
		.bind(chrono::Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		let inserted = result.rows_affected() > 0;
		tracing::debug!(inserted, github_origin = comment.github_origin, "issue_comment: recorded");
		Ok(inserted)
	}

	pub async fn update_comment_content(
		&self,
		issue_id: i64,
		comment_id: i64,
		content: &str,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			"UPDATE issue_comments SET content = ? WHERE issue_id = ? AND comment_id = ?",
		)
		.bind(content)
		.bind(issue_id)
		.bind(comment_id)
		.execute(&self.pool)
		.await?;
		Ok(result.rows_affected() > 0)
	}

	pub async fn delete_comment(&self, issue_id: i64, comment_id: i64) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM issue_comments WHERE issue_id = ? AND comment_id = ?")
			.bind(issue_id)
			.bind(comment_id)
			.execute(&self.pool)
			.await?;
		Ok(result.rows_affected() > 0)
	}

	#[tracing::instrument(skip(self, repository), fields(repository_id = repository.repository_id, full_name = %repository.full_name))]
	pub async fn insert_repository(&self, repository: &RepositoryRecord) -> Result<(), DbError> {
		let result = sqlx::query(
			r#"
            INSERT OR IGNORE INTO repositories (
                repository_id, name, full_name, guild_id, forum_id, installation_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
		)
		.bind(repository.repository_id)
		.bind(&repository.name)
		.bind(&repository.full_name)
		.bind(repository.guild_id)
		.bind(repository.forum_id)
		.bind(repository.installation_id)
		.bind(chrono::Utc::now().to_rfc3339())
		.execute(&self.pool)
		.await?;

		if result.rows_affected() == 0 {
			return Err(DbError::Conflict(format!(
				"repository {} is already linked",
				repository.full_name
			)));
		}

		tracing::info!(forum_id = repository.forum_id, "repository: linked");
		Ok(())
	}

	pub async fn get_repository(&self, repository_id: i64) -> Result<Option<RepositoryRecord>, DbError> {
		let sql = format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE repository_id = ?");
		let row = sqlx::query(&sql)
			.bind(repository_id)
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.as_ref().map(row_to_repository))
	}

	pub async fn get_repository_by_name(&self, full_name: &str) -> Result<Option<RepositoryRecord>, DbError> {
		let sql = format!("SELECT {REPOSITORY_COLUMNS} FROM repositories WHERE full_name = ?");
		let row = sqlx::query(&sql)
			.bind(full_name)
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.as_ref().map(row_to_repository))
	}

	pub async fn set_repository_installation(
		&self,
		repository_id: i64,
		installation_id: i64,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
            UPDATE repositories SET installation_id = ?1
            WHERE repository_id = ?2 AND (installation_id IS NULL OR installation_id != ?1)
            "#,
		)
		.bind(installation_id)
		.bind(repository_id)
		.execute(&self.pool)
		.await?;

		let updated = result.rows_affected() > 0;
		if updated {
			tracing::info!(repository_id, installation_id, "repository: installation recorded");
		}
		Ok(updated)
	}

	pub async fn get_repository_installation(&self, repository_id: i64) -> Result<Option<i64>, DbError> {
		let row: Option<(Option<i64>,)> =
			sqlx::query_as("SELECT installation_id FROM repositories WHERE repository_id = ?")
				.bind(repository_id)
				.fetch_optional(&self.pool)
				.await?;
		Ok(row.and_then(|(id,)| id))
	}

	pub async fn upsert_tracker_user(&self, user: &TrackerUser) -> Result<(), DbError> {
		sqlx::query("INSERT OR IGNORE INTO github_users (id, login, avatar_url) VALUES (?, ?, ?)")
			.bind(user.id)
			.bind(&user.login)
			.bind(&user.avatar_url)
			.execute(&self.pool)
			.await?;
		Ok(())
	}
}

fn row_to_issue(row: &sqlx::sqlite::SqliteRow) -> IssueRecord {
	let labels_json: String = row.get("labels");
	IssueRecord {
		issue_id: row.get("issue_id"),
		repository_id: row.get("repository_id"),
		thread_id: row.get("thread_id"),
		number: row.get("number"),
		pull_request: row.get("pull_request"),
		closed: row.get("closed"),
		locked: row.get("locked"),
		labels: serde_json::from_str(&labels_json).unwrap_or_default(),
		author_id: row.get("author_id"),
		title: row.get("title"),
	}
}

fn row_to_comment(row: &sqlx::sqlite::SqliteRow) -> CommentRecord {
	CommentRecord {
		issue_id: row.get("issue_id"),
		comment_id: row.get("comment_id"),
		github_origin: row.get("github_origin"),
		guild_id: row.get("guild_id"),
		channel_id: row.get("channel_id"),
		message_id: row.get("message_id"),
		content: row.get("content"),
	}
}

fn row_to_repository(row: &sqlx::sqlite::SqliteRow) -> RepositoryRecord {
	RepositoryRecord {
		repository_id: row.get("repository_id"),
		name: row.get("name"),
		full_name: row.get("full_name"),
		guild_id: row.get("guild_id"),
		forum_id: row.get("forum_id"),
		installation_id: row.get("installation_id"),
	}
}

#[async_trait]
impl CorrelationStore for CorrelationRepository {
	async fn get_issue(&self, issue_id: i64) -> Result<Option<IssueRecord>, DbError> {
		CorrelationRepository::get_issue(self, issue_id).await
	}

	async fn get_issue_by_thread(&self, thread_id: i64) -> Result<Option<IssueRecord>, DbError> {
		CorrelationRepository::get_issue_by_thread(self, thread_id).await
	}

	async fn get_issue_by_number(
		&self,
		repository_id: i64,
		number: i64,
	) -> Result<Option<IssueRecord>, DbError> {
		CorrelationRepository::get_issue_by_number(self, repository_id, number).await
	}

	async fn insert_issue(&self, issue: &IssueRecord) -> Result<bool, DbError> {
		CorrelationRepository::insert_issue(self, issue).await
	}

	async fn update_issue_locked(&self, issue_id: i64, locked: bool) -> Result<bool, DbError> {
		CorrelationRepository::update_issue_locked(self, issue_id, locked).await
	}

	async fn update_issue_closed(&self, issue_id: i64, closed: bool) -> Result<bool, DbError> {
		CorrelationRepository::update_issue_closed(self, issue_id, closed).await
	}

	async fn update_issue_title(&self, issue_id: i64, title: &str) -> Result<bool, DbError> {
		CorrelationRepository::update_issue_title(self, issue_id, title).await
	}

	async fn update_issue_labels(&self, issue_id: i64, labels: &[String]) -> Result<bool, DbError> {
		CorrelationRepository::update_issue_labels(self, issue_id, labels).await
	}

	async fn get_comment(
		&self,
		issue_id: i64,
		comment_id: i64,
	) -> Result<Option<CommentRecord>, DbError> {
		CorrelationRepository::get_comment(self, issue_id, comment_id).await
	}

	async fn get_comment_by_message(&self, message_id: i64) -> Result<Option<CommentRecord>, DbError> {
		CorrelationRepository::get_comment_by_message(self, message_id).await
	}

	async fn insert_comment(&self, comment: &CommentRecord) -> Result<bool, DbError> {
		CorrelationRepository::insert_comment(self, comment).await
	}

	async fn update_comment_content(
		&self,
		issue_id: i64,
		comment_id: i64,
		content: &str,
	) -> Result<bool, DbError> {
		CorrelationRepository::update_comment_content(self, issue_id, comment_id, content).await
	}

	async fn delete_comment(&self, issue_id: i64, comment_id: i64) -> Result<bool, DbError> {
		CorrelationRepository::delete_comment(self, issue_id, comment_id).await
	}

	async fn insert_repository(&self, repository: &RepositoryRecord) -> Result<(), DbError> {
		CorrelationRepository::insert_repository(self, repository).await
	}

	async fn get_repository(&self, repository_id: i64) -> Result<Option<RepositoryRecord>, DbError> {
		CorrelationRepository::get_repository(self, repository_id).await
	}

	async fn get_repository_by_name(&self, full_name: &str) -> Result<Option<RepositoryRecord>, DbError> {
		CorrelationRepository::get_repository_by_name(self, full_name).await
	}

	async fn set_repository_installation(
		&self,
		repository_id: i64,
		installation_id: i64,
	) -> Result<bool, DbError> {
		CorrelationRepository::set_repository_installation(self, repository_id, installation_id).await
	}

	async fn get_repository_installation(&self, repository_id: i64) -> Result<Option<i64>, DbError> {
		CorrelationRepository::get_repository_installation(self, repository_id).await
	}

	async fn upsert_tracker_user(&self, user: &TrackerUser) -> Result<(), DbError> {
		CorrelationRepository::upsert_tracker_user(self, user).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::testing::create_test_pool;
	use crate::types::ISSUE_BODY_COMMENT_ID;

	fn issue() -> IssueRecord {
		IssueRecord {
			issue_id: 500,
			repository_id: 7,
			thread_id: 900,
			number: 12,
			pull_request: false,
			closed: false,
			locked: false,
			labels: vec!["bug".to_string()],
			author_id: 42,
			title: "Crash on start".to_string(),
		}
	}

	fn comment(comment_id: i64, message_id: i64, github_origin: bool) -> CommentRecord {
		CommentRecord {
			issue_id: 500,
			comment_id,
			github_origin,
			guild_id: 1,
			channel_id: 900,
			message_id,
			content: "hello".to_string(),
		}
	}

	fn repository() -> RepositoryRecord {
		RepositoryRecord {
			repository_id: 7,
			name: "mikro".to_string(),
			full_name: "acme/mikro".to_string(),
			guild_id: 1,
			forum_id: 2,
			installation_id: None,
		}
	}

	#[tokio::test]
	async fn issue_lookups_and_field_updates() {
		let store = CorrelationRepository::new(create_test_pool().await);
		assert!(store.insert_issue(&issue()).await.unwrap());
		assert!(!store.insert_issue(&issue()).await.unwrap());

		assert_eq!(store.get_issue_by_thread(900).await.unwrap(), Some(issue()));
		assert_eq!(store.get_issue_by_number(7, 12).await.unwrap(), Some(issue()));
		assert!(store.get_issue_by_thread(901).await.unwrap().is_none());

		store.update_issue_locked(500, true).await.unwrap();
		store.update_issue_closed(500, true).await.unwrap();
		store.update_issue_title(500, "Renamed").await.unwrap();
		store
			.update_issue_labels(500, &["bug".to_string(), "triage".to_string()])
			.await
			.unwrap();

		let stored = store.get_issue(500).await.unwrap().unwrap();
		assert!(stored.locked && stored.closed);
		assert_eq!(stored.title, "Renamed");
		assert_eq!(stored.labels, vec!["bug", "triage"]);
	}

	#[tokio::test]
	async fn label_update_is_scoped_to_one_issue() {
		let store = CorrelationRepository::new(create_test_pool().await);
		store.insert_issue(&issue()).await.unwrap();
		let mut other = issue();
		other.issue_id = 501;
		other.thread_id = 901;
		store.insert_issue(&other).await.unwrap();

		store.update_issue_labels(500, &[]).await.unwrap();

		assert!(store.get_issue(500).await.unwrap().unwrap().labels.is_empty());
		assert_eq!(store.get_issue(501).await.unwrap().unwrap().labels, vec!["bug"]);
	}

	#[tokio::test]
	async fn comments_are_unique_by_id_and_by_message() {
		let store = CorrelationRepository::new(create_test_pool().await);

		assert!(store
			.insert_comment(&comment(ISSUE_BODY_COMMENT_ID, 1000, true))
			.await
			.unwrap());
		assert!(!store.insert_comment(&comment(ISSUE_BODY_COMMENT_ID, 1001, true)).await.unwrap());
		assert!(!store.insert_comment(&comment(77, 1000, false)).await.unwrap());
		assert!(store.insert_comment(&comment(77, 1001, false)).await.unwrap());

		let by_message = store.get_comment_by_message(1001).await.unwrap().unwrap();
		assert_eq!(by_message.comment_id, 77);
		assert!(!by_message.github_origin);

		store.update_comment_content(500, 77, "edited").await.unwrap();
		assert_eq!(store.get_comment(500, 77).await.unwrap().unwrap().content, "edited");

		assert!(store.delete_comment(500, 77).await.unwrap());
		assert!(store.get_comment_by_message(1001).await.unwrap().is_none());
	}

	#[tokio::test]
	async fn repository_link_rejects_duplicates_and_backfills_installation() {
		let store = CorrelationRepository::new(create_test_pool().await);
		store.insert_repository(&repository()).await.unwrap();

		let dup = store.insert_repository(&repository()).await;
		assert!(matches!(dup, Err(DbError::Conflict(_))));

		assert_eq!(store.get_repository_installation(7).await.unwrap(), None);
		assert!(store.set_repository_installation(7, 3333).await.unwrap());
		assert!(!store.set_repository_installation(7, 3333).await.unwrap());
		assert_eq!(store.get_repository_installation(7).await.unwrap(), Some(3333));

		let by_name = store.get_repository_by_name("acme/mikro").await.unwrap().unwrap();
		assert_eq!(by_name.installation_id, Some(3333));
		assert_eq!(store.get_repository_installation(8).await.unwrap(), None);
	}

	#[tokio::test]
	async fn tracker_users_insert_once() {
		let store = CorrelationRepository::new(create_test_pool().await);
		let user = TrackerUser {
			id: 42,
			login: "octocat".to_string(),
			avatar_url: None,
		};
		store.upsert_tracker_user(&user).await.unwrap();
		store.upsert_tracker_user(&user).await.unwrap();

		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM github_users")
			.fetch_one(store.pool())
			.await
			.unwrap();
		assert_eq!(count, 1);
	}
}
