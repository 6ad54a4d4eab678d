// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Thread metadata persistence.
//!
//! The registry in `mikro-server-sync` fronts this store with a bounded
//! cache; nothing else should write `threads` directly.

use async_trait::async_trait;
use sqlx::{sqlite::SqlitePool, Row};

use crate::error::DbError;
use crate::types::ThreadRecord;

#[async_trait]
pub trait ThreadStore: Send + Sync {
	/// Insert `record`. When a row already exists it is overwritten if
	/// `update_if_exists` is set and left alone otherwise. Returns whether a
	/// row was written.
	async fn upsert(&self, record: &ThreadRecord, update_if_exists: bool) -> Result<bool, DbError>;

	async fn get(&self, thread_id: i64) -> Result<Option<ThreadRecord>, DbError>;

	async fn delete(&self, thread_id: i64) -> Result<bool, DbError>;

	async fn update_title(&self, thread_id: i64, title: &str) -> Result<bool, DbError>;

	async fn update_tags(&self, thread_id: i64, tags: &[String]) -> Result<bool, DbError>;

	async fn update_owner(&self, thread_id: i64, owner_id: i64) -> Result<bool, DbError>;

	async fn update_description(
		&self,
		thread_id: i64,
		description: Option<&str>,
	) -> Result<bool, DbError>;

	async fn update_disable_archive(&self, thread_id: i64, disable: bool)
		-> Result<bool, DbError>;

	/// Move `last_message_id` forward. Lower ids are ignored.
	async fn raise_last_message_id(&self, thread_id: i64, message_id: i64)
		-> Result<bool, DbError>;

	/// Overwrite `last_message_id` unconditionally (backfill).
	async fn reset_last_message_id(
		&self,
		thread_id: i64,
		message_id: Option<i64>,
	) -> Result<bool, DbError>;
}

#[derive(Clone)]
pub struct ThreadRepository {
	pool: SqlitePool,
}

impl ThreadRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}

	#[tracing::instrument(skip(self, record), fields(thread_id = record.thread_id))]
	pub async fn upsert(&self, record: &ThreadRecord, update_if_exists: bool) -> Result<bool, DbError> {
		let now = chrono::Utc::now().to_rfc3339();
		let tags = serde_json::to_string(&record.tags)?;

		let conflict = if update_if_exists {
			r#"ON CONFLICT(thread_id) DO UPDATE SET
                guild_id = excluded.guild_id,
                channel_id = excluded.channel_id,
                owner_id = excluded.owner_id,
                title = excluded.title,
                starting_message = excluded.starting_message,
                tags = excluded.tags,
                description = excluded.description,
                disable_archive = excluded.disable_archive,
                public = excluded.public,
                last_message_id = excluded.last_message_id,
                updated_at = excluded.updated_at"#
		} else {
			"ON CONFLICT(thread_id) DO NOTHING"
		};

		let sql = format!(
			r#"
            INSERT INTO threads (
                thread_id, guild_id, channel_id, owner_id, title, starting_message,
                tags, description, disable_archive, public, last_message_id,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
            {conflict}
            "#
		);

		let result = sqlx::query(&sql)
			.bind(record.thread_id)
			.bind(record.guild_id)
			.bind(record.channel_id)
			.bind(record.owner_id)
			.bind(&record.title)
			.bind(&record.starting_message)
			.bind(&tags)
			.bind(&record.description)
			.bind(record.disable_archive)
			.bind(record.public)
			.bind(record.last_message_id)
			.bind(&now)
			.execute(&self.pool)
			.await?;

		let written = result.rows_affected() > 0;
		tracing::debug!(written, update_if_exists, "thread: upserted");
		Ok(written)
	}

	pub async fn get(&self, thread_id: i64) -> Result<Option<ThreadRecord>, DbError> {
		let row = sqlx::query(
			r#"
            SELECT thread_id, guild_id, channel_id, owner_id, title, starting_message,
                   tags, description, disable_archive, public, last_message_id
            FROM threads
            WHERE thread_id = ?
            "#,
		)
		.bind(thread_id)
		.fetch_optional(&self.pool)
		.await?;

		Ok(row.as_ref().map(row_to_thread))
	}

	pub async fn delete(&self, thread_id: i64) -> Result<bool, DbError> {
		let result = sqlx::query("DELETE FROM threads WHERE thread_id = ?")
			.bind(thread_id)
			.execute(&self.pool)
			.await?;

		let deleted = result.rows_affected() > 0;
		if deleted {
			tracing::info!(thread_id, "thread: deleted");
		}
		Ok(deleted)
	}

	pub async fn update_title(&self, thread_id: i64, title: &str) -> Result<bool, DbError> {
		self.set_column(thread_id, "title", title.to_string()).await
	}

	pub async fn update_tags(&self, thread_id: i64, tags: &[String]) -> Result<bool, DbError> {
		let tags = serde_json::to_string(tags)?;
		self.set_column(thread_id, "tags", tags).await
	}

	pub async fn update_owner(&self, thread_id: i64, owner_id: i64) -> Result<bool, DbError> {
		self.set_column(thread_id, "owner_id", owner_id).await
	}

	pub async fn update_description(
		&self,
		thread_id: i64,
		description: Option<&str>,
	) -> Result<bool, DbError> {
		self.set_column(thread_id, "description", description.map(str::to_string))
			.await
	}

	pub async fn update_disable_archive(&self, thread_id: i64, disable: bool) -> Result<bool, DbError> {
		self.set_column(thread_id, "disable_archive", disable).await
	}

	pub async fn raise_last_message_id(&self, thread_id: i64, message_id: i64) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
            UPDATE threads
            SET last_message_id = ?1, updated_at = ?2
            WHERE thread_id = ?3 AND (last_message_id IS NULL OR last_message_id < ?1)
            "#,
		)
		.bind(message_id)
		.bind(chrono::Utc::now().to_rfc3339())
		.bind(thread_id)
		.execute(&self.pool)
		.await?;

		Ok(result.rows_affected() > 0)
	}

	pub async fn reset_last_message_id(
		&self,
		thread_id: i64,
		message_id: Option<i64>,
	) -> Result<bool, DbError> {
		self.set_column(thread_id, "last_message_id", message_id).await
	}

	/// Update a single column. `column` is always one of the literals above.
	async fn set_column<T>(&self, thread_id: i64, column: &'static str, value: T) -> Result<bool, DbError>
	where
		T: for<'q> sqlx::Encode<'q, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite> + Send + 'static,
	{
		let sql = format!("UPDATE threads SET {column} = ?1, updated_at = ?2 WHERE thread_id = ?3");
		let result = sqlx::query(&sql)
			.bind(value)
			.bind(chrono::Utc::now().to_rfc3339())
			.bind(thread_id)
			.execute(&self.pool)
			.await?;

		Ok(result.rows_affected() > 0)
	}
}

fn row_to_thread(row: &sqlx::sqlite::SqliteRow) -> ThreadRecord {
	let tags_json: String = row.get("tags");
	ThreadRecord {
		thread_id: row.get("thread_id"),
		guild_id: row.get("guild_id"),
		channel_id: row.get("channel_id"),
		owner_id: row.get("owner_id"),
		title: row.get("title"),
		starting_message: row.get("starting_message"),
		tags: serde_json::from_str(&tags_json).unwrap_or_default(),
		description: row.get("description"),
		disable_archive: row.get("disable_archive"),
		public: row.get("public"),
		last_message_id: row.get("last_message_id"),
	}
}

#[async_trait]
impl ThreadStore for ThreadRepository {
	async fn upsert(&self, record: &ThreadRecord, update_if_exists: bool) -> Result<bool, DbError> {
		ThreadRepository::upsert(self, record, update_if_exists).await
	}

	async fn get(&self, thread_id: i64) -> Result<Option<ThreadRecord>, DbError> {
		ThreadRepository::get(self, thread_id).await
	}

	async fn delete(&self, thread_id: i64) -> Result<bool, DbError> {
		ThreadRepository::delete(self, thread_id).await
	}

	async fn update_title(&self, thread_id: i64, title: &str) -> Result<bool, DbError> {
		ThreadRepository::update_title(self, thread_id, title).await
	}

	async fn update_tags(&self, thread_id: i64, tags: &[String]) -> Result<bool, DbError> {
		ThreadRepository::update_tags(self, thread_id, tags).await
	}

	async fn update_owner(&self, thread_id: i64, owner_id: i64) -> Result<bool, DbError> {
		ThreadRepository::update_owner(self, thread_id, owner_id).await
	}

	async fn update_description(
		&self,
		thread_id: i64,
		description: Option<&str>,
	) -> Result<bool, DbError> {
		ThreadRepository::update_description(self, thread_id, description).await
	}

	async fn update_disable_archive(&self, thread_id: i64, disable: bool) -> Result<bool, DbError> {
		ThreadRepository::update_disable_archive(self, thread_id, disable).await
	}

	async fn raise_last_message_id(&self, thread_id: i64, message_id: i64) -> Result<bool, DbError> {
		ThreadRepository::raise_last_message_id(self, thread_id, message_id).await
	}

	async fn reset_last_message_id(
		&self,
		thread_id: i64,
		message_id: Option<i64>,
	) -> Result<bool, DbError> {
		ThreadRepository::reset_last_message_id(self, thread_id, message_id).await
	}
}
