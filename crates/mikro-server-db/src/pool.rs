// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};

use crate::error::DbError;

/// Correlation lookups are short and mostly serialized by the installation
/// locks, so a handful of connections is plenty.
const MAX_CONNECTIONS: u32 = 8;

/// Open (and create) the store behind `database_url`, e.g. `sqlite:./mikro.db`.
#[tracing::instrument(skip(database_url))]
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, DbError> {
	let options = SqliteConnectOptions::from_str(database_url)
		.map_err(|e| DbError::InvalidUrl {
			url: database_url.to_string(),
			message: e.to_string(),
		})?
		.create_if_missing(true)
		.journal_mode(SqliteJournalMode::Wal)
		.foreign_keys(true);

	let pool = SqlitePoolOptions::new()
		.max_connections(MAX_CONNECTIONS)
		.connect_with(options)
		.await?;
	tracing::debug!(max_connections = MAX_CONNECTIONS, "correlation store opened");
	Ok(pool)
}
