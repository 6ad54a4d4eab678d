// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use sqlx::sqlite::SqlitePool;

use crate::error::DbError;

const INITIAL: &str = include_str!("../migrations/001_initial.sql");

/// Apply the schema. Every statement is `IF NOT EXISTS`, so this runs on
/// every start.
#[tracing::instrument(skip(pool))]
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), DbError> {
	for stmt in statements(INITIAL) {
		sqlx::query(stmt).execute(pool).await?;
	}
	tracing::debug!("migrations applied");
	Ok(())
}

fn statements(script: &str) -> impl Iterator<Item = &str> {
	script
		.split(';')
		.map(str::trim)
		.filter(|s| s.lines().any(|l| !l.trim().is_empty() && !l.trim_start().starts_with("--")))
}
