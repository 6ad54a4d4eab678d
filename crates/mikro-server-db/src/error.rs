// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("sqlite: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("invalid database url {url}: {message}")]
	InvalidUrl { url: String, message: String },

	/// No row for the given key.
	#[error("{0} not found")]
	NotFound(String),

	/// A unique key (repository id or full name) is already taken.
	#[error("already exists: {0}")]
	Conflict(String),

	/// A JSON list column (tags, labels) could not be encoded.
	#[error("list column: {0}")]
	ListColumn(#[from] serde_json::Error),
}

impl DbError {
	pub fn is_not_found(&self) -> bool {
		matches!(
			self,
			DbError::NotFound(_) | DbError::Sqlx(sqlx::Error::RowNotFound)
		)
	}
}

pub type Result<T> = std::result::Result<T, DbError>;
