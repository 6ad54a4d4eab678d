// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Persistence for mikro.
//!
//! Two stores share one SQLite pool:
//!
//! - [`ThreadStore`]: chat thread metadata backing the thread registry
//! - [`CorrelationStore`]: issue, comment and repository correlation rows
//!
//! Both are traits so the sync engine can be exercised against the
//! in-memory pool from [`testing::create_test_pool`].

pub mod correlation;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod testing;
pub mod thread;
pub mod types;

pub use correlation::{CorrelationRepository, CorrelationStore};
pub use error::{DbError, Result};
pub use migrations::run_migrations;
pub use pool::create_pool;
pub use thread::{ThreadRepository, ThreadStore};
pub use types::{
	CommentRecord, IssueRecord, RepositoryRecord, ThreadRecord, TrackerUser, ISSUE_BODY_COMMENT_ID,
};
