// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! GitHub App side of mikro.
//!
//! - [`GithubAppClient`]: app JWT and installation token management plus the
//!   issue, comment and label calls the sync engine needs
//! - [`IssueTracker`]: the trait the engine is written against
//! - [`webhook`]: `X-Hub-Signature-256` verification and typed payloads

pub mod client;
pub mod config;
pub mod error;
pub mod jwt;
pub mod tracker;
pub mod types;
pub mod webhook;

pub use client::GithubAppClient;
pub use config::GithubAppConfig;
pub use error::GithubAppError;
pub use mikro_common_http::RetryConfig;
pub use tracker::IssueTracker;
pub use types::{
	Installation, Issue, IssueComment, IssueState, IssueUpdate, Label, LinkedRepository, Repository,
	User,
};
pub use webhook::{
	compute_webhook_signature, parse_webhook_event, verify_webhook_signature, WebhookEvent,
};
