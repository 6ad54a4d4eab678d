// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sections. Each has a resolved form and a partial layer.

mod database;
mod discord;
mod github_app;
mod http;
mod logging;
mod sync;

pub use database::{DatabaseConfig, DatabaseConfigLayer};
pub use discord::{DiscordConfig, DiscordConfigLayer, DEFAULT_DISCORD_API_BASE, DEFAULT_WEBHOOK_NAME};
pub use github_app::{GithubAppConfig, GithubAppConfigLayer};
pub use http::{HttpConfig, HttpConfigLayer};
pub use logging::{LoggingConfig, LoggingConfigLayer};
pub use sync::{SyncConfig, SyncConfigLayer};
