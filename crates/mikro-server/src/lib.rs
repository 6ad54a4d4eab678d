// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! mikro HTTP server.
//!
//! Receives GitHub App webhooks and the Discord gateway relay, and hands both
//! to the [`SyncEngine`](mikro_server_sync::SyncEngine).

pub mod api;
pub mod error;
pub mod routes;
pub mod signature;

pub use api::{create_router, AppState};
pub use error::{ErrorResponse, ServerError};
pub use mikro_server_config::ServerConfig;
