// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Shared HTTP plumbing for the tracker and chat platform clients.
//!
//! - a reqwest client builder that stamps `User-Agent: mikro/<version>`
//! - [`retry`], exponential backoff with jitter for read-only calls

mod client;
mod retry;

pub use client::{builder, new_client, new_client_with_timeout, user_agent};
pub use retry::{is_retryable_status, retry, RetryConfig, RetryableError};
