// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

use reqwest::{Client, ClientBuilder};
use std::time::Duration;

/// `mikro/{crate version}`, sent on every outbound request. GitHub rejects
/// API calls without a User-Agent.
pub fn user_agent() -> String {
	format!("mikro/{}", env!("CARGO_PKG_VERSION"))
}

pub fn builder() -> ClientBuilder {
	Client::builder().user_agent(user_agent())
}

pub fn new_client() -> reqwest::Result<Client> {
	builder().build()
}

pub fn new_client_with_timeout(timeout: Duration) -> reqwest::Result<Client> {
	builder().timeout(timeout).build()
}
