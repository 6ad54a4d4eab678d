// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! Exponential backoff for idempotent requests.
//!
//! Mutating tracker calls must not go through here: a replayed comment POST
//! would duplicate the comment.

use reqwest::StatusCode;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

const RETRYABLE_STATUSES: [StatusCode; 6] = [
	StatusCode::TOO_MANY_REQUESTS,
	StatusCode::REQUEST_TIMEOUT,
	StatusCode::INTERNAL_SERVER_ERROR,
	StatusCode::BAD_GATEWAY,
	StatusCode::SERVICE_UNAVAILABLE,
	StatusCode::GATEWAY_TIMEOUT,
];

#[derive(Debug, Clone)]
pub struct RetryConfig {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
	pub backoff_factor: f64,
	pub jitter: bool,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 3,
			base_delay: Duration::from_millis(200),
			max_delay: Duration::from_secs(5),
			backoff_factor: 2.0,
			jitter: true,
		}
	}
}

impl RetryConfig {
	/// A single attempt; used by tests and by callers that must not replay.
	pub fn no_retry() -> Self {
		Self {
			max_attempts: 1,
			..Self::default()
		}
	}

	fn delay_for(&self, attempt: u32) -> Duration {
		let exponential = self.base_delay.as_secs_f64() * self.backoff_factor.powi(attempt as i32);
		let capped = exponential.min(self.max_delay.as_secs_f64());
		let delay = if self.jitter {
			capped * (0.5 + fastrand::f64())
		} else {
			capped
		};
		Duration::from_secs_f64(delay)
	}
}

pub trait RetryableError {
	fn is_retryable(&self) -> bool;
}

/// True for statuses worth another attempt: throttling, timeouts and 5xx
/// gateway failures.
pub fn is_retryable_status(status: StatusCode) -> bool {
	RETRYABLE_STATUSES.contains(&status)
}

impl RetryableError for reqwest::Error {
	fn is_retryable(&self) -> bool {
		if self.is_timeout() || self.is_connect() {
			return true;
		}
		self.status().is_some_and(is_retryable_status)
	}
}

pub async fn retry<F, Fut, T, E>(cfg: &RetryConfig, mut f: F) -> Result<T, E>
where
	F: FnMut() -> Fut,
	Fut: Future<Output = Result<T, E>>,
	E: RetryableError + std::fmt::Debug,
{
	let mut attempt = 0;

	loop {
		let err = match f().await {
			Ok(value) => return Ok(value),
			Err(err) => err,
		};
		attempt += 1;

		if !err.is_retryable() || attempt >= cfg.max_attempts {
			warn!(error = ?err, attempt, max_attempts = cfg.max_attempts, "giving up on request");
			return Err(err);
		}

		let delay = cfg.delay_for(attempt - 1);
		warn!(
			error = ?err,
			attempt,
			delay_ms = delay.as_millis() as u64,
			"retrying after error"
		);
		tokio::time::sleep(delay).await;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Arc;

	#[derive(Debug)]
	struct Flaky {
		retryable: bool,
	}

	impl RetryableError for Flaky {
		fn is_retryable(&self) -> bool {
			self.retryable
		}
	}

	fn fast() -> RetryConfig {
		RetryConfig {
			max_attempts: 4,
			base_delay: Duration::from_millis(1),
			max_delay: Duration::from_millis(4),
			backoff_factor: 2.0,
			jitter: false,
		}
	}

	#[tokio::test]
	async fn permanent_errors_are_not_replayed() {
		let calls = Arc::new(AtomicU32::new(0));
		let seen = calls.clone();

		let result: Result<(), Flaky> = retry(&fast(), || {
			let seen = seen.clone();
			async move {
				seen.fetch_add(1, Ordering::SeqCst);
				Err(Flaky { retryable: false })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn transient_errors_stop_at_max_attempts() {
		let calls = Arc::new(AtomicU32::new(0));
		let seen = calls.clone();

		let result: Result<(), Flaky> = retry(&fast(), || {
			let seen = seen.clone();
			async move {
				seen.fetch_add(1, Ordering::SeqCst);
				Err(Flaky { retryable: true })
			}
		})
		.await;

		assert!(result.is_err());
		assert_eq!(calls.load(Ordering::SeqCst), 4);
	}

	#[tokio::test]
	async fn recovers_after_a_transient_failure() {
		let calls = Arc::new(AtomicU32::new(0));
		let seen = calls.clone();

		let result: Result<&str, Flaky> = retry(&fast(), || {
			let seen = seen.clone();
			async move {
				if seen.fetch_add(1, Ordering::SeqCst) == 0 {
					Err(Flaky { retryable: true })
				} else {
					Ok("token")
				}
			}
		})
		.await;

		assert_eq!(result.unwrap(), "token");
		assert_eq!(calls.load(Ordering::SeqCst), 2);
	}

	#[test]
	fn delay_is_capped_without_jitter() {
		let cfg = fast();
		assert_eq!(cfg.delay_for(0), Duration::from_millis(1));
		assert_eq!(cfg.delay_for(10), Duration::from_millis(4));
	}

	#[test]
	fn throttling_statuses_are_retryable() {
		assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
		assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
		assert!(!is_retryable_status(StatusCode::NOT_FOUND));
	}
}
