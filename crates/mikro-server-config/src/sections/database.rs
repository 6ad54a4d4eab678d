// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Correlation store location.

use serde::Deserialize;

const DEFAULT_DATABASE_URL: &str = "sqlite:./mikro.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
	/// sqlx SQLite URL.
	pub url: String,
}

impl DatabaseConfig {
	pub fn is_sqlite(&self) -> bool {
		self.url.starts_with("sqlite:")
	}
}

impl Default for DatabaseConfig {
	fn default() -> Self {
		Self {
			url: DEFAULT_DATABASE_URL.to_string(),
		}
	}
}

/// `url` wins over `path`; `path` is shorthand for `sqlite:{path}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseConfigLayer {
	#[serde(default)]
	pub url: Option<String>,
	#[serde(default)]
	pub path: Option<String>,
}

impl DatabaseConfigLayer {
	pub fn merge(&mut self, other: DatabaseConfigLayer) {
		if other.url.is_some() {
			self.url = other.url;
			self.path = None;
		}
		if other.path.is_some() {
			self.path = other.path;
			self.url = None;
		}
	}

	pub fn finalize(self) -> DatabaseConfig {
		let url = match (self.url, self.path) {
			(Some(url), _) => url,
			(None, Some(path)) => format!("sqlite:{path}"),
			(None, None) => DEFAULT_DATABASE_URL.to_string(),
		};
		DatabaseConfig { url }
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_to_a_local_file() {
		let config = DatabaseConfigLayer::default().finalize();
		assert_eq!(config.url, "sqlite:./mikro.db");
		assert!(config.is_sqlite());
	}

	#[test]
	fn path_is_shorthand_for_a_sqlite_url() {
		let layer = DatabaseConfigLayer {
			path: Some("/var/lib/mikro/mikro.db".to_string()),
			..Default::default()
		};
		assert_eq!(layer.finalize().url, "sqlite:/var/lib/mikro/mikro.db");
	}

	#[test]
	fn later_layer_replaces_either_form() {
		let mut base = DatabaseConfigLayer {
			path: Some("/srv/a.db".to_string()),
			..Default::default()
		};
		base.merge(DatabaseConfigLayer {
			url: Some("sqlite::memory:".to_string()),
			..Default::default()
		});
		assert_eq!(base.clone().finalize().url, "sqlite::memory:");

		base.merge(DatabaseConfigLayer {
			path: Some("/srv/b.db".to_string()),
			..Default::default()
		});
		assert_eq!(base.finalize().url, "sqlite:/srv/b.db");
	}
}
