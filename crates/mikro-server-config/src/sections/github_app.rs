// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! GitHub App credentials.

use mikro_common_config::SecretString;
use serde::Deserialize;

/// GitHub App configuration (runtime, fully resolved).
#[derive(Debug, Clone)]
pub struct GithubAppConfig {
	pub app_id: u64,
	pub private_key_pem: SecretString,
	pub webhook_secret: Option<SecretString>,
	/// GitHub Enterprise API root. `None` means api.github.com.
	pub base_url: Option<String>,
}

/// GitHub App configuration layer (partial, for merging).
///
/// Secrets are only read from the environment, never from the TOML file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GithubAppConfigLayer {
	#[serde(default)]
	pub app_id: Option<u64>,
	#[serde(skip)]
	pub private_key_pem: Option<SecretString>,
	#[serde(skip)]
	pub webhook_secret: Option<SecretString>,
	#[serde(default)]
	pub base_url: Option<String>,
}

impl GithubAppConfigLayer {
	pub fn merge(&mut self, other: GithubAppConfigLayer) {
		if other.app_id.is_some() {
			self.app_id = other.app_id;
		}
		if other.private_key_pem.is_some() {
			self.private_key_pem = other.private_key_pem;
		}
		if other.webhook_secret.is_some() {
			self.webhook_secret = other.webhook_secret;
		}
		if other.base_url.is_some() {
			self.base_url = other.base_url;
		}
	}

	/// `None` unless both the app id and the private key are set.
	pub fn finalize(self) -> Option<GithubAppConfig> {
		Some(GithubAppConfig {
			app_id: self.app_id?,
			private_key_pem: self.private_key_pem?,
			webhook_secret: self.webhook_secret,
			base_url: self.base_url,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unconfigured_without_key() {
		let layer = GithubAppConfigLayer {
			app_id: Some(1234),
			..Default::default()
		};
		assert!(layer.finalize().is_none());
	}

	#[test]
	fn test_configured() {
		let layer = GithubAppConfigLayer {
			app_id: Some(1234),
			private_key_pem: Some(SecretString::new("pem".to_string())),
			webhook_secret: Some(SecretString::new("whsec".to_string())),
			base_url: None,
		};
		let config = layer.finalize().unwrap();
		assert_eq!(config.app_id, 1234);
		assert_eq!(config.private_key_pem.expose(), "pem");
		assert!(!format!("{config:?}").contains("whsec"));
	}

	#[test]
	fn test_toml_cannot_carry_secrets() {
		let layer: GithubAppConfigLayer =
			toml::from_str("app_id = 7\nprivate_key_pem = \"inline\"").unwrap();
		assert_eq!(layer.app_id, Some(7));
		assert!(layer.private_key_pem.is_none());
	}
}
