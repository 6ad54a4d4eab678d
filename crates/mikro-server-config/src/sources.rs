// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: built-in defaults, a TOML file and the environment.

use std::path::PathBuf;

use mikro_common_config::{load_secret_env, SecretString};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{
	DatabaseConfigLayer, DiscordConfigLayer, GithubAppConfigLayer, HttpConfigLayer,
	LoggingConfigLayer, SyncConfigLayer,
};

pub const SYSTEM_CONFIG_PATH: &str = "/etc/mikro/server.toml";

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file source. A missing file is an empty layer.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new(SYSTEM_CONFIG_PATH)
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: MIKRO_SERVER_<SECTION>_<FIELD>. Secrets also accept `<NAME>_FILE`.
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()),
			logging: Some(load_logging_from_env()),
			github_app: Some(load_github_app_from_env()?),
			discord: Some(load_discord_from_env()?),
			sync: Some(load_sync_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, kind: &str) -> Result<Option<T>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid {kind} value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn secret(name: &str) -> Result<Option<SecretString>, ConfigError> {
	load_secret_env(name).map_err(|e| ConfigError::Secret(e.to_string()))
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("MIKRO_SERVER_HOST"),
		port: env_parse("MIKRO_SERVER_PORT", "u16")?,
	})
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("MIKRO_SERVER_DATABASE_URL"),
		path: env_var("MIKRO_SERVER_DATABASE_PATH"),
	}
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("MIKRO_SERVER_LOG_LEVEL"),
	}
}

fn load_github_app_from_env() -> Result<GithubAppConfigLayer, ConfigError> {
	Ok(GithubAppConfigLayer {
		app_id: env_parse("MIKRO_SERVER_GITHUB_APP_ID", "u64")?,
		private_key_pem: secret("MIKRO_SERVER_GITHUB_APP_PRIVATE_KEY")?,
		webhook_secret: secret("MIKRO_SERVER_GITHUB_APP_WEBHOOK_SECRET")?,
		base_url: env_var("MIKRO_SERVER_GITHUB_APP_BASE_URL"),
	})
}

fn load_discord_from_env() -> Result<DiscordConfigLayer, ConfigError> {
	Ok(DiscordConfigLayer {
		token: secret("MIKRO_SERVER_DISCORD_TOKEN")?,
		api_base: env_var("MIKRO_SERVER_DISCORD_API_BASE"),
		webhook_name: env_var("MIKRO_SERVER_DISCORD_WEBHOOK_NAME"),
	})
}

fn load_sync_from_env() -> Result<SyncConfigLayer, ConfigError> {
	Ok(SyncConfigLayer {
		consistency_delay_ms: env_parse("MIKRO_SERVER_SYNC_CONSISTENCY_DELAY_MS", "u64")?,
		thread_cache_size: env_parse("MIKRO_SERVER_SYNC_THREAD_CACHE_SIZE", "usize")?,
		installation_cache_size: env_parse("MIKRO_SERVER_SYNC_INSTALLATION_CACHE_SIZE", "usize")?,
		reply_lookback: env_parse("MIKRO_SERVER_SYNC_REPLY_LOOKBACK", "usize")?,
		relay_secret: secret("MIKRO_SERVER_RELAY_SECRET")?,
		resync_slowmode_secs: env_parse("MIKRO_SERVER_SYNC_RESYNC_SLOWMODE_SECS", "u32")?,
	})
}
