// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Layered configuration for the mikro server.
//!
//! Sources, lowest precedence first:
//! - built-in defaults
//! - a TOML file (`/etc/mikro/server.toml` unless a path is given)
//! - `MIKRO_SERVER_*` environment variables
//!
//! ```ignore
//! use mikro_server_config::load_config;
//!
//! let config = load_config()?;
//! println!("listening on {}", config.socket_addr());
//! ```

pub mod error;
pub mod layer;
pub mod sections;
pub mod sources;

pub use error::ConfigError;
pub use layer::ServerConfigLayer;
pub use sections::*;
pub use sources::{
	ConfigSource, DefaultsSource, EnvSource, Precedence, TomlSource, SYSTEM_CONFIG_PATH,
};

use std::path::PathBuf;

use tracing::{debug, info};

/// Fully resolved server configuration.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
	pub http: HttpConfig,
	pub database: DatabaseConfig,
	pub logging: LoggingConfig,
	pub github_app: Option<GithubAppConfig>,
	pub discord: Option<DiscordConfig>,
	pub sync: SyncConfig,
}

impl ServerConfig {
	pub fn socket_addr(&self) -> String {
		format!("{}:{}", self.http.host, self.http.port)
	}
}

/// Defaults, then `/etc/mikro/server.toml`, then the environment.
pub fn load_config() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::system()),
		Box::new(EnvSource),
	])
}

/// Like [`load_config`] with an explicit config file.
pub fn load_config_with_file(config_path: impl Into<PathBuf>) -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![
		Box::new(DefaultsSource),
		Box::new(TomlSource::new(config_path)),
		Box::new(EnvSource),
	])
}

pub fn load_config_from_env() -> Result<ServerConfig, ConfigError> {
	load_from_sources(vec![Box::new(EnvSource)])
}

fn load_from_sources(mut sources: Vec<Box<dyn ConfigSource>>) -> Result<ServerConfig, ConfigError> {
	sources.sort_by_key(|s| s.precedence());

	let mut merged = ServerConfigLayer::default();
	for source in sources {
		debug!(source = source.name(), "loading configuration source");
		merged.merge(source.load()?);
	}

	finalize(merged)
}

fn finalize(layer: ServerConfigLayer) -> Result<ServerConfig, ConfigError> {
	let config = ServerConfig {
		http: layer.http.unwrap_or_default().finalize(),
		database: layer.database.unwrap_or_default().finalize(),
		logging: layer.logging.unwrap_or_default().finalize(),
		github_app: layer.github_app.and_then(|l| l.finalize()),
		discord: layer.discord.and_then(|l| l.finalize()),
		sync: layer.sync.unwrap_or_default().finalize(),
	};

	validate_config(&config)?;

	info!(
		host = %config.http.host,
		port = config.http.port,
		database = %config.database.url,
		github_app_configured = config.github_app.is_some(),
		discord_configured = config.discord.is_some(),
		relay_secret_configured = config.sync.relay_secret.is_some(),
		"Server configuration loaded"
	);

	Ok(config)
}

fn validate_config(config: &ServerConfig) -> Result<(), ConfigError> {
	if !config.database.is_sqlite() {
		return Err(ConfigError::InvalidValue {
			key: "database.url".to_string(),
			message: format!("expected a sqlite: URL, got {}", config.database.url),
		});
	}

	if config.sync.thread_cache_size == 0 || config.sync.installation_cache_size == 0 {
		return Err(ConfigError::Validation(
			"sync cache sizes must be greater than zero".to_string(),
		));
	}

	if let Some(app) = &config.github_app {
		if app.webhook_secret.is_none() {
			return Err(ConfigError::Validation(
				"MIKRO_SERVER_GITHUB_APP_ID is set but MIKRO_SERVER_GITHUB_APP_WEBHOOK_SECRET is not; \
				 webhook deliveries could not be verified"
					.to_string(),
			));
		}
	}

	Ok(())
}

/// Fail with [`ConfigError::MissingEnvVar`] naming `var` when `value` is unset.
pub fn require<T>(value: Option<T>, var: &str) -> Result<T, ConfigError> {
	value.ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
}
