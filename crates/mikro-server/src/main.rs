// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights
// reserved. SPDX-License-Identifier: Proprietary

//! mikro server binary.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand};
use mikro_chat_core::MessageReplicator;
use mikro_server::{create_router, AppState, ServerConfig};
use mikro_server_config::require;
use mikro_server_db::{create_pool, run_migrations, CorrelationRepository, ThreadRepository};
use mikro_server_discord::DiscordClient;
use mikro_server_github_app::{GithubAppClient, GithubAppConfig};
use mikro_server_sync::{SyncEngine, SyncSettings, ThreadRegistry};
use sqlx::SqlitePool;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// mikro - keeps Discord forum threads and GitHub issues in sync.
#[derive(Parser, Debug)]
#[command(name = "mikro-server", about = "Discord forum and GitHub issue sync server", version)]
struct Args {
	/// TOML config file. Defaults to /etc/mikro/server.toml.
	#[arg(long, env = "MIKRO_SERVER_CONFIG")]
	config: Option<PathBuf>,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the HTTP server (default)
	Serve,
	/// Show version information
	Version,
	/// Link a GitHub repository to a forum channel
	LinkRepo {
		/// `owner/name`
		#[arg(long)]
		repo: String,
		#[arg(long)]
		guild: i64,
		#[arg(long)]
		forum: i64,
	},
	/// Create or refresh the thread for an issue and mirror its comments
	SyncIssue {
		#[arg(long)]
		repo: String,
		#[arg(long)]
		number: i64,
	},
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let args = Args::parse();

	if let Some(Command::Version) = args.command {
		println!("mikro-server version: {}", env!("CARGO_PKG_VERSION"));
		return Ok(());
	}

	dotenvy::dotenv().ok();

	let config = match &args.config {
		Some(path) => mikro_server_config::load_config_with_file(path)?,
		None => mikro_server_config::load_config()?,
	};

	tracing_subscriber::registry()
		.with(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| config.logging.level.clone().into()),
		)
		.with(tracing_subscriber::fmt::layer())
		.init();

	let pool = create_pool(&config.database.url)
		.await
		.with_context(|| format!("opening database {}", config.database.url))?;
	run_migrations(&pool).await.context("running migrations")?;

	let engine = Arc::new(build_engine(&config, pool.clone())?);

	match args.command.unwrap_or(Command::Serve) {
		Command::Serve => serve(config, engine, pool).await,
		Command::Version => Ok(()),
		Command::LinkRepo { repo, guild, forum } => {
			let record = engine.add_repo(&repo, guild, forum).await?;
			println!(
				"linked {} (repository {}) to forum {}",
				record.full_name, record.repository_id, record.forum_id
			);
			Ok(())
		}
		Command::SyncIssue { repo, number } => {
			let synced = engine.sync_full_issue(&repo, number).await?;
			println!(
				"{repo}#{number}: thread {}, {} new comment(s)",
				synced.thread_id, synced.replicated
			);
			Ok(())
		}
	}
}

fn build_engine(config: &ServerConfig, pool: SqlitePool) -> anyhow::Result<SyncEngine> {
	let app = require(config.github_app.as_ref(), "MIKRO_SERVER_GITHUB_APP_ID")?;
	let mut github_config = GithubAppConfig::new(app.app_id, app.private_key_pem.expose().clone());
	if let Some(secret) = &app.webhook_secret {
		github_config = github_config.with_webhook_secret(secret.expose().clone());
	}
	if let Some(base_url) = &app.base_url {
		github_config = github_config.with_base_url(base_url.clone());
	}
	let tracker = Arc::new(GithubAppClient::new(github_config)?);

	let discord = require(config.discord.as_ref(), "MIKRO_SERVER_DISCORD_TOKEN")?;
	let chat = Arc::new(
		DiscordClient::new(discord.token.expose().clone())?.with_api_base(discord.api_base.clone()),
	);
	let replicator = Arc::new(
		MessageReplicator::new(chat.clone()).with_webhook_name(discord.webhook_name.clone()),
	);

	let registry = Arc::new(ThreadRegistry::with_capacity(
		Arc::new(ThreadRepository::new(pool.clone())),
		chat.clone(),
		config.sync.thread_cache_size,
	));

	Ok(SyncEngine::with_settings(
		Arc::new(CorrelationRepository::new(pool)),
		registry,
		tracker,
		chat,
		replicator,
		SyncSettings {
			installation_cache_size: config.sync.installation_cache_size,
			resync_slowmode_secs: config.sync.resync_slowmode_secs,
			reply_lookback: config.sync.reply_lookback,
		},
	))
}

async fn serve(config: ServerConfig, engine: Arc<SyncEngine>, pool: SqlitePool) -> anyhow::Result<()> {
	let state = AppState::new(engine, pool)
		.with_webhook_secret(
			config
				.github_app
				.as_ref()
				.and_then(|app| app.webhook_secret.clone()),
		)
		.with_relay_secret(config.sync.relay_secret.clone())
		.with_consistency_delay(Duration::from_millis(config.sync.consistency_delay_ms));

	if state.relay_secret.is_none() {
		tracing::warn!("MIKRO_SERVER_RELAY_SECRET is not set; chat relay endpoints will reject requests");
	}

	let app = create_router(state).layer(TraceLayer::new_for_http());

	let addr = config.socket_addr();
	tracing::info!("listening on {}", addr);
	let listener = tokio::net::TcpListener::bind(&addr).await?;

	tokio::select! {
		result = axum::serve(listener, app) => {
			if let Err(e) = result {
				tracing::error!(error = %e, "Server error");
			}
		}
		_ = tokio::signal::ctrl_c() => {
			tracing::info!("Received shutdown signal");
		}
	}

	tracing::info!("Server shutdown complete");
	Ok(())
}
