//! ipam-registry - IP address registry service
//!
//! Resolves configuration, opens the registry database and serves the HTTP API.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use ipam_common::api::load_shared_secret;
use ipam_common::config::{database_path, resolve_root_folder, TomlConfig, ROOT_FOLDER_ENV};
use ipam_common::db::{init_database, load_default_region};
use ipam_registry::{build_router, AppState};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "ipam-registry", version, about = "IP address registry")]
struct Args {
    /// Root folder holding ipam.db
    #[arg(long)]
    root_folder: Option<String>,

    /// HTTP listen port (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Explicit TOML config file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let (config, config_origin) = TomlConfig::load(args.config.as_deref());

    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
    config_origin.log();

    info!(
        "Starting IP registry (ipam-registry) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let root_folder = resolve_root_folder(args.root_folder.as_deref(), ROOT_FOLDER_ENV, &config);
    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());

    let pool = match init_database(&db_path, &config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return Err(e.into());
        }
    };

    let shared_secret = load_shared_secret(&pool)
        .await
        .context("loading api_shared_secret")?;
    if shared_secret == 0 {
        info!("Request gate disabled (api_shared_secret = 0)");
    } else {
        info!("Request gate enabled");
    }

    let default_region = load_default_region(&pool, &config.default_region)
        .await
        .context("loading default_region")?;
    info!("Default region: {}", default_region);

    let state = AppState::new(pool, default_region, shared_secret);
    let app = build_router(state);

    let port = args.port.unwrap_or(config.port);
    let addr = format!("{}:{}", config.bind_address, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("ipam-registry listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
