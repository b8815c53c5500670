//! MicroTardis portal (mt-portal) - Main entry point
//!
//! Serves datafile parameter panels, thumbnails and spectrum exports over
//! HTTP, and runs the post-save filters on request.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use mt_common::config::CliOverrides;
use mt_common::db::init_database;
use mt_common::filters::FilterRegistry;
use mt_common::Settings;
use mt_portal::api::buildinfo::BuildInfo;
use mt_portal::{build_router, AppState};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for mt-portal
#[derive(Parser, Debug)]
#[command(name = "mt-portal")]
#[command(about = "MicroTardis facility data portal")]
#[command(version)]
struct Args {
    /// Config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Root folder holding the database, file store and thumbnails
    #[arg(short, long, env = "MT_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "MT_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let settings = Settings::load(&CliOverrides {
        config: args.config,
        root_folder: args.root_folder,
        port: args.port,
    })
    .context("Failed to load configuration")?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("mt_portal={0},mt_common={0},tower_http=info", settings.log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let build = BuildInfo::current();
    info!(
        "Starting MicroTardis portal ({}) v{} built {} ({})",
        build.package, build.display, build.build_timestamp, build.build_profile
    );
    match &settings.config_file {
        Some(path) => info!("Config file: {}", path.display()),
        None => info!("No config file found, using defaults"),
    }
    info!("Root folder: {}", settings.root_folder.display());

    for dir in [
        &settings.root_folder,
        &settings.file_store_path,
        &settings.thumbnails_path,
    ] {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create directory {}", dir.display()))?;
    }

    info!("Database path: {}", settings.database_path.display());
    let pool = init_database(&settings.database_path)
        .await
        .context("Failed to open database")?;

    let registry = FilterRegistry::from_config(&settings.filters)
        .context("Invalid filter configuration")?;
    for filter in registry.filters() {
        info!(
            "Filter {} -> schema {} ({})",
            filter.kind.name, filter.schema_name, filter.namespace
        );
    }

    let addr = settings.listen_addr();
    let state = AppState::new(pool, Arc::new(settings), Arc::new(registry));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("mt-portal listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
