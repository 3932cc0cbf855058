use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gazette_rs::config::CmsConfig;
use gazette_rs::handler::{CmsDB, RetryPolicy};
use gazette_rs::state::AppState;

#[derive(Debug, Parser)]
#[command(version, about = "JSON API server for the gazette CMS")]
struct Args {
    /// TOML config file; every setting has a default.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_logging() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,gazette_rs=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .map_err(|err| anyhow!(err))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("could not listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    init_logging()?;
    let args = Args::parse();

    let config = CmsConfig::load(args.config.as_deref())?;

    let dbpool = Arc::new(gazette_rs::new_dbconn_pool(
        &config.database_url,
        config.db_pool_max_size,
    )?);
    gazette_rs::run_migrations(&dbpool)?;
    info!("created dbpool from {:?}", config.database_url);

    let db = CmsDB::new(dbpool).with_retry_policy(RetryPolicy::with_retries(config.query_retries));

    let addr = format!("{}:{}", config.bind_address, config.port);
    info!(upload_dir = ?config.upload_dir, "serving uploads");
    let app = gazette_rs::build_router(AppState::new(db, config));

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("could not bind {}", addr))?;
    info!("listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
