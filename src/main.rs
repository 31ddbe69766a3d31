use anyhow::Context;
use branchdesk::{AppConfig, BackOffice, build_router};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "branchdesk")]
#[command(about = "Back-office CRUD engine for branch operations")]
struct Cli {
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    #[arg(long, default_value_t = 8000)]
    port: u16,
    #[arg(long, default_value = "admin")]
    admin_username: String,
    #[arg(long, default_value = "adminpass")]
    admin_password: String,
    /// Snapshot file loaded at startup and saved on shutdown
    #[arg(long)]
    snapshot: Option<PathBuf>,
    /// Leave a table unprovisioned (repeatable)
    #[arg(long)]
    skip_table: Vec<String>,
    /// Enable the credit bureau endpoint (simulated without an API key)
    #[arg(long, default_value_t = false)]
    bureau: bool,
    #[arg(long)]
    bureau_api_key: Option<String>,
    #[arg(long)]
    bureau_url: Option<String>,
    /// Enable the NPA summary endpoint
    #[arg(long, default_value_t = false)]
    npa: bool,
}

fn config_from(cli: Cli) -> AppConfig {
    let mut config = AppConfig::new(&cli.admin_username, &cli.admin_password)
        .host(&cli.host)
        .port(cli.port);
    if let Some(path) = cli.snapshot {
        config = config.snapshot_path(path);
    }
    for table in &cli.skip_table {
        config = config.skip_table(table);
    }
    if cli.bureau || cli.bureau_api_key.is_some() {
        config = config.bureau(cli.bureau_api_key.as_deref(), cli.bureau_url.as_deref());
    }
    if cli.npa {
        config = config.npa();
    }
    config
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "shutdown signal listener failed");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = config_from(Cli::parse());
    let addr = config.bind_addr();

    let engine = Arc::new(
        BackOffice::bootstrap(config)
            .await
            .context("engine bootstrap")?,
    );
    let router = build_router(engine.clone());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    tracing::info!(%addr, "branchdesk listening");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if engine.config().snapshot_path.is_some() {
        engine
            .save_snapshot()
            .await
            .context("save snapshot on shutdown")?;
        tracing::info!("snapshot saved");
    }
    Ok(())
}
