//! TCP server for the depth aggregation engine.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use depth_server::config::Config;
use depth_server::server;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(name = "depth-server")]
#[clap(about = "Incremental market-depth aggregation over TCP")]
struct Cli {
    /// TOML config file
    #[clap(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and DEPTH_PORT)
    #[clap(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides config and DEPTH_BIND_ADDR)
    #[clap(short, long)]
    bind: Option<String>,

    /// Log filter, e.g. "info" or "depth_core=trace" (overrides RUST_LOG)
    #[clap(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match &cli.log_level {
        Some(level) => EnvFilter::try_new(level).context("invalid --log-level")?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = Config::load(cli.config.as_deref()).context("load configuration")?;
    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(bind) = cli.bind {
        config.bind_addr = bind;
    }

    info!(
        addr = %config.socket_addr_string(),
        max_clients = config.max_clients,
        feed_queue = config.feed_queue_capacity,
        "starting depth-server"
    );

    server::run(config).await
}
