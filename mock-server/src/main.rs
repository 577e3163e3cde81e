use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use mock_server::MockConfig;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "In-memory posts API for local development")]
struct Args {
    /// Interface to bind
    #[arg(long, default_value = "127.0.0.1", env = "HOST")]
    host: String,
    /// Port to listen on
    #[arg(short, long, default_value_t = 3000, env = "PORT")]
    port: u16,
    /// Probability (0.0 to 1.0) that a PUT /posts/{id} answers 500
    #[arg(long, default_value_t = 0.0, env = "UPDATE_FAILURE_RATE")]
    update_failure_rate: f64,
    /// Delay applied to every PUT /posts/{id}, in milliseconds
    #[arg(long, default_value_t = 400, env = "UPDATE_DELAY_MS")]
    update_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("bind {addr}"))?;
    info!("listening on {addr}");

    let config = MockConfig::new(
        args.update_failure_rate,
        Duration::from_millis(args.update_delay_ms),
    );
    mock_server::run_with(listener, config)
        .await
        .context("serve mock api")
}
