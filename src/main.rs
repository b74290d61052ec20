mod cli;

use anyhow::Context;
use clap::Parser;

use da_watchdog::api::{self, AppState};
use da_watchdog::{monitor, Config, EthClient};

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let client = EthClient::new(&config.rpc_urls, config.rpc_timeout)
        .context("failed to build RPC client")?;
    tracing::info!(
        endpoints = ?config.rpc_urls,
        interval_secs = config.poll_interval.as_secs(),
        timeout_ms = config.rpc_timeout.as_millis() as u64,
        "configured"
    );

    match cli.command {
        Commands::Serve { addr } => {
            let bind = addr.unwrap_or_else(|| config.http_bind_addr.clone());
            let handle = monitor::spawn(client, &config, true);
            api::run_http_server(&bind, AppState::new(handle)).await?;
        }
        Commands::Sample { rounds } => {
            let handle = monitor::spawn(client, &config, false);
            for _ in 0..rounds {
                let result = handle.run_round().await?;
                println!("{}", serde_json::to_string_pretty(&result)?);
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
