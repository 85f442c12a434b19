//! Bourse limit command
//!
//! Sells the whole position held in a market's quote asset with a limit
//! order, replacing the order currently open on that market.
//!
//! # Usage
//!
//! ```bash
//! bourse-limit BTC-ETH 0.07
//!
//! # Verbose logs
//! RUST_LOG=bourse=debug bourse-limit BTC-ETH 0.07
//! ```
//!
//! # Environment Variables
//!
//! - `BOURSE_API_URL`: Exchange REST base URL
//! - `BOURSE_KEY_FILE`: Key file, API key then secret (default: bourse.key)
//! - `BOURSE_RETRY_MAX_ATTEMPTS`: Stop retrying after this many attempts (default: never)
//! - `BOURSE_TRANSIENT_CODES`: Extra comma-separated codes to retry

use std::process::ExitCode;

use bourse_cli::{build_client, run_limit, Cli, Config};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // --help and --version are not failures
            let code = if e.use_stderr() { 1 } else { 0 };
            let _ = e.print();
            return ExitCode::from(code);
        },
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Command failed");
            eprintln!("{:#}", e);
            ExitCode::from(1)
        },
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Logs go to stderr, stdout carries the orders
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("bourse=info".parse()?))
        .init();

    let config = Config::from_env()?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api_url = %config.api.base_url,
        market = %cli.market,
        "Bourse limit"
    );

    let client = build_client(&config)?;
    run_limit(&client, &cli.market, cli.limit_price, &mut std::io::stdout()).await?;

    Ok(())
}
