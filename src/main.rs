//! # Payroll
//!
//! Pays a roster of payees in an ERC-20 token from a pool of signing keys.
use clap::Parser;
use payroll::cli::Args;
use tokio_util::sync::CancellationToken;
use tracing::{level_filters::LevelFilter, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder().with_default_directive(LevelFilter::INFO.into()).from_env_lossy(),
        )
        .init();

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupted, stopping after the current step");
                cancel.cancel();
            }
        }
    });

    let args = Args::parse();
    if let Err(err) = args.run(cancel).await {
        eprintln!("Error: {err:?}");
        std::process::exit(1);
    }
}
