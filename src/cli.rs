//! # Payroll CLI
use crate::{
    config::PayrollConfig,
    gateway::{LedgerGateway, RpcGateway},
    lock::RunLock,
    payroll::{Payroll, RunSummary},
    signers::DynSigner,
    storage::{PayrollStorage, StorageApi},
    types::{NewPayee, parse_address},
};
use alloy::primitives::{Address, U256};
use clap::{Parser, Subcommand};
use eyre::{Context, OptionExt};
use std::{
    io::{BufRead, Write},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use tokio_util::sync::CancellationToken;
use tracing::info;
use url::Url;

/// Pays every payee on the roster in an ERC-20 token, and resumes interrupted runs.
#[derive(Debug, Parser)]
#[command(author, about = "Payroll", long_about = None)]
pub struct Args {
    /// The configuration file.
    ///
    /// If missing, a default one will be used and stored in the working directory under
    /// `payroll.yaml`.
    #[arg(long, value_name = "CONFIG", env = "PAYROLL_CONFIG", default_value = "payroll.yaml")]
    pub config: PathBuf,
    /// The RPC endpoint of the ledger node.
    #[arg(long, value_name = "RPC_ENDPOINT", env = "PAYROLL_ENDPOINT")]
    pub endpoint: Option<Url>,
    /// A private key to send transfers from. Keys are tried in the order they are given.
    #[arg(
        long = "signing-key",
        value_name = "KEY",
        env = "PAYROLL_SIGNING_KEYS",
        value_delimiter = ',',
        hide_env_values = true
    )]
    pub signing_keys: Vec<String>,
    /// The database URL.
    #[arg(long = "database-url", value_name = "URL", env = "PAYROLL_DATABASE_URL")]
    pub database_url: Option<String>,
    /// The token contract to pay in.
    #[arg(long, value_name = "ADDRESS")]
    pub token: Option<Address>,
    /// The window the payments of a batch are spread over.
    #[arg(long = "throttle-window", value_name = "SECONDS", value_parser = parse_duration_secs)]
    pub throttle_window: Option<Duration>,
    /// The interval between two receipt lookups.
    #[arg(long = "poll-interval", value_name = "SECONDS", value_parser = parse_duration_secs)]
    pub poll_interval: Option<Duration>,
    /// The number of receipt lookups before a transfer is left for a later repay.
    #[arg(long = "poll-attempts", value_name = "NUM")]
    pub poll_attempts: Option<u32>,
    /// Skip the confirmation prompt.
    #[arg(long, short)]
    pub yes: bool,
    /// What to do. Starts a new payroll cycle if omitted.
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Payroll commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resume batches that were started but not finished.
    Repay,
    /// Manage the roster.
    #[command(subcommand)]
    Payees(PayeesCommand),
}

/// Roster commands.
#[derive(Debug, Subcommand)]
pub enum PayeesCommand {
    /// List the roster.
    #[command(alias = "ls")]
    List,
    /// Add a payee to the roster.
    Add {
        /// Display name of the payee.
        #[arg(long)]
        name: String,
        /// Address the payee is paid to.
        #[arg(long)]
        address: String,
        /// Amount paid every cycle, in the smallest token unit.
        #[arg(long)]
        amount: U256,
    },
}

impl Args {
    /// Run the command.
    pub async fn run(mut self, cancel: CancellationToken) -> eyre::Result<()> {
        let command = self.command.take();
        let yes = self.yes;
        let config = self.load_config()?;

        let storage = PayrollStorage::connect(&config.database_url)
            .await
            .wrap_err_with(|| format!("failed to open database: {}", config.database_url))?;

        match command {
            Some(Command::Payees(command)) => command.run(&storage).await,
            Some(Command::Repay) => {
                if yes || confirm("Repay unfinished salaries (y/N): ")? {
                    let summary = payroll(config, storage, cancel).await?.repay().await?;
                    report(&summary);
                }
                Ok(())
            }
            None => {
                if yes || confirm("Pay a salary (y/N): ")? {
                    let summary = payroll(config, storage, cancel).await?.pay().await?;
                    report(&summary);
                }
                Ok(())
            }
        }
    }

    /// Loads the configuration file, creating it from the arguments if it does not exist.
    fn load_config(self) -> eyre::Result<PayrollConfig> {
        let path = self.config.clone();
        if !path.exists() {
            let config = self.merge_payroll_config(PayrollConfig::default());
            config.save_to_file(&path)?;
            Ok(config)
        } else {
            Ok(self.merge_payroll_config(PayrollConfig::load_from_file(&path)?))
        }
    }

    /// Merges [`Args`] values into an existing [`PayrollConfig`] instance.
    pub fn merge_payroll_config(self, config: PayrollConfig) -> PayrollConfig {
        config
            .with_endpoint(self.endpoint)
            .with_signing_keys(self.signing_keys)
            .with_database_url(self.database_url)
            .with_token(self.token)
            .with_throttle_window(self.throttle_window)
            .with_poll_interval(self.poll_interval)
            .with_poll_attempts(self.poll_attempts)
    }
}

impl PayeesCommand {
    async fn run(self, storage: &PayrollStorage) -> eyre::Result<()> {
        match self {
            PayeesCommand::List => {
                for payee in storage.read_payees().await? {
                    println!("{}\t{}\t{}\t{}", payee.id, payee.name, payee.address, payee.amount);
                }
            }
            PayeesCommand::Add { name, address, amount } => {
                parse_address(&address)?;
                let payee = storage.write_payee(&NewPayee { name, address, amount }).await?;
                println!("Added payee {} ({})", payee.id, payee.name);
            }
        }
        Ok(())
    }
}

/// Builds a [`Payroll`] from a validated configuration.
async fn payroll(
    config: PayrollConfig,
    storage: PayrollStorage,
    cancel: CancellationToken,
) -> eyre::Result<Payroll> {
    config.validate()?;

    let signers = DynSigner::load_all(&config.secrets.signing_keys)?;
    let endpoint = config.ledger.endpoint.clone().ok_or_eyre("missing ledger endpoint")?;
    let gateway = RpcGateway::connect(endpoint);
    let chain_id = gateway.chain_id().await.wrap_err("failed to reach ledger node")?;

    info!(
        chain_id,
        token = %config.disbursement.token,
        signers = ?signers.iter().map(|signer| signer.address()).collect::<Vec<_>>(),
        "Connected to ledger"
    );

    Ok(Payroll::new(storage, Arc::new(gateway), signers, &config.disbursement)
        .with_run_lock(RunLock::path_for_database(&config.database_url))
        .with_cancellation(cancel))
}

fn report(summary: &RunSummary) {
    println!(
        "{} batch(es): {} paid, {} failed, {} skipped",
        summary.batches, summary.paid, summary.failed, summary.skipped
    );
    if !summary.is_complete() {
        println!("Some payments are unfinished, run `payroll repay` to retry them");
    }
}

/// Asks a yes/no question on stdin. Anything but `y` or `yes` is a no.
fn confirm(question: &str) -> eyre::Result<bool> {
    print!("{question}");
    std::io::stdout().flush()?;

    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(is_yes(&answer))
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

/// Parses a string representing seconds to a [`Duration`].
fn parse_duration_secs(arg: &str) -> Result<Duration, std::num::ParseIntError> {
    let seconds = arg.parse()?;
    Ok(Duration::from_secs(seconds))
}
