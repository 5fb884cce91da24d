//! Payroll configuration.
use crate::constants::{
    DEFAULT_DATABASE_URL, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL, DEFAULT_THROTTLE_WINDOW,
    DEFAULT_TOKEN,
};
use alloy::primitives::Address;
use eyre::{Context, OptionExt};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};
use url::Url;

/// Payroll configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollConfig {
    /// Ledger configuration.
    #[serde(default)]
    pub ledger: LedgerConfig,
    /// Disbursement configuration.
    #[serde(default)]
    pub disbursement: DisbursementConfig,
    /// The database URL.
    ///
    /// Use `sqlite::memory:` to keep everything in memory.
    #[serde(default = "default_database_url")]
    pub database_url: String,
    /// Secrets.
    #[serde(skip_serializing, default)]
    pub secrets: SecretsConfig,
}

impl Default for PayrollConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerConfig::default(),
            disbursement: DisbursementConfig::default(),
            database_url: default_database_url(),
            secrets: SecretsConfig::default(),
        }
    }
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}

impl PayrollConfig {
    /// Sets the ledger node endpoint.
    pub fn with_endpoint(mut self, endpoint: Option<Url>) -> Self {
        if let Some(endpoint) = endpoint {
            self.ledger.endpoint = Some(endpoint);
        }
        self
    }

    /// Sets the token contract to pay in.
    pub fn with_token(mut self, token: Option<Address>) -> Self {
        if let Some(token) = token {
            self.disbursement.token = token;
        }
        self
    }

    /// Sets the window the payments of a batch are spread over.
    pub fn with_throttle_window(mut self, window: Option<Duration>) -> Self {
        if let Some(window) = window {
            self.disbursement.throttle_window = window;
        }
        self
    }

    /// Sets the interval between two receipt lookups.
    pub fn with_poll_interval(mut self, interval: Option<Duration>) -> Self {
        if let Some(interval) = interval {
            self.disbursement.poll_interval = interval;
        }
        self
    }

    /// Sets the number of receipt lookups per transfer.
    pub fn with_poll_attempts(mut self, attempts: Option<u32>) -> Self {
        if let Some(attempts) = attempts {
            self.disbursement.poll_attempts = attempts;
        }
        self
    }

    /// Sets the database URL.
    pub fn with_database_url(mut self, database_url: Option<String>) -> Self {
        if let Some(database_url) = database_url {
            self.database_url = database_url;
        }
        self
    }

    /// Sets the signing keys. An empty list keeps the current keys.
    pub fn with_signing_keys(mut self, keys: Vec<String>) -> Self {
        if !keys.is_empty() {
            self.secrets.signing_keys = keys;
        }
        self
    }

    /// Checks that everything needed to send transfers is present.
    pub fn validate(&self) -> eyre::Result<()> {
        self.ledger.endpoint.as_ref().ok_or_eyre("missing ledger endpoint")?;
        if self.secrets.signing_keys.is_empty() {
            eyre::bail!("no signing keys configured");
        }
        if self.disbursement.poll_attempts == 0 {
            eyre::bail!("poll attempts must be at least 1");
        }
        Ok(())
    }

    /// Load from a YAML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> eyre::Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read config file: {}", path.display()))?;
        let config = serde_yaml::from_reader(&file)
            .wrap_err_with(|| format!("failed to parse config file: {}", path.display()))?;
        Ok(config)
    }

    /// Save to a YAML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> eyre::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Ledger configuration.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    /// JSON-RPC endpoint of the ledger node.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<Url>,
}

/// How transfers are paced and confirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisbursementConfig {
    /// Token contract payments are made in.
    pub token: Address,
    /// Window the payments of a batch are spread over.
    #[serde(with = "crate::serde::duration")]
    pub throttle_window: Duration,
    /// Interval between two receipt lookups.
    #[serde(with = "crate::serde::duration")]
    pub poll_interval: Duration,
    /// Number of receipt lookups before a transfer is left unresolved.
    pub poll_attempts: u32,
}

impl Default for DisbursementConfig {
    fn default() -> Self {
        Self {
            token: DEFAULT_TOKEN,
            throttle_window: DEFAULT_THROTTLE_WINDOW,
            poll_interval: DEFAULT_POLL_INTERVAL,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
        }
    }
}

/// Secrets (kept out of serialized output).
#[derive(Clone, Default, Deserialize)]
pub struct SecretsConfig {
    /// Hex encoded private keys, in the order they are tried.
    #[serde(default)]
    pub signing_keys: Vec<String>,
}

impl std::fmt::Debug for SecretsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretsConfig")
            .field("signing_keys", &format_args!("[{} redacted]", self.signing_keys.len()))
            .finish()
    }
}
