//! Building, broadcasting and confirming token transfers.

mod metrics;
pub use metrics::PayrollMetrics;
mod monitor;
pub use monitor::ConfirmationPoller;
mod transfer;
pub use transfer::{SignedTransfer, TransferBuilder};
mod wallet;
pub use wallet::{SelectedSigner, WalletSelector};
