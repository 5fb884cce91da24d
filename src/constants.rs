//! Payroll constants.

use std::time::Duration;

/// Gas limit attached to every token transfer.
///
/// A plain ERC-20 `transfer` costs roughly 35k-65k gas depending on whether the recipient slot
/// is cold, so this leaves generous headroom without estimating.
pub const TRANSFER_GAS_LIMIT: u64 = 100_000;

/// Window the payments of a single batch are spread over.
///
/// The delay between two payments is this window divided by the number of outstanding payments
/// in the batch.
pub const DEFAULT_THROTTLE_WINDOW: Duration = Duration::from_secs(30 * 60);

/// Interval between two receipt lookups for a submitted transfer.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Number of receipt lookups before a submitted transfer is considered unresolved.
pub const DEFAULT_POLL_ATTEMPTS: u32 = 10;

/// Default location of the SQLite database.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://payroll.db?mode=rwc";

/// USDC on Ethereum mainnet.
pub const DEFAULT_TOKEN: alloy::primitives::Address =
    alloy::primitives::address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48");
