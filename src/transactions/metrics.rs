use metrics::{Counter, Histogram};
use metrics_derive::Metrics;

/// Metrics of a payroll run.
#[derive(Metrics)]
#[metrics(scope = "payroll")]
pub struct PayrollMetrics {
    /// Number of submitted transfers.
    pub sent: Counter,
    /// Number of confirmed payments.
    pub confirmed: Counter,
    /// Number of payments that failed and were left for a later run.
    pub failed: Counter,
    /// Number of payments skipped because of a malformed address.
    pub skipped: Counter,
    /// Time it takes to include transfers, in milliseconds.
    pub confirmation_time: Histogram,
}
