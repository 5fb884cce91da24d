use super::Status;
use chrono::{DateTime, Utc};
use std::fmt;

/// Identifier of a [`Batch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BatchId(pub i64);

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single payroll cycle.
///
/// A batch is created together with one [`Payment`](super::Payment) per payee on the roster and
/// is never deleted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    /// Id of the batch.
    pub id: BatchId,
    /// Current status.
    pub status: Status,
    /// When the batch was created.
    pub created_at: DateTime<Utc>,
}
