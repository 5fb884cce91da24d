use std::{fmt, str::FromStr};

/// Lifecycle status shared by batches and payments.
///
/// Statuses are ordered and only ever move forward: `Created -> Processing -> Done`. Writing the
/// current status again is allowed, which keeps resumed runs idempotent.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Status {
    /// Created but not yet picked up by a run.
    #[default]
    Created,
    /// Picked up by a run and not finished yet.
    Processing,
    /// Finished.
    Done,
}

impl Status {
    /// Whether a record in this status may be moved to `next`.
    pub fn can_transition_to(self, next: Self) -> bool {
        self <= next
    }

    /// Whether this is the terminal status.
    pub fn is_final(&self) -> bool {
        matches!(self, Self::Done)
    }

    /// Returns the status name as it is persisted.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Processing => "processing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown [`Status`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status {0:?}")]
pub struct UnknownStatus(pub String);

impl FromStr for Status {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "processing" => Ok(Self::Processing),
            "done" => Ok(Self::Done),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
