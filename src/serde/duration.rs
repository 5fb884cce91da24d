//! Serde helpers for [`Duration`] values expressed in whole seconds.

use serde::{Deserialize, Deserializer, Serializer};
use std::time::Duration;

/// Serializes a [`Duration`] as a number of seconds.
pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_u64(duration.as_secs())
}

/// Deserializes a [`Duration`] from a number of seconds.
pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    u64::deserialize(deserializer).map(Duration::from_secs)
}
