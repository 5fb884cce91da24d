//! Helpers for serde.

pub mod duration;
