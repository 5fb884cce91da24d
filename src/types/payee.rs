use alloy::primitives::U256;
use std::fmt;

/// Identifier of a [`Payee`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PayeeId(pub i64);

impl fmt::Display for PayeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An entry of the roster.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payee {
    /// Id of the payee.
    pub id: PayeeId,
    /// Display name.
    pub name: String,
    /// Destination address as entered, validated when a payment is made.
    pub address: String,
    /// Amount paid every cycle, in the smallest token unit.
    pub amount: U256,
}

/// A payee that has not been stored yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayee {
    /// Display name.
    pub name: String,
    /// Destination address.
    pub address: String,
    /// Amount paid every cycle, in the smallest token unit.
    pub amount: U256,
}
