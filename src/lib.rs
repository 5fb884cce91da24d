//! # Payroll
//!
//! Library for paying a roster of payees in an ERC-20 token.
//!
//! A payroll cycle turns the roster into a [`types::Batch`] of [`types::Payment`]s, then sends one
//! token transfer per payment from the first signing key that can fund it. Progress is persisted
//! in a [`storage::PayrollStorage`] so interrupted runs can be resumed with
//! [`payroll::Payroll::repay`].

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod gateway;
pub mod lock;
pub mod payroll;
pub mod serde;
pub mod signers;
pub mod storage;
pub mod transactions;
pub mod types;
