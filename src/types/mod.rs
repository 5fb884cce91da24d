//! Shared primitive types.

mod batch;
pub use batch::*;

mod erc20;
pub use erc20::*;

mod payee;
pub use payee::*;

mod payment;
pub use payment::*;

mod status;
pub use status::*;
