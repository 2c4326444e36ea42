//! # bankcheck-billing
//!
//! Billing domain for MyBankCheck: the static plan catalog, the
//! subscription/order row types mirrored from the payment platform, and
//! webhook signature verification.

pub mod catalog;
pub mod error;
pub mod types;
pub mod webhook;

pub use catalog::*;
pub use error::*;
pub use types::*;
