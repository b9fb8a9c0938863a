//! SimpleDEX Core - Identifiers, amounts, pool records and events
//!
//! This crate provides the foundational types shared by the ledger, the AMM
//! engine and the node binary.

pub mod error;
pub mod hash;
pub mod serialize;
pub mod types;
pub mod units;

pub use error::CoreError;
pub use hash::{hash_blake3, Hash};
pub use types::*;
pub use units::{format_amount, parse_amount};
