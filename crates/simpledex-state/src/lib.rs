//! SimpleDEX State - Ledger adapter, storage and snapshots
//!
//! This crate provides the token ledger the engine moves value through,
//! storage abstractions, and persistence of engine state with a merkle
//! state root.

pub mod account;
pub mod error;
pub mod ledger;
pub mod merkle;
pub mod snapshot;
pub mod storage;

pub use account::Account;
pub use error::{LedgerError, StateError};
pub use ledger::{Ledger, MemoryLedger, Transfer};
pub use merkle::compute_state_root;
pub use snapshot::{Snapshot, StateStore};
pub use storage::{FileStorage, MemoryStorage, Storage};
