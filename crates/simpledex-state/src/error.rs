use simpledex_core::{Address, Amount};
use thiserror::Error;

/// Failures reported by a ledger when moving tokens
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("Insufficient balance of {token} for {account}: have {have}, need {need}")]
    InsufficientBalance {
        token: Address,
        account: Address,
        have: Amount,
        need: Amount,
    },

    #[error("Insufficient allowance of {token} from {owner} to {spender}: allowance {allowance}, need {need}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        allowance: Amount,
        need: Amount,
    },

    #[error("Balance overflow for token {token}")]
    Overflow { token: Address },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Inconsistent pool in snapshot: {0}")]
    InconsistentPool(String),

    #[error("Core error: {0}")]
    Core(#[from] simpledex_core::CoreError),
}
