use simpledex_core::{Address, Amount};
use simpledex_state::LedgerError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DexError {
    #[error("Insufficient balance of {token} for {account}: have {have}, need {need}")]
    InsufficientBalance {
        token: Address,
        account: Address,
        have: Amount,
        need: Amount,
    },

    #[error("Insufficient allowance of {token} from {owner}: allowance {allowance}, need {need}")]
    InsufficientAllowance {
        token: Address,
        owner: Address,
        spender: Address,
        allowance: Amount,
        need: Amount,
    },

    #[error("Insufficient liquidity")]
    InsufficientLiquidity,

    #[error("Invalid pair: tokens must differ")]
    InvalidPair,

    #[error("Amount must be greater than zero")]
    ZeroAmount,

    #[error("Slippage exceeded: expected at least {min}, got {actual}")]
    SlippageExceeded { min: Amount, actual: Amount },

    #[error("Arithmetic overflow")]
    Overflow,

    #[error("Invalid fee: {0} per mille")]
    InvalidFee(u64),

    #[error("Constant product would decrease")]
    InvariantViolation,
}

impl From<LedgerError> for DexError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientBalance {
                token,
                account,
                have,
                need,
            } => DexError::InsufficientBalance {
                token,
                account,
                have,
                need,
            },
            LedgerError::InsufficientAllowance {
                token,
                owner,
                spender,
                allowance,
                need,
            } => DexError::InsufficientAllowance {
                token,
                owner,
                spender,
                allowance,
                need,
            },
            LedgerError::Overflow { .. } => DexError::Overflow,
        }
    }
}
