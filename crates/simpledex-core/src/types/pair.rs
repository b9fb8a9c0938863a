use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::CoreError;
use crate::hash::{hash_blake3, Hash};
use crate::types::address::Address;

/// Order-independent identity of a two-token pool
///
/// Always stored with `token0 < token1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PairKey {
    token0: Address,
    token1: Address,
}

impl PairKey {
    pub fn new(token_x: Address, token_y: Address) -> Result<Self, CoreError> {
        if token_x == token_y {
            return Err(CoreError::IdenticalTokens);
        }
        let (token0, token1) = if token_x < token_y {
            (token_x, token_y)
        } else {
            (token_y, token_x)
        };
        Ok(PairKey { token0, token1 })
    }

    pub fn token0(&self) -> Address {
        self.token0
    }

    pub fn token1(&self) -> Address {
        self.token1
    }

    pub fn pool_id(&self) -> Hash {
        compute_pool_id(self.token0, self.token1)
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.token0, self.token1)
    }
}

/// Sort token pair and align amounts
pub fn canonical_pair<T>(
    token_x: Address,
    token_y: Address,
    amount_x: T,
    amount_y: T,
) -> (Address, Address, T, T) {
    if token_x <= token_y {
        (token_x, token_y, amount_x, amount_y)
    } else {
        (token_y, token_x, amount_y, amount_x)
    }
}

/// Compute deterministic pool ID from token pair
pub fn compute_pool_id(token_x: Address, token_y: Address) -> Hash {
    let (a, b, _, _) = canonical_pair(token_x, token_y, (), ());
    let mut data = Vec::with_capacity(43);
    data.extend_from_slice(b"amm");
    data.extend_from_slice(a.as_bytes());
    data.extend_from_slice(b.as_bytes());
    hash_blake3(&data)
}
