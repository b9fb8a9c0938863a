use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::types::address::Address;
use crate::types::pair::PairKey;
use crate::types::Amount;

/// Fee denominator: fees are expressed per mille
pub const FEE_DENOMINATOR: u64 = 1_000;
/// Swap fee charged on input (0.3%)
pub const DEFAULT_FEE_PER_MILLE: u64 = 3;

/// Reserves and liquidity shares of a constant-product pool
///
/// `total_liquidity` is zero exactly when both reserves are zero, and always
/// equals the sum of `positions`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pool {
    pub pair: PairKey,
    pub reserve0: Amount,
    pub reserve1: Amount,
    pub total_liquidity: Amount,
    /// Token whose base units liquidity is denominated in: the `token_x` of
    /// the deposit that bootstrapped the pool. `None` while empty.
    #[serde(default)]
    pub liquidity_token: Option<Address>,
    /// Liquidity held per provider
    pub positions: BTreeMap<Address, Amount>,
}

impl Pool {
    pub fn new(pair: PairKey) -> Self {
        Pool {
            pair,
            reserve0: Amount::ZERO,
            reserve1: Amount::ZERO,
            total_liquidity: Amount::ZERO,
            liquidity_token: None,
            positions: BTreeMap::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.total_liquidity.is_zero()
    }

    /// Reserve of `token`, if it belongs to the pair
    pub fn reserve_of(&self, token: &Address) -> Option<Amount> {
        if *token == self.pair.token0() {
            Some(self.reserve0)
        } else if *token == self.pair.token1() {
            Some(self.reserve1)
        } else {
            None
        }
    }

    /// Reserves oriented as `(reserve of token_in, reserve of the other token)`
    pub fn reserves_for(&self, token_in: &Address) -> Option<(Amount, Amount)> {
        if *token_in == self.pair.token0() {
            Some((self.reserve0, self.reserve1))
        } else if *token_in == self.pair.token1() {
            Some((self.reserve1, self.reserve0))
        } else {
            None
        }
    }

    /// Write back reserves oriented the same way `reserves_for` returned them
    pub fn set_reserves_for(&mut self, token_in: &Address, reserve_in: Amount, reserve_out: Amount) {
        if *token_in == self.pair.token0() {
            self.reserve0 = reserve_in;
            self.reserve1 = reserve_out;
        } else {
            self.reserve1 = reserve_in;
            self.reserve0 = reserve_out;
        }
    }

    pub fn position(&self, provider: &Address) -> Amount {
        self.positions.get(provider).copied().unwrap_or(Amount::ZERO)
    }

    /// Set a provider's liquidity, dropping the entry when it reaches zero
    pub fn set_position(&mut self, provider: Address, liquidity: Amount) {
        if liquidity.is_zero() {
            self.positions.remove(&provider);
        } else {
            self.positions.insert(provider, liquidity);
        }
    }

    pub fn positions(&self) -> impl Iterator<Item = LiquidityPosition> + '_ {
        self.positions.iter().map(|(provider, liquidity)| LiquidityPosition {
            provider: *provider,
            pair: self.pair,
            liquidity: *liquidity,
        })
    }

    /// Check the reserve/liquidity invariants
    pub fn is_consistent(&self) -> bool {
        let empty = self.total_liquidity.is_zero();
        let reserves_empty = self.reserve0.is_zero() && self.reserve1.is_zero();
        if empty != reserves_empty {
            return false;
        }
        if let Some(token) = self.liquidity_token {
            if empty || self.reserve_of(&token).is_none() {
                return false;
            }
        }
        let mut sum = Amount::ZERO;
        for liquidity in self.positions.values() {
            match sum.checked_add(*liquidity) {
                Some(s) => sum = s,
                None => return false,
            }
        }
        sum == self.total_liquidity
    }
}

/// A provider's share of one pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquidityPosition {
    pub provider: Address,
    pub pair: PairKey,
    pub liquidity: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_pool() -> (Pool, Address, Address) {
        let a = Address::new([1u8; 20]);
        let b = Address::new([2u8; 20]);
        (Pool::new(PairKey::new(a, b).unwrap()), a, b)
    }

    #[test]
    fn test_new_pool_is_empty_and_consistent() {
        let (pool, _, _) = test_pool();
        assert!(pool.is_empty());
        assert!(pool.is_consistent());
    }

    #[test]
    fn test_reserves_for_orientation() {
        let (mut pool, a, b) = test_pool();
        pool.reserve0 = Amount::from(100u64);
        pool.reserve1 = Amount::from(200u64);

        assert_eq!(pool.reserves_for(&a), Some((Amount::from(100u64), Amount::from(200u64))));
        assert_eq!(pool.reserves_for(&b), Some((Amount::from(200u64), Amount::from(100u64))));
        assert_eq!(pool.reserves_for(&Address::derive("c")), None);

        pool.set_reserves_for(&b, Amount::from(210u64), Amount::from(95u64));
        assert_eq!(pool.reserve0, Amount::from(95u64));
        assert_eq!(pool.reserve1, Amount::from(210u64));
    }

    #[test]
    fn test_zero_position_removed() {
        let (mut pool, _, _) = test_pool();
        let lp = Address::derive("lp");
        pool.set_position(lp, Amount::from(5u64));
        assert_eq!(pool.position(&lp), Amount::from(5u64));
        pool.set_position(lp, Amount::ZERO);
        assert!(pool.positions.is_empty());
    }

    #[test]
    fn test_inconsistent_pool_detected() {
        let (mut pool, _, _) = test_pool();
        pool.reserve0 = Amount::from(1u64);
        assert!(!pool.is_consistent());

        pool.reserve1 = Amount::from(1u64);
        pool.total_liquidity = Amount::from(1u64);
        assert!(!pool.is_consistent());

        pool.set_position(Address::derive("lp"), Amount::from(1u64));
        assert!(pool.is_consistent());

        pool.liquidity_token = Some(Address::derive("c"));
        assert!(!pool.is_consistent());
    }

    #[test]
    fn test_liquidity_token_requires_liquidity() {
        let (mut pool, a, _) = test_pool();
        pool.liquidity_token = Some(a);
        assert!(!pool.is_consistent());

        pool.reserve0 = Amount::from(10u64);
        pool.reserve1 = Amount::from(10u64);
        pool.total_liquidity = Amount::from(10u64);
        pool.set_position(Address::derive("lp"), Amount::from(10u64));
        assert!(pool.is_consistent());
    }
}
