use simpledex_core::{Address, Amount, DexEvent};
use simpledex_state::{Ledger, Transfer};
use tracing::debug;

use crate::engine::Dex;
use crate::error::DexError;
use crate::math::{liquidity_share, liquidity_to_mint};
use crate::registry::{pair_key, PoolHandle};

impl<L: Ledger> Dex<L> {
    /// Deposit `amount_x` of `token_x` and `amount_y` of `token_y`
    ///
    /// Returns the liquidity credited to `provider`. Both amounts move into
    /// custody in full; whatever exceeds the current pool ratio stays in the
    /// reserves.
    pub fn add_liquidity(
        &self,
        provider: &Address,
        token_x: &Address,
        token_y: &Address,
        amount_x: Amount,
        amount_y: Amount,
    ) -> Result<Amount, DexError> {
        let pair = pair_key(token_x, token_y)?;
        if amount_x.is_zero() || amount_y.is_zero() {
            return Err(DexError::ZeroAmount);
        }

        let handle = self.registry.entry(pair);
        let result = self.deposit(&handle, provider, token_x, token_y, amount_x, amount_y);
        if result.is_err() {
            drop(handle);
            self.registry.prune(&pair);
        }
        result
    }

    fn deposit(
        &self,
        handle: &PoolHandle,
        provider: &Address,
        token_x: &Address,
        token_y: &Address,
        amount_x: Amount,
        amount_y: Amount,
    ) -> Result<Amount, DexError> {
        let mut pool = handle.lock();

        let (reserve_x, reserve_y) = pool.reserves_for(token_x).ok_or(DexError::InvalidPair)?;
        let minted = liquidity_to_mint(amount_x, amount_y, reserve_x, reserve_y, pool.total_liquidity)?;

        let new_reserve_x = reserve_x.checked_add(amount_x).ok_or(DexError::Overflow)?;
        let new_reserve_y = reserve_y.checked_add(amount_y).ok_or(DexError::Overflow)?;
        let new_total = pool
            .total_liquidity
            .checked_add(minted)
            .ok_or(DexError::Overflow)?;
        let new_position = pool
            .position(provider)
            .checked_add(minted)
            .ok_or(DexError::Overflow)?;

        let custody = self.config.custody;
        self.ledger.execute(
            &custody,
            &[
                Transfer::new(*token_x, *provider, custody, amount_x),
                Transfer::new(*token_y, *provider, custody, amount_y),
            ],
        )?;

        // Liquidity is denominated in the bootstrapping token's base units
        if pool.total_liquidity.is_zero() {
            pool.liquidity_token = Some(*token_x);
        }
        pool.set_reserves_for(token_x, new_reserve_x, new_reserve_y);
        pool.total_liquidity = new_total;
        pool.set_position(*provider, new_position);

        debug!(
            "Added liquidity to {}: {} / {} minted {} for {}",
            pool.pair, amount_x, amount_y, minted, provider
        );

        self.emit(DexEvent::LiquidityAdded {
            provider: *provider,
            token_x: *token_x,
            token_y: *token_y,
            amount_x,
            amount_y,
        });

        Ok(minted)
    }

    /// Burn `liquidity` of `provider`'s position for its share of reserves
    ///
    /// Returns the amounts paid out, in caller order.
    pub fn remove_liquidity(
        &self,
        provider: &Address,
        token_x: &Address,
        token_y: &Address,
        liquidity: Amount,
    ) -> Result<(Amount, Amount), DexError> {
        self.remove_liquidity_with_min(
            provider,
            token_x,
            token_y,
            liquidity,
            Amount::ZERO,
            Amount::ZERO,
        )
    }

    /// `remove_liquidity` that fails unless both outputs reach their minimums
    pub fn remove_liquidity_with_min(
        &self,
        provider: &Address,
        token_x: &Address,
        token_y: &Address,
        liquidity: Amount,
        min_x: Amount,
        min_y: Amount,
    ) -> Result<(Amount, Amount), DexError> {
        let pair = pair_key(token_x, token_y)?;
        if liquidity.is_zero() {
            return Err(DexError::ZeroAmount);
        }

        let handle = self
            .registry
            .pool(&pair)
            .ok_or(DexError::InsufficientLiquidity)?;
        let mut pool = handle.lock();

        let position = pool.position(provider);
        if liquidity > position || liquidity > pool.total_liquidity {
            return Err(DexError::InsufficientLiquidity);
        }

        let (reserve_x, reserve_y) = pool.reserves_for(token_x).ok_or(DexError::InvalidPair)?;
        let (amount_x, amount_y) =
            liquidity_share(liquidity, reserve_x, reserve_y, pool.total_liquidity)?;
        if amount_x < min_x {
            return Err(DexError::SlippageExceeded {
                min: min_x,
                actual: amount_x,
            });
        }
        if amount_y < min_y {
            return Err(DexError::SlippageExceeded {
                min: min_y,
                actual: amount_y,
            });
        }

        // Shares floor, so neither output can exceed its reserve
        let new_reserve_x = reserve_x - amount_x;
        let new_reserve_y = reserve_y - amount_y;
        let new_total = pool.total_liquidity - liquidity;

        let custody = self.config.custody;
        self.ledger.execute(
            &custody,
            &[
                Transfer::new(*token_x, custody, *provider, amount_x),
                Transfer::new(*token_y, custody, *provider, amount_y),
            ],
        )?;

        pool.set_reserves_for(token_x, new_reserve_x, new_reserve_y);
        pool.total_liquidity = new_total;
        if new_total.is_zero() {
            pool.liquidity_token = None;
        }
        pool.set_position(*provider, position - liquidity);

        debug!(
            "Removed {} liquidity from {}: {} / {} to {}",
            liquidity, pair, amount_x, amount_y, provider
        );

        self.emit(DexEvent::LiquidityRemoved {
            provider: *provider,
            token_x: *token_x,
            token_y: *token_y,
            amount_x,
            amount_y,
        });

        Ok((amount_x, amount_y))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::engine::DexConfig;
    use crate::events::EventLog;
    use simpledex_state::MemoryLedger;

    const ETHER: u128 = 1_000_000_000_000_000_000;

    fn eth(n: u128) -> Amount {
        Amount::from(n * ETHER)
    }

    struct Setup {
        dex: Dex<MemoryLedger>,
        log: Arc<EventLog>,
        a: Address,
        b: Address,
        alice: Address,
    }

    fn setup() -> Setup {
        let ledger = MemoryLedger::new();
        let config = DexConfig::default();
        let a = Address::derive("token-a");
        let b = Address::derive("token-b");
        let alice = Address::derive("alice");
        for token in [a, b] {
            ledger.mint(&token, &alice, eth(10_000)).unwrap();
            ledger.approve(&token, &alice, &config.custody, Amount::MAX);
        }
        let log = Arc::new(EventLog::new());
        let dex = Dex::new(config, ledger).unwrap().with_sink(log.clone());
        Setup {
            dex,
            log,
            a,
            b,
            alice,
        }
    }

    #[test]
    fn test_bootstrap_mints_amount_x() {
        let s = setup();
        let minted = s
            .dex
            .add_liquidity(&s.alice, &s.a, &s.b, eth(1000), eth(1000))
            .unwrap();

        assert_eq!(minted, eth(1000));
        assert_eq!(s.dex.get_liquidity(&s.a, &s.b).unwrap(), eth(1000));
        assert_eq!(s.dex.get_liquidity(&s.b, &s.a).unwrap(), eth(1000));
        assert_eq!(s.dex.ledger().balance_of(&s.a, &s.dex.custody()), eth(1000));
        assert_eq!(s.dex.ledger().balance_of(&s.a, &s.alice), eth(9000));
    }

    #[test]
    fn test_second_deposit_in_ratio() {
        let s = setup();
        s.dex
            .add_liquidity(&s.alice, &s.a, &s.b, eth(1000), eth(1000))
            .unwrap();
        let minted = s
            .dex
            .add_liquidity(&s.alice, &s.b, &s.a, eth(500), eth(500))
            .unwrap();

        assert_eq!(minted, eth(500));
        assert_eq!(s.dex.get_liquidity(&s.a, &s.b).unwrap(), eth(1500));
        assert_eq!(s.dex.position_of(&s.alice, &s.a, &s.b).unwrap(), eth(1500));
    }

    #[test]
    fn test_zero_amount_rejected() {
        let s = setup();
        assert_eq!(
            s.dex.add_liquidity(&s.alice, &s.a, &s.b, Amount::ZERO, eth(1)),
            Err(DexError::ZeroAmount)
        );
        assert_eq!(
            s.dex.add_liquidity(&s.alice, &s.a, &s.a, eth(1), eth(1)),
            Err(DexError::InvalidPair)
        );
    }

    #[test]
    fn test_missing_allowance_leaves_state_untouched() {
        let s = setup();
        let bob = Address::derive("bob");
        s.dex.ledger().mint(&s.a, &bob, eth(10)).unwrap();
        s.dex.ledger().mint(&s.b, &bob, eth(10)).unwrap();
        s.dex
            .ledger()
            .approve(&s.a, &bob, &s.dex.custody(), eth(10));

        let err = s
            .dex
            .add_liquidity(&bob, &s.a, &s.b, eth(10), eth(10))
            .unwrap_err();

        assert!(matches!(err, DexError::InsufficientAllowance { .. }));
        assert_eq!(s.dex.get_liquidity(&s.a, &s.b).unwrap(), Amount::ZERO);
        let pair = pair_key(&s.a, &s.b).unwrap();
        assert!(s.dex.registry().pool(&pair).is_none());
        assert_eq!(s.dex.ledger().balance_of(&s.a, &bob), eth(10));
        assert_eq!(
            s.dex.ledger().allowance(&s.a, &bob, &s.dex.custody()),
            eth(10)
        );
        assert!(s.log.is_empty());
    }

    #[test]
    fn test_remove_half() {
        let s = setup();
        s.dex
            .add_liquidity(&s.alice, &s.a, &s.b, eth(1000), eth(2000))
            .unwrap();

        let (out_a, out_b) = s
            .dex
            .remove_liquidity(&s.alice, &s.a, &s.b, eth(500))
            .unwrap();

        assert_eq!((out_a, out_b), (eth(500), eth(1000)));
        assert_eq!(s.dex.get_liquidity(&s.a, &s.b).unwrap(), eth(500));
        assert_eq!(
            s.dex.get_reserves(&s.a, &s.b).unwrap(),
            (eth(500), eth(1000))
        );
        assert_eq!(
            s.log.last(),
            Some(DexEvent::LiquidityRemoved {
                provider: s.alice,
                token_x: s.a,
                token_y: s.b,
                amount_x: eth(500),
                amount_y: eth(1000),
            })
        );
    }

    #[test]
    fn test_liquidity_denominated_in_bootstrap_token() {
        let s = setup();
        s.dex
            .add_liquidity(&s.alice, &s.b, &s.a, eth(1000), eth(1000))
            .unwrap();
        assert_eq!(s.dex.liquidity_token(&s.a, &s.b).unwrap(), Some(s.b));

        // Later deposits keep the bootstrap denomination
        s.dex
            .add_liquidity(&s.alice, &s.a, &s.b, eth(10), eth(10))
            .unwrap();
        assert_eq!(s.dex.liquidity_token(&s.b, &s.a).unwrap(), Some(s.b));

        s.dex
            .remove_liquidity(&s.alice, &s.a, &s.b, eth(1010))
            .unwrap();
        assert_eq!(s.dex.liquidity_token(&s.a, &s.b).unwrap(), None);
    }

    #[test]
    fn test_failed_add_on_existing_pool_keeps_entry() {
        let s = setup();
        s.dex
            .add_liquidity(&s.alice, &s.a, &s.b, eth(1000), eth(1000))
            .unwrap();

        assert!(s
            .dex
            .add_liquidity(&s.alice, &s.a, &s.b, eth(100_000), eth(1))
            .is_err());
        assert_eq!(s.dex.get_liquidity(&s.a, &s.b).unwrap(), eth(1000));
        assert_eq!(s.dex.registry().len(), 1);
    }

    #[test]
    fn test_remove_everything_empties_pool() {
        let s = setup();
        s.dex
            .add_liquidity(&s.alice, &s.a, &s.b, eth(1000), eth(1000))
            .unwrap();
        s.dex
            .remove_liquidity(&s.alice, &s.a, &s.b, eth(1000))
            .unwrap();

        assert_eq!(s.dex.get_liquidity(&s.a, &s.b).unwrap(), Amount::ZERO);
        assert!(s.dex.pools().is_empty());
        assert_eq!(s.dex.ledger().balance_of(&s.a, &s.alice), eth(10_000));
    }

    #[test]
    fn test_over_removal_rejected() {
        let s = setup();
        s.dex
            .add_liquidity(&s.alice, &s.a, &s.b, eth(1000), eth(1000))
            .unwrap();
        let before = s.dex.pools();

        assert_eq!(
            s.dex.remove_liquidity(&s.alice, &s.a, &s.b, eth(1001)),
            Err(DexError::InsufficientLiquidity)
        );
        assert_eq!(
            s.dex
                .remove_liquidity(&Address::derive("bob"), &s.a, &s.b, eth(1)),
            Err(DexError::InsufficientLiquidity)
        );
        assert_eq!(s.dex.pools(), before);
    }

    #[test]
    fn test_remove_from_unknown_pair() {
        let s = setup();
        assert_eq!(
            s.dex.remove_liquidity(&s.alice, &s.a, &s.b, eth(1)),
            Err(DexError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_remove_with_min() {
        let s = setup();
        s.dex
            .add_liquidity(&s.alice, &s.a, &s.b, eth(1000), eth(1000))
            .unwrap();

        let err = s
            .dex
            .remove_liquidity_with_min(&s.alice, &s.a, &s.b, eth(100), eth(100), eth(101))
            .unwrap_err();
        assert_eq!(
            err,
            DexError::SlippageExceeded {
                min: eth(101),
                actual: eth(100)
            }
        );
        assert_eq!(s.dex.get_liquidity(&s.a, &s.b).unwrap(), eth(1000));
    }
}
