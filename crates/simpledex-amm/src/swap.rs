use simpledex_core::{Address, Amount, DexEvent};
use simpledex_state::{Ledger, Transfer};
use tracing::debug;

use crate::engine::Dex;
use crate::error::DexError;
use crate::math::{check_constant_product, get_amount_out};
use crate::registry::pair_key;

impl<L: Ledger> Dex<L> {
    /// Swap `amount_in` of `token_in` for `token_out`
    pub fn swap(
        &self,
        trader: &Address,
        token_in: &Address,
        token_out: &Address,
        amount_in: Amount,
    ) -> Result<Amount, DexError> {
        self.swap_with_min(trader, token_in, token_out, amount_in, Amount::ZERO)
    }

    /// Swap that fails if fewer than `min_out` tokens would come out
    pub fn swap_with_min(
        &self,
        trader: &Address,
        token_in: &Address,
        token_out: &Address,
        amount_in: Amount,
        min_out: Amount,
    ) -> Result<Amount, DexError> {
        let pair = pair_key(token_in, token_out)?;
        if amount_in.is_zero() {
            return Err(DexError::ZeroAmount);
        }

        let handle = self
            .registry
            .pool(&pair)
            .ok_or(DexError::InsufficientLiquidity)?;
        let mut pool = handle.lock();

        let (reserve_in, reserve_out) = pool.reserves_for(token_in).ok_or(DexError::InvalidPair)?;
        let amount_out = get_amount_out(amount_in, reserve_in, reserve_out, self.config.fee_per_mille)?;
        if amount_out.is_zero() || amount_out < min_out {
            return Err(DexError::SlippageExceeded {
                min: min_out,
                actual: amount_out,
            });
        }

        let new_reserve_in = reserve_in.checked_add(amount_in).ok_or(DexError::Overflow)?;
        let new_reserve_out = reserve_out - amount_out;
        check_constant_product(reserve_in, reserve_out, new_reserve_in, new_reserve_out)?;

        let custody = self.config.custody;
        self.ledger.execute(
            &custody,
            &[
                Transfer::new(*token_in, *trader, custody, amount_in),
                Transfer::new(*token_out, custody, *trader, amount_out),
            ],
        )?;

        pool.set_reserves_for(token_in, new_reserve_in, new_reserve_out);

        debug!(
            "Swap on {}: {} in, {} out for {}",
            pair, amount_in, amount_out, trader
        );

        self.emit(DexEvent::Swap {
            trader: *trader,
            token_in: *token_in,
            token_out: *token_out,
            amount_in,
            amount_out,
        });

        Ok(amount_out)
    }

    /// Output a swap would produce right now, without executing it
    pub fn quote(
        &self,
        token_in: &Address,
        token_out: &Address,
        amount_in: Amount,
    ) -> Result<Amount, DexError> {
        let (reserve_in, reserve_out) = self.registry.get_reserves(token_in, token_out)?;
        get_amount_out(amount_in, reserve_in, reserve_out, self.config.fee_per_mille)
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

    fn seeded_dex() -> (Dex<MemoryLedger>, Arc<EventLog>, Address, Address, Address) {
        let ledger = MemoryLedger::new();
        let config = DexConfig::default();
        let a = Address::derive("token-a");
        let b = Address::derive("token-b");
        let lp = Address::derive("lp");
        let trader = Address::derive("trader");
        for token in [a, b] {
            for account in [lp, trader] {
                ledger.mint(&token, &account, eth(10_000)).unwrap();
                ledger.approve(&token, &account, &config.custody, Amount::MAX);
            }
        }
        let log = Arc::new(EventLog::new());
        let dex = Dex::new(config, ledger).unwrap().with_sink(log.clone());
        dex.add_liquidity(&lp, &a, &b, eth(1000), eth(1000)).unwrap();
        log.drain();
        (dex, log, a, b, trader)
    }

    #[test]
    fn test_swap_updates_reserves_and_balances() {
        let (dex, log, a, b, trader) = seeded_dex();

        let out = dex.swap(&trader, &a, &b, eth(10)).unwrap();

        assert_eq!(out, Amount::from(9_871_580_343_970_612_988u128));
        assert_eq!(dex.get_reserves(&a, &b).unwrap(), (eth(1010), eth(1000) - out));
        assert_eq!(dex.ledger().balance_of(&a, &trader), eth(9990));
        assert_eq!(dex.ledger().balance_of(&b, &trader), eth(10_000) + out);
        assert_eq!(
            log.events(),
            vec![DexEvent::Swap {
                trader,
                token_in: a,
                token_out: b,
                amount_in: eth(10),
                amount_out: out,
            }]
        );
    }

    #[test]
    fn test_swap_preserves_constant_product() {
        let (dex, _, a, b, trader) = seeded_dex();
        let (ra, rb) = dex.get_reserves(&a, &b).unwrap();

        dex.swap(&trader, &b, &a, eth(250)).unwrap();

        let (ra2, rb2) = dex.get_reserves(&a, &b).unwrap();
        assert!(ra2 * rb2 >= ra * rb);
    }

    #[test]
    fn test_quote_matches_swap() {
        let (dex, _, a, b, trader) = seeded_dex();
        let quoted = dex.quote(&a, &b, eth(10)).unwrap();
        assert_eq!(dex.swap(&trader, &a, &b, eth(10)).unwrap(), quoted);
    }

    #[test]
    fn test_swap_without_pool() {
        let (dex, _, a, _, trader) = seeded_dex();
        let c = Address::derive("token-c");
        assert_eq!(
            dex.swap(&trader, &a, &c, eth(1)),
            Err(DexError::InsufficientLiquidity)
        );
    }

    #[test]
    fn test_swap_argument_checks() {
        let (dex, _, a, b, trader) = seeded_dex();
        assert_eq!(dex.swap(&trader, &a, &b, Amount::ZERO), Err(DexError::ZeroAmount));
        assert_eq!(dex.swap(&trader, &a, &a, eth(1)), Err(DexError::InvalidPair));
    }

    #[test]
    fn test_dust_swap_is_slippage() {
        let (dex, _, a, b, trader) = seeded_dex();
        assert_eq!(
            dex.swap(&trader, &a, &b, Amount::from(1u64)),
            Err(DexError::SlippageExceeded {
                min: Amount::ZERO,
                actual: Amount::ZERO
            })
        );
    }

    #[test]
    fn test_swap_with_min_rejects_short_output() {
        let (dex, log, a, b, trader) = seeded_dex();
        let before = dex.get_reserves(&a, &b).unwrap();

        let err = dex.swap_with_min(&trader, &a, &b, eth(10), eth(10)).unwrap_err();

        assert!(matches!(err, DexError::SlippageExceeded { .. }));
        assert_eq!(dex.get_reserves(&a, &b).unwrap(), before);
        assert!(log.is_empty());
    }

    #[test]
    fn test_insufficient_balance_rolls_back() {
        let (dex, log, a, b, _) = seeded_dex();
        let poor = Address::derive("poor");
        dex.ledger().approve(&a, &poor, &dex.custody(), Amount::MAX);
        let before = dex.get_reserves(&a, &b).unwrap();

        let err = dex.swap(&poor, &a, &b, eth(1)).unwrap_err();

        assert!(matches!(err, DexError::InsufficientBalance { .. }));
        assert_eq!(dex.get_reserves(&a, &b).unwrap(), before);
        assert_eq!(dex.ledger().balance_of(&b, &poor), Amount::ZERO);
        assert!(log.is_empty());
    }

    #[test]
    fn test_fee_free_config() {
        let ledger = MemoryLedger::new();
        let config = DexConfig {
            fee_per_mille: 0,
            ..DexConfig::default()
        };
        let a = Address::derive("token-a");
        let b = Address::derive("token-b");
        let user = Address::derive("user");
        for token in [a, b] {
            ledger.mint(&token, &user, eth(2000)).unwrap();
            ledger.approve(&token, &user, &config.custody, Amount::MAX);
        }
        let dex = Dex::new(config, ledger).unwrap();
        dex.add_liquidity(&user, &a, &b, eth(1000), eth(1000)).unwrap();

        // 1000 * 1000 / 2000 with no fee taken
        assert_eq!(dex.quote(&a, &b, eth(1000)).unwrap(), eth(500));
    }
}
