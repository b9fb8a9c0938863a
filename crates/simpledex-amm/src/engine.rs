use std::sync::Arc;

use serde::{Deserialize, Serialize};
use simpledex_core::{Address, Amount, DexEvent, Pool, DEFAULT_FEE_PER_MILLE, FEE_DENOMINATOR};
use simpledex_state::Ledger;

use crate::error::DexError;
use crate::events::{EventSink, NullSink};
use crate::registry::PoolRegistry;

/// Label the default custody account is derived from
pub const DEFAULT_CUSTODY_LABEL: &str = "simpledex";

/// Engine parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DexConfig {
    /// Swap fee taken from the input, per mille
    pub fee_per_mille: u64,
    /// Ledger account holding every pool's reserves
    pub custody: Address,
}

impl Default for DexConfig {
    fn default() -> Self {
        DexConfig {
            fee_per_mille: DEFAULT_FEE_PER_MILLE,
            custody: Address::derive(DEFAULT_CUSTODY_LABEL),
        }
    }
}

impl DexConfig {
    pub fn validate(&self) -> Result<(), DexError> {
        if self.fee_per_mille >= FEE_DENOMINATOR {
            return Err(DexError::InvalidFee(self.fee_per_mille));
        }
        Ok(())
    }
}

/// Constant-product exchange over an external ledger
///
/// Liquidity and swap operations live in the `liquidity` and `swap`
/// modules. Each one holds the lock of the pair it touches for its whole
/// duration, then takes the ledger's lock for a single transfer batch.
pub struct Dex<L: Ledger> {
    pub(crate) config: DexConfig,
    pub(crate) registry: PoolRegistry,
    pub(crate) ledger: L,
    sink: Arc<dyn EventSink>,
}

impl<L: Ledger> Dex<L> {
    pub fn new(config: DexConfig, ledger: L) -> Result<Self, DexError> {
        config.validate()?;
        Ok(Dex {
            config,
            registry: PoolRegistry::new(),
            ledger,
            sink: Arc::new(NullSink),
        })
    }

    /// Replace the event sink
    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &DexConfig {
        &self.config
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn registry(&self) -> &PoolRegistry {
        &self.registry
    }

    pub fn custody(&self) -> Address {
        self.config.custody
    }

    /// Total liquidity of the pair, zero if it has none
    pub fn get_liquidity(&self, token_x: &Address, token_y: &Address) -> Result<Amount, DexError> {
        self.registry.get_liquidity(token_x, token_y)
    }

    /// Reserves in caller order
    pub fn get_reserves(
        &self,
        token_x: &Address,
        token_y: &Address,
    ) -> Result<(Amount, Amount), DexError> {
        self.registry.get_reserves(token_x, token_y)
    }

    pub fn position_of(
        &self,
        provider: &Address,
        token_x: &Address,
        token_y: &Address,
    ) -> Result<Amount, DexError> {
        self.registry.position_of(provider, token_x, token_y)
    }

    /// Token whose base units the pair's liquidity is counted in
    pub fn liquidity_token(
        &self,
        token_x: &Address,
        token_y: &Address,
    ) -> Result<Option<Address>, DexError> {
        self.registry.liquidity_token(token_x, token_y)
    }

    pub fn pools(&self) -> Vec<Pool> {
        self.registry.pools()
    }

    /// Load pools from a persisted snapshot, replacing current ones
    pub fn restore_pools(&self, pools: Vec<Pool>) -> Result<(), DexError> {
        self.registry.restore(pools)
    }

    pub(crate) fn emit(&self, event: DexEvent) {
        self.sink.emit(&event);
    }
}
