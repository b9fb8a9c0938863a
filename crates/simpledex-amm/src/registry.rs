use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use simpledex_core::{Address, Amount, PairKey, Pool};
use tracing::debug;

use crate::error::DexError;

/// Canonicalize a caller-supplied token pair
pub fn pair_key(token_x: &Address, token_y: &Address) -> Result<PairKey, DexError> {
    PairKey::new(*token_x, *token_y).map_err(|_| DexError::InvalidPair)
}

/// Shared handle to one pool, guarded by its own lock
#[derive(Debug, Clone)]
pub struct PoolHandle(Arc<Mutex<Pool>>);

impl PoolHandle {
    fn new(pool: Pool) -> Self {
        PoolHandle(Arc::new(Mutex::new(pool)))
    }

    /// Take the pool's exclusive lock
    ///
    /// Pool fields are only assigned after all fallible work is done, so a
    /// poisoned lock still guards a consistent pool.
    pub fn lock(&self) -> MutexGuard<'_, Pool> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Map from canonical pair to independently lockable pool records
#[derive(Debug, Default)]
pub struct PoolRegistry {
    pools: RwLock<BTreeMap<PairKey, PoolHandle>>,
}

impl PoolRegistry {
    pub fn new() -> Self {
        PoolRegistry::default()
    }

    /// Existing pool for the pair, or a new zero-reserve one
    pub fn get_or_create_pool(
        &self,
        token_x: &Address,
        token_y: &Address,
    ) -> Result<PoolHandle, DexError> {
        let pair = pair_key(token_x, token_y)?;
        Ok(self.entry(pair))
    }

    pub(crate) fn entry(&self, pair: PairKey) -> PoolHandle {
        if let Some(handle) = self.pool(&pair) {
            return handle;
        }
        let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        pools
            .entry(pair)
            .or_insert_with(|| {
                debug!("Created pool {} ({})", pair.pool_id(), pair);
                PoolHandle::new(Pool::new(pair))
            })
            .clone()
    }

    /// Drop the pair's entry if it is empty and no one else holds its handle
    ///
    /// Handles are only cloned under the map lock, so a reference count of
    /// one under the write lock means the entry is unreachable elsewhere.
    pub(crate) fn prune(&self, pair: &PairKey) {
        let mut pools = self.pools.write().unwrap_or_else(PoisonError::into_inner);
        let unused = pools
            .get(pair)
            .is_some_and(|handle| Arc::strong_count(&handle.0) == 1 && handle.lock().is_empty());
        if unused {
            pools.remove(pair);
            debug!("Dropped unused pool entry {}", pair);
        }
    }

    pub fn pool(&self, pair: &PairKey) -> Option<PoolHandle> {
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(pair)
            .cloned()
    }

    /// Total liquidity of the pair, zero if it was never created
    pub fn get_liquidity(&self, token_x: &Address, token_y: &Address) -> Result<Amount, DexError> {
        let pair = pair_key(token_x, token_y)?;
        Ok(self
            .pool(&pair)
            .map_or(Amount::ZERO, |handle| handle.lock().total_liquidity))
    }

    /// Reserves in caller order `(reserve of token_x, reserve of token_y)`
    pub fn get_reserves(
        &self,
        token_x: &Address,
        token_y: &Address,
    ) -> Result<(Amount, Amount), DexError> {
        let pair = pair_key(token_x, token_y)?;
        Ok(self
            .pool(&pair)
            .and_then(|handle| handle.lock().reserves_for(token_x))
            .unwrap_or((Amount::ZERO, Amount::ZERO)))
    }

    pub fn position_of(
        &self,
        provider: &Address,
        token_x: &Address,
        token_y: &Address,
    ) -> Result<Amount, DexError> {
        let pair = pair_key(token_x, token_y)?;
        Ok(self
            .pool(&pair)
            .map_or(Amount::ZERO, |handle| handle.lock().position(provider)))
    }

    /// Token the pair's liquidity is denominated in, if it has liquidity
    pub fn liquidity_token(
        &self,
        token_x: &Address,
        token_y: &Address,
    ) -> Result<Option<Address>, DexError> {
        let pair = pair_key(token_x, token_y)?;
        Ok(self
            .pool(&pair)
            .and_then(|handle| handle.lock().liquidity_token))
    }

    /// Copies of every non-empty pool, in canonical pair order
    pub fn pools(&self) -> Vec<Pool> {
        let handles: Vec<PoolHandle> = self
            .pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        handles
            .iter()
            .map(|handle| handle.lock().clone())
            .filter(|pool| !pool.is_empty())
            .collect()
    }

    /// Replace all pools with a persisted set
    pub fn restore(&self, pools: Vec<Pool>) -> Result<(), DexError> {
        let mut restored = BTreeMap::new();
        for pool in pools {
            if !pool.is_consistent() {
                return Err(DexError::InvariantViolation);
            }
            restored.insert(pool.pair, PoolHandle::new(pool));
        }
        debug!("Restored {} pools", restored.len());
        *self.pools.write().unwrap_or_else(PoisonError::into_inner) = restored;
        Ok(())
    }

    /// Number of non-empty pools
    pub fn len(&self) -> usize {
        self.pools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|handle| !handle.lock().is_empty())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
