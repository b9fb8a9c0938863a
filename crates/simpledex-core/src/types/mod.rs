pub mod address;
pub mod event;
pub mod pair;
pub mod pool;

pub use address::Address;
pub use event::DexEvent;
pub use pair::{canonical_pair, compute_pool_id, PairKey};
pub use pool::{LiquidityPosition, Pool, DEFAULT_FEE_PER_MILLE, FEE_DENOMINATOR};

/// Token amount in the token's native fixed-point precision
pub type Amount = alloy_primitives::U256;
