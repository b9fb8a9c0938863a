//! SimpleDEX AMM - Constant-product pool engine
//!
//! This crate provides the pool registry, liquidity and swap operations,
//! the pure pricing math they share, and event sinks for observers.

pub mod engine;
pub mod error;
pub mod events;
pub mod liquidity;
pub mod math;
pub mod registry;
pub mod swap;

pub use engine::{Dex, DexConfig};
pub use error::DexError;
pub use events::{EventBroadcaster, EventLog, EventSink, FanOut, NullSink};
pub use registry::{PoolHandle, PoolRegistry};
