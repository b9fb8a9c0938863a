use serde::{Deserialize, Serialize};

use crate::types::address::Address;
use crate::types::Amount;

/// Events emitted by the engine for observers
///
/// Tokens are reported in the order the caller passed them. Field order is
/// stable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DexEvent {
    LiquidityAdded {
        provider: Address,
        token_x: Address,
        token_y: Address,
        amount_x: Amount,
        amount_y: Amount,
    },
    LiquidityRemoved {
        provider: Address,
        token_x: Address,
        token_y: Address,
        amount_x: Amount,
        amount_y: Amount,
    },
    Swap {
        trader: Address,
        token_in: Address,
        token_out: Address,
        amount_in: Amount,
        amount_out: Amount,
    },
}

impl DexEvent {
    pub fn name(&self) -> &'static str {
        match self {
            DexEvent::LiquidityAdded { .. } => "LiquidityAdded",
            DexEvent::LiquidityRemoved { .. } => "LiquidityRemoved",
            DexEvent::Swap { .. } => "Swap",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_json_is_tagged() {
        let event = DexEvent::Swap {
            trader: Address::derive("trader"),
            token_in: Address::derive("A"),
            token_out: Address::derive("B"),
            amount_in: Amount::from(10u64),
            amount_out: Amount::from(9u64),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Swap");
        assert!(json["data"].get("amount_out").is_some());
        assert_eq!(event.name(), "Swap");
    }
}
