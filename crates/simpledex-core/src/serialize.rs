use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Serialize to deterministic bincode bytes
pub fn to_bytes<T: Serialize>(value: &T) -> Result<Vec<u8>, CoreError> {
    bincode::serialize(value).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Deserialize from bincode bytes
pub fn from_bytes<'a, T: Deserialize<'a>>(bytes: &'a [u8]) -> Result<T, CoreError> {
    bincode::deserialize(bytes).map_err(|e| CoreError::Deserialization(e.to_string()))
}

/// Serialize to pretty JSON string
pub fn to_json_pretty<T: Serialize>(value: &T) -> Result<String, CoreError> {
    serde_json::to_string_pretty(value).map_err(|e| CoreError::Serialization(e.to_string()))
}

/// Deserialize from JSON string
pub fn from_json<'a, T: Deserialize<'a>>(json: &'a str) -> Result<T, CoreError> {
    serde_json::from_str(json).map_err(|e| CoreError::Deserialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Address, Amount, PairKey, Pool};

    #[test]
    fn test_pool_bincode_roundtrip() {
        let pair = PairKey::new(Address::derive("A"), Address::derive("B")).unwrap();
        let mut pool = Pool::new(pair);
        pool.reserve0 = Amount::from(1_000u64);
        pool.reserve1 = Amount::from(2_000u64);
        pool.total_liquidity = Amount::from(1_000u64);
        pool.positions.insert(Address::derive("lp"), Amount::from(1_000u64));

        let bytes = to_bytes(&pool).unwrap();
        let recovered: Pool = from_bytes(&bytes).unwrap();
        assert_eq!(pool, recovered);
    }

    #[test]
    fn test_deterministic_serialization() {
        let pair = PairKey::new(Address::derive("A"), Address::derive("B")).unwrap();
        let bytes1 = to_bytes(&pair).unwrap();
        let bytes2 = to_bytes(&pair).unwrap();
        assert_eq!(bytes1, bytes2);
    }

    #[test]
    fn test_malformed_json_is_deserialization_error() {
        let result: Result<PairKey, _> = from_json("{not json");
        assert!(matches!(result, Err(CoreError::Deserialization(_))));
    }
}
