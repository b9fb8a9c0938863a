use alloy_primitives::utils::{format_units, parse_units, ParseUnits};

use crate::error::CoreError;
use crate::types::Amount;

/// Parse a decimal string such as `"9.9"` into base units of a token with
/// `decimals` decimal places
pub fn parse_amount(value: &str, decimals: u8) -> Result<Amount, CoreError> {
    match parse_units(value.trim(), decimals) {
        Ok(ParseUnits::U256(amount)) => Ok(amount),
        Ok(ParseUnits::I256(_)) => Err(CoreError::InvalidAmount(format!(
            "negative amount {value}"
        ))),
        Err(e) => Err(CoreError::InvalidAmount(format!("{value}: {e}"))),
    }
}

/// Render base units as a decimal string with `decimals` decimal places
pub fn format_amount(amount: Amount, decimals: u8) -> Result<String, CoreError> {
    format_units(amount, decimals).map_err(|e| CoreError::InvalidAmount(e.to_string()))
}
