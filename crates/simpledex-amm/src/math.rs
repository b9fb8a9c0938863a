//! Integer pricing math for constant-product pools
//!
//! Every division floors. Rounding therefore always favors the pool, never
//! the caller.

use simpledex_core::{Amount, FEE_DENOMINATOR};

use crate::error::DexError;

/// `a * b / c` with checked multiplication
pub fn mul_div(a: Amount, b: Amount, c: Amount) -> Result<Amount, DexError> {
    if c.is_zero() {
        return Err(DexError::InsufficientLiquidity);
    }
    let product = a.checked_mul(b).ok_or(DexError::Overflow)?;
    Ok(product / c)
}

/// Input remaining after the per-mille fee is taken
pub fn amount_in_after_fee(amount_in: Amount, fee_per_mille: u64) -> Result<Amount, DexError> {
    if fee_per_mille >= FEE_DENOMINATOR {
        return Err(DexError::InvalidFee(fee_per_mille));
    }
    mul_div(
        amount_in,
        Amount::from(FEE_DENOMINATOR - fee_per_mille),
        Amount::from(FEE_DENOMINATOR),
    )
}

/// Output of swapping `amount_in` against the given reserves
///
/// `amount_out = reserve_out * in_after_fee / (reserve_in + in_after_fee)`.
/// Fails with `InsufficientLiquidity` if either reserve is empty or the
/// output would drain the out-reserve.
pub fn get_amount_out(
    amount_in: Amount,
    reserve_in: Amount,
    reserve_out: Amount,
    fee_per_mille: u64,
) -> Result<Amount, DexError> {
    if amount_in.is_zero() {
        return Err(DexError::ZeroAmount);
    }
    if reserve_in.is_zero() || reserve_out.is_zero() {
        return Err(DexError::InsufficientLiquidity);
    }

    let in_after_fee = amount_in_after_fee(amount_in, fee_per_mille)?;
    let denominator = reserve_in
        .checked_add(in_after_fee)
        .ok_or(DexError::Overflow)?;
    let amount_out = mul_div(reserve_out, in_after_fee, denominator)?;

    if amount_out >= reserve_out {
        return Err(DexError::InsufficientLiquidity);
    }
    Ok(amount_out)
}

/// Liquidity units minted for a deposit of `amount_x` / `amount_y`
///
/// The first deposit mints `amount_x`. Later deposits mint in proportion to
/// the smaller of the two deposit ratios, so an unbalanced deposit cannot
/// claim more than its weaker side is worth.
pub fn liquidity_to_mint(
    amount_x: Amount,
    amount_y: Amount,
    reserve_x: Amount,
    reserve_y: Amount,
    total_liquidity: Amount,
) -> Result<Amount, DexError> {
    if amount_x.is_zero() || amount_y.is_zero() {
        return Err(DexError::ZeroAmount);
    }
    if total_liquidity.is_zero() {
        return Ok(amount_x);
    }

    let from_x = mul_div(amount_x, total_liquidity, reserve_x)?;
    let from_y = mul_div(amount_y, total_liquidity, reserve_y)?;
    let minted = from_x.min(from_y);
    if minted.is_zero() {
        return Err(DexError::InsufficientLiquidity);
    }
    Ok(minted)
}

/// Reserve amounts redeemed by burning `liquidity` out of `total_liquidity`
pub fn liquidity_share(
    liquidity: Amount,
    reserve_x: Amount,
    reserve_y: Amount,
    total_liquidity: Amount,
) -> Result<(Amount, Amount), DexError> {
    if liquidity.is_zero() {
        return Err(DexError::ZeroAmount);
    }
    if liquidity > total_liquidity {
        return Err(DexError::InsufficientLiquidity);
    }
    let amount_x = mul_div(reserve_x, liquidity, total_liquidity)?;
    let amount_y = mul_div(reserve_y, liquidity, total_liquidity)?;
    Ok((amount_x, amount_y))
}

/// Verify `k` did not decrease across a reserve update
pub fn check_constant_product(
    reserve_in: Amount,
    reserve_out: Amount,
    new_reserve_in: Amount,
    new_reserve_out: Amount,
) -> Result<(), DexError> {
    let k_before = reserve_in
        .checked_mul(reserve_out)
        .ok_or(DexError::Overflow)?;
    let k_after = new_reserve_in
        .checked_mul(new_reserve_out)
        .ok_or(DexError::Overflow)?;
    if k_after < k_before {
        return Err(DexError::InvariantViolation);
    }
    Ok(())
}
