//! Token amount arithmetic.
//!
//! Remote services speak integer minor units; users see and type decimal
//! major units. Display values are truncated, never rounded.

use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::error::{EngineError, Result};

/// Fractional digits shown to and accepted from users.
pub const DISPLAY_PLACES: u32 = 2;

/// Parse a user or service supplied decimal string.
pub fn parse_decimal(value: &str) -> Result<Decimal> {
    Decimal::from_str(value.trim())
        .map_err(|e| EngineError::Decimal(format!("{value:?}: {e}")))
}

/// Drop digits past `places` and pad to exactly `places` digits.
pub fn truncate(x: Decimal, places: u32) -> Decimal {
    let mut t = x.round_dp_with_strategy(places, RoundingStrategy::ToZero);
    t.rescale(places);
    t
}

/// `truncate` on a string: `"4.99999" -> "4.99"`, `"4" -> "4.00"`.
pub fn truncate_decimal(value: &str, places: u32) -> Result<String> {
    Ok(truncate(parse_decimal(value)?, places).to_string())
}

fn pow10(decimals: u32) -> Result<Decimal> {
    10u64
        .checked_pow(decimals)
        .map(Decimal::from)
        .ok_or_else(|| EngineError::Decimal(format!("unsupported decimals {decimals}")))
}

/// Convert an integer amount in minor units to major units.
///
/// # Errors
///
/// Returns `EngineError::Decimal` if `raw` is not an integer or the scale is
/// out of range.
pub fn scale_down(raw: &str, decimals: u32) -> Result<Decimal> {
    let minor: i128 = raw
        .trim()
        .parse()
        .map_err(|_| EngineError::Decimal(format!("not an integer amount: {raw:?}")))?;
    Decimal::try_from_i128_with_scale(minor, decimals).map_err(EngineError::from)
}

/// [`scale_down`] truncated for display.
pub fn scale_down_display(raw: &str, decimals: u32) -> Result<String> {
    Ok(truncate(scale_down(raw, decimals)?, DISPLAY_PLACES).to_string())
}

/// Convert a Decimal to a scaled u128 value.
///
/// # Errors
///
/// Returns `EngineError::Decimal` if the scaled value does not fit in a `u128`.
pub fn to_scaled_u128(x: Decimal, decimals: u32) -> Result<u128> {
    let scaled = x
        .checked_mul(pow10(decimals)?)
        .ok_or_else(|| EngineError::Decimal(format!("to_scaled_u128: {x} * 10^{decimals}")))?;
    scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| EngineError::Decimal(format!("to_scaled_u128: {x} * 10^{decimals}")))
}

/// Truncate a user amount to display precision and express it in minor
/// units: `scale_up("1.00", 6) == "1000000"`.
pub fn scale_up(amount: &str, decimals: u32) -> Result<String> {
    let x = truncate(parse_decimal(amount)?, DISPLAY_PLACES);
    Ok(to_scaled_u128(x, decimals)?.to_string())
}

/// Parse a token decimals column value.
pub fn parse_decimals(value: &str) -> Result<u32> {
    value
        .trim()
        .parse()
        .map_err(|_| EngineError::Decimal(format!("bad token decimals: {value:?}")))
}
