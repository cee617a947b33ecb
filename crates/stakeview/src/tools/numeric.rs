//! Micro-unit ↔ display-unit conversion, share-to-token conversion, expected returns.
//!
//! Everything stays in arbitrary-precision `Decimal` until an output record is
//! built; rounding happens exactly once, in [`fixed`].

use rust_decimal::{Decimal, RoundingStrategy};
use std::str::FromStr;
use thiserror::Error;

/// 1 display unit = 1,000,000 micro-units.
pub const MICRO_FACTOR: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
/// Fractional digits of every monetary output.
pub const DISPLAY_SCALE: u32 = 6;
/// Fractional digits of the voting-power share.
pub const VOTING_POWER_SCALE: u32 = 9;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid decimal: {0:?}")]
pub struct ParseDecimalError(pub String);

/// Significant digits a `Decimal` mantissa holds without loss.
const MAX_DIGITS: usize = 28;

/// Parse a chain decimal string ("123", "0.100000000000000000", "1e-3").
///
/// Share amounts carry 18 fractional digits and can exceed the mantissa;
/// surplus fractional digits are dropped rather than failing the parse.
pub fn parse_decimal(s: &str) -> Result<Decimal, ParseDecimalError> {
    let s = s.trim();
    Decimal::from_str(s)
        .or_else(|_| Decimal::from_scientific(s))
        .or_else(|_| Decimal::from_str(&truncate_fraction(s)))
        .map_err(|_| ParseDecimalError(s.to_string()))
}

fn truncate_fraction(s: &str) -> String {
    let Some((int, frac)) = s.split_once('.') else {
        return s.to_string();
    };
    let int_digits = int.trim_start_matches(['-', '+']).trim_start_matches('0').len();
    let keep = MAX_DIGITS.saturating_sub(int_digits.max(1)).min(frac.len());
    if keep == 0 {
        return int.to_string();
    }
    format!("{}.{}", int, &frac[..keep])
}

/// Round half-up to `scale` digits and pin the scale, so `50` renders as `50.000000`.
pub fn fixed(value: Decimal, scale: u32) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(scale, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(scale);
    rounded
}

/// Convert a micro-unit amount to display units with 6-digit precision.
pub fn display_amount(micro: Decimal) -> Decimal {
    let units = micro.checked_div(MICRO_FACTOR).unwrap_or(Decimal::ZERO);
    fixed(units, DISPLAY_SCALE)
}

/// `part / total`, or zero when `total` is zero.
pub fn fraction(part: Decimal, total: Decimal) -> Decimal {
    if total.is_zero() {
        return Decimal::ZERO;
    }
    part.checked_div(total).unwrap_or(Decimal::ZERO)
}

/// `shares × total_tokens ÷ total_shares` in micro-units, unrounded.
///
/// Zero when the validator has no shares outstanding.
pub fn tokens_from_shares(shares: Decimal, total_shares: Decimal, total_tokens: Decimal) -> Decimal {
    if total_shares.is_zero() || shares.is_zero() {
        return Decimal::ZERO;
    }
    // Multiplying first keeps full precision; fall back to dividing first when
    // the product does not fit the 96-bit mantissa.
    shares
        .checked_mul(total_tokens)
        .and_then(|product| product.checked_div(total_shares))
        .or_else(|| {
            shares
                .checked_div(total_shares)
                .and_then(|ratio| ratio.checked_mul(total_tokens))
        })
        .unwrap_or(Decimal::ZERO)
}

/// Annual rewards a delegator earns per delegated token.
///
/// `(voting_power × annual_provision × (1 − commission)) ÷ validator_tokens`,
/// normalized by the micro-unit factor. Zero for inactive or jailed validators.
pub fn expected_returns_per_token(
    eligible: bool,
    voting_power: Decimal,
    annual_provision: Decimal,
    commission: Decimal,
    validator_tokens: Decimal,
) -> Decimal {
    if !eligible || validator_tokens.is_zero() {
        return Decimal::ZERO;
    }
    let delegator_rewards = voting_power
        .checked_mul(annual_provision)
        .and_then(|validator_rewards| validator_rewards.checked_mul(Decimal::ONE - commission));
    delegator_rewards
        .and_then(|rewards| rewards.checked_div(validator_tokens))
        .and_then(|per_token| per_token.checked_div(MICRO_FACTOR))
        .unwrap_or(Decimal::ZERO)
}
