//! Denominations and coin amounts.

use super::ReduceError;
use crate::chain::raw::RawCoin;
use crate::model::Coin;
use crate::tools::{display_amount, parse_decimal, DISPLAY_SCALE};
use rust_decimal::Decimal;

const DENOMS: &[(&str, &str)] = &[
    ("uatom", "ATOM"),
    ("umuon", "MUON"),
    ("uluna", "LUNA"),
    ("seed", "TREE"),
];

/// Display symbol for an on-chain denom; unknown denoms are uppercased.
pub fn denom_lookup(denom: &str) -> String {
    DENOMS
        .iter()
        .find(|(code, _)| *code == denom)
        .map_or_else(|| denom.to_uppercase(), |(_, symbol)| (*symbol).to_string())
}

/// Reduce a micro-unit coin. A missing coin is an empty zero amount.
pub fn coin(raw: Option<&RawCoin>) -> Result<Coin, ReduceError> {
    let Some(raw) = raw else {
        return Ok(Coin {
            denom: String::new(),
            amount: Decimal::new(0, DISPLAY_SCALE),
        });
    };
    let micro = if raw.amount.trim().is_empty() {
        Decimal::ZERO
    } else {
        parse_decimal(&raw.amount)?
    };
    Ok(Coin {
        denom: denom_lookup(&raw.denom),
        amount: display_amount(micro),
    })
}

/// Sum of micro-unit amounts, unrounded.
pub(crate) fn micro_sum(coins: &[RawCoin]) -> Result<Decimal, ReduceError> {
    coins.iter().try_fold(Decimal::ZERO, |sum, c| {
        Ok(sum + super::optional_decimal(Some(&c.amount))?)
    })
}
