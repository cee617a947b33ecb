//! Per-address records: delegations, undelegations, rewards and the overview.

use super::coin::denom_lookup;
use super::{optional_decimal, ReduceError};
use crate::chain::raw::{RawCoin, RawDelegation, RawUnbonding};
use crate::model::{Coin, Delegation, Overview, Reward, Undelegation, Validator};
use crate::tools::{display_amount, fixed, tokens_from_shares, DISPLAY_SCALE};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Convert delegation shares to a token amount against the validator's
/// current shares and tokens. Unknown validator ⇒ zero.
pub fn delegation(
    raw: &RawDelegation,
    validator: Option<&Validator>,
) -> Result<Delegation, ReduceError> {
    let shares = optional_decimal(Some(&raw.shares))?;
    let micro = validator.map_or(Decimal::ZERO, |v| {
        tokens_from_shares(shares, v.delegator_shares, v.tokens_micro)
    });
    Ok(Delegation {
        delegator_address: raw.delegator_address.clone(),
        validator_address: raw.validator_address.clone(),
        validator: validator.cloned(),
        amount: display_amount(micro),
    })
}

/// One record per unbonding entry.
pub fn undelegations(
    raw: &RawUnbonding,
    validators: &HashMap<String, Validator>,
) -> Result<Vec<Undelegation>, ReduceError> {
    let validator = validators.get(&raw.validator_address);
    raw.entries
        .iter()
        .map(|entry| {
            Ok(Undelegation {
                delegator_address: raw.delegator_address.clone(),
                validator_address: raw.validator_address.clone(),
                validator: validator.cloned(),
                amount: display_amount(optional_decimal(Some(&entry.balance))?),
                start_height: entry.creation_height.clone(),
                end_time: entry.completion_time.clone(),
            })
        })
        .collect()
}

/// Reward from the first coin of a reward list; no coin ⇒ zero in `staking_denom`.
pub fn reward(
    validator_address: Option<String>,
    coins: &[RawCoin],
    validator: Option<Validator>,
    staking_denom: &str,
) -> Result<Reward, ReduceError> {
    let (denom, micro) = match coins.first() {
        Some(c) => (c.denom.as_str(), optional_decimal(Some(&c.amount))?),
        None => (staking_denom, Decimal::ZERO),
    };
    Ok(Reward {
        validator_address,
        validator,
        denom: denom_lookup(denom),
        amount: display_amount(micro),
    })
}

pub fn overview(
    balances: &[Coin],
    delegations: &[Delegation],
    undelegations: &[Undelegation],
    rewards: &[Reward],
    staking_denom: &str,
) -> Overview {
    let symbol = denom_lookup(staking_denom);
    let total_rewards: Decimal = rewards.iter().map(|r| r.amount).sum();
    let liquid_stake = balances
        .iter()
        .find(|b| denom_lookup(&b.denom) == symbol || b.denom == symbol)
        .map_or(Decimal::ZERO, |b| b.amount);
    let delegated: Decimal = delegations.iter().map(|d| d.amount).sum();
    let undelegating: Decimal = undelegations.iter().map(|u| u.amount).sum();
    Overview {
        total_rewards: fixed(total_rewards, DISPLAY_SCALE),
        liquid_stake: fixed(liquid_stake, DISPLAY_SCALE),
        total_stake: fixed(liquid_stake + delegated + undelegating, DISPLAY_SCALE),
    }
}
