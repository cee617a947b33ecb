//! Validator records: status, description cleanup, uptime and expected returns.

use super::{optional_decimal, parse_time, ReduceError};
use crate::chain::raw::{RawSigningInfo, RawValidator};
use crate::model::{Commission, SigningInfo, StatusDetail, Validator, ValidatorStatus};
use crate::tools::{
    display_amount, expected_returns_per_token, fixed, fraction, DISPLAY_SCALE, MICRO_FACTOR,
    VOTING_POWER_SCALE,
};
use rust_decimal::Decimal;
use time::macros::datetime;
use time::OffsetDateTime;

/// Tombstoned validators are jailed until a far-future sentinel.
const BANNED_AFTER: OffsetDateTime = datetime!(9000-02-01 0:00 UTC);

const DO_NOT_MODIFY: &str = "[do-not-modify]";

/// Everything one validator record is joined from.
pub struct ValidatorInput<'a> {
    pub raw: &'a RawValidator,
    /// Share of total consensus power, unrounded.
    pub voting_power: Decimal,
    pub signing_info: Option<&'a RawSigningInfo>,
    pub signed_blocks_window: Decimal,
    /// Annual provision in micro-units.
    pub annual_provision: Decimal,
}

/// Derive the coarse and detailed status.
///
/// A jailed validator is never active, whatever bond status the node reports.
pub fn validator_status(
    raw: &RawValidator,
    signing_info: Option<&RawSigningInfo>,
    now: OffsetDateTime,
) -> (ValidatorStatus, StatusDetail) {
    if raw.status.is_bonded() && !raw.jailed {
        return (ValidatorStatus::Active, StatusDetail::Active);
    }
    let jailed_until = signing_info
        .and_then(|info| info.jailed_until.as_deref())
        .and_then(parse_time);
    match jailed_until {
        Some(until) if until > BANNED_AFTER => (ValidatorStatus::Inactive, StatusDetail::Banned),
        Some(until) if until > now => (ValidatorStatus::Inactive, StatusDetail::Jailed),
        _ if raw.jailed => (ValidatorStatus::Inactive, StatusDetail::Jailed),
        _ => (ValidatorStatus::Inactive, StatusDetail::Inactive),
    }
}

/// Blank out placeholder websites and add a scheme where one is missing.
pub fn normalize_website(website: &str) -> String {
    let website = website.trim();
    if website.is_empty() || website == DO_NOT_MODIFY {
        String::new()
    } else if website.contains("http") {
        website.to_string()
    } else {
        format!("https://{website}")
    }
}

fn uptime(signing_info: Option<&RawSigningInfo>, window: Decimal) -> Result<Decimal, ReduceError> {
    let missed = optional_decimal(signing_info.map(|info| info.missed_blocks_counter.as_str()))?;
    Ok(fixed(Decimal::ONE - fraction(missed, window), DISPLAY_SCALE))
}

pub fn validator(
    network_id: &str,
    input: &ValidatorInput<'_>,
    now: OffsetDateTime,
) -> Result<Validator, ReduceError> {
    let raw = input.raw;
    let (status, status_detailed) = validator_status(raw, input.signing_info, now);
    let tokens_micro = optional_decimal(Some(&raw.tokens))?;
    let rates = raw.commission.rates();
    let commission = Commission {
        rate: optional_decimal(rates.rate.as_deref())?,
        max_rate: optional_decimal(rates.max_rate.as_deref())?,
        max_change_rate: optional_decimal(rates.max_change_rate.as_deref())?,
        update_time: raw.commission.update_time.clone(),
    };
    let expected_returns = expected_returns_per_token(
        status == ValidatorStatus::Active && !raw.jailed,
        input.voting_power,
        input.annual_provision,
        commission.rate,
        tokens_micro / MICRO_FACTOR,
    );

    Ok(Validator {
        network_id: network_id.to_string(),
        operator_address: raw.operator_address.clone(),
        consensus_pubkey: raw.consensus_pubkey.clone(),
        jailed: raw.jailed,
        name: raw.description.moniker.clone(),
        identity: raw.description.identity.clone(),
        details: raw.description.details.clone(),
        website: normalize_website(&raw.description.website),
        voting_power: fixed(input.voting_power, VOTING_POWER_SCALE),
        tokens: display_amount(tokens_micro),
        delegator_shares: optional_decimal(Some(&raw.delegator_shares))?,
        tokens_micro,
        commission,
        status,
        status_detailed,
        signing_info: input.signing_info.map(|info| SigningInfo {
            missed_blocks_counter: info.missed_blocks_counter.clone(),
            start_height: info.start_height.clone(),
            jailed_until: info.jailed_until.clone(),
        }),
        start_height: input.signing_info.map(|info| info.start_height.clone()),
        uptime_percentage: uptime(input.signing_info, input.signed_blocks_window)?,
        expected_returns: fixed(expected_returns, VOTING_POWER_SCALE),
        self_stake: None,
    })
}
