//! Governance proposals, tallies and parameters.

use super::coin::{denom_lookup, micro_sum};
use super::{optional_decimal, parse_u64, ReduceError};
use crate::chain::raw::{RawDepositParams, RawProposal, RawTally, RawTallyParams};
use crate::model::{GovernanceParameters, Proposal, ProposalStatus, Tally};
use crate::tools::{display_amount, fraction, VOTING_POWER_SCALE};
use rust_decimal::Decimal;

/// Accepts `VotingPeriod`, `voting_period` and `PROPOSAL_STATUS_VOTING_PERIOD`.
pub fn parse_status(status: &str) -> Result<ProposalStatus, ReduceError> {
    let lower = status.trim().to_ascii_lowercase();
    let compact = lower.strip_prefix("proposal_status_").unwrap_or(lower.as_str()).replace('_', "");
    match compact.as_str() {
        "depositperiod" => Ok(ProposalStatus::DepositPeriod),
        "votingperiod" => Ok(ProposalStatus::VotingPeriod),
        "passed" => Ok(ProposalStatus::Passed),
        "rejected" | "failed" => Ok(ProposalStatus::Rejected),
        _ => Err(ReduceError::UnknownProposalStatus(status.to_string())),
    }
}

fn status_begin_time(raw: &RawProposal, status: ProposalStatus) -> Option<String> {
    match status {
        ProposalStatus::DepositPeriod => raw.submit_time.clone(),
        ProposalStatus::VotingPeriod => raw.voting_start_time.clone(),
        ProposalStatus::Passed | ProposalStatus::Rejected => raw.voting_end_time.clone(),
    }
}

fn status_end_time(raw: &RawProposal, status: ProposalStatus) -> Option<String> {
    match status {
        ProposalStatus::DepositPeriod => raw.deposit_end_time.clone(),
        // a finalized proposal ended when voting did
        ProposalStatus::VotingPeriod | ProposalStatus::Passed | ProposalStatus::Rejected => {
            raw.voting_end_time.clone()
        }
    }
}

/// Reduce a tally.
///
/// Finalized proposals use the chain's recorded final tally instead of `live`.
/// `bonded_micro` is the bonded pool in micro-units, `None` when the pool
/// could not be fetched.
pub fn tally(
    raw: &RawProposal,
    status: ProposalStatus,
    live: Option<&RawTally>,
    bonded_micro: Option<Decimal>,
) -> Result<Tally, ReduceError> {
    let source = if status.is_finalized() {
        raw.final_tally_result.as_ref()
    } else {
        live
    };
    let empty = RawTally::default();
    let source = source.unwrap_or(&empty);

    let yes = optional_decimal(Some(&source.yes))?;
    let no = optional_decimal(Some(&source.no))?;
    let abstain = optional_decimal(Some(&source.abstain))?;
    let veto = optional_decimal(Some(&source.no_with_veto))?;
    let total = display_amount(yes + no + abstain + veto);

    let total_voted_percentage = match bonded_micro {
        _ if status.is_finalized() => Decimal::NEGATIVE_ONE,
        _ if total.is_zero() => Decimal::ZERO,
        Some(bonded) if !bonded.is_zero() => {
            fraction(total, display_amount(bonded)).round_dp(VOTING_POWER_SCALE).normalize()
        }
        _ => Decimal::NEGATIVE_ONE,
    };

    Ok(Tally {
        yes: display_amount(yes),
        no: display_amount(no),
        abstain: display_amount(abstain),
        veto: display_amount(veto),
        total,
        total_voted_percentage,
    })
}

pub fn proposal(
    network_id: &str,
    raw: &RawProposal,
    live_tally: Option<&RawTally>,
    proposer: Option<String>,
    bonded_micro: Option<Decimal>,
) -> Result<Proposal, ReduceError> {
    let status = parse_status(&raw.status)?;
    Ok(Proposal {
        network_id: network_id.to_string(),
        id: parse_u64("proposal id", &raw.id)?,
        proposal_type: raw.content.kind.clone(),
        title: raw.content.value.title.clone(),
        description: raw.content.value.description.clone(),
        creation_time: raw.submit_time.clone(),
        status,
        status_begin_time: status_begin_time(raw, status),
        status_end_time: status_end_time(raw, status),
        tally: tally(raw, status, live_tally, bonded_micro)?,
        deposit: display_amount(micro_sum(&raw.total_deposit)?),
        proposer,
    })
}

/// Assumes a single deposit denom.
pub fn governance_parameters(
    deposit: &RawDepositParams,
    tallying: &RawTallyParams,
) -> Result<GovernanceParameters, ReduceError> {
    let min_deposit = deposit.min_deposit.first().ok_or(ReduceError::Missing("min_deposit"))?;
    Ok(GovernanceParameters {
        voting_threshold: optional_decimal(Some(&tallying.threshold))?,
        veto_threshold: optional_decimal(Some(&tallying.veto))?,
        deposit_denom: denom_lookup(&min_deposit.denom),
        deposit_threshold: display_amount(optional_decimal(Some(&min_deposit.amount))?),
    })
}
