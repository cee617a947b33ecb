//! Domain records returned by the query client.
//!
//! Monetary fields are display units pinned to 6 fractional digits and
//! serialize as strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidatorStatus {
    Active,
    Inactive,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusDetail {
    Active,
    /// Jailed until a time that has not passed yet.
    Jailed,
    /// Jailed until the far-future tombstone sentinel.
    Banned,
    Inactive,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SigningInfo {
    pub missed_blocks_counter: String,
    pub start_height: String,
    pub jailed_until: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Commission {
    pub rate: Decimal,
    pub max_rate: Decimal,
    pub max_change_rate: Decimal,
    pub update_time: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Validator {
    pub network_id: String,
    pub operator_address: String,
    pub consensus_pubkey: String,
    pub jailed: bool,
    pub name: String,
    pub identity: String,
    pub details: String,
    pub website: String,
    /// Share of total consensus power in `[0, 1]`, 9 fractional digits.
    pub voting_power: Decimal,
    pub tokens: Decimal,
    /// Validator-internal share units, unconverted.
    pub delegator_shares: Decimal,
    /// Bonded amount in micro-units; the share conversion divides this, never `tokens`.
    #[serde(skip)]
    pub tokens_micro: Decimal,
    pub commission: Commission,
    pub status: ValidatorStatus,
    pub status_detailed: StatusDetail,
    pub signing_info: Option<SigningInfo>,
    pub start_height: Option<String>,
    pub uptime_percentage: Decimal,
    pub expected_returns: Decimal,
    pub self_stake: Option<Decimal>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProposalStatus {
    DepositPeriod,
    VotingPeriod,
    Passed,
    Rejected,
}

impl ProposalStatus {
    pub fn is_finalized(self) -> bool {
        matches!(self, ProposalStatus::Passed | ProposalStatus::Rejected)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tally {
    pub yes: Decimal,
    pub no: Decimal,
    pub abstain: Decimal,
    pub veto: Decimal,
    pub total: Decimal,
    /// Ratio of voted to bonded tokens; `-1` when unknown, `0` when nothing voted.
    pub total_voted_percentage: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub network_id: String,
    pub id: u64,
    #[serde(rename = "type")]
    pub proposal_type: String,
    pub title: String,
    pub description: String,
    pub creation_time: Option<String>,
    pub status: ProposalStatus,
    pub status_begin_time: Option<String>,
    pub status_end_time: Option<String>,
    pub tally: Tally,
    pub deposit: Decimal,
    pub proposer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GovernanceParameters {
    pub voting_threshold: Decimal,
    pub veto_threshold: Decimal,
    pub deposit_denom: String,
    pub deposit_threshold: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub option: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    pub amount: Decimal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionGroup {
    Banking,
    Staking,
    Governance,
    Distribution,
    Unknown,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub height: Option<u64>,
    pub timestamp: Option<String>,
    #[serde(rename = "type")]
    pub tx_type: String,
    pub group: TransactionGroup,
    pub success: bool,
    pub log: Option<String>,
    pub memo: String,
    pub fee: Coin,
    pub gas_used: String,
    pub gas_wanted: String,
    pub signature: Option<String>,
    /// JSON encoding of the first message's value.
    pub value: Option<String>,
    pub undelegation_end_time: Option<String>,
    pub raw: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub network_id: String,
    pub height: u64,
    pub chain_id: String,
    pub hash: String,
    pub time: String,
    pub proposer_address: String,
    pub transactions: Vec<Transaction>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    pub delegator_address: String,
    pub validator_address: String,
    pub validator: Option<Validator>,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Undelegation {
    pub delegator_address: String,
    pub validator_address: String,
    pub validator: Option<Validator>,
    pub amount: Decimal,
    pub start_height: String,
    pub end_time: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reward {
    pub validator_address: Option<String>,
    pub validator: Option<Validator>,
    pub denom: String,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_rewards: Decimal,
    pub liquid_stake: Decimal,
    pub total_stake: Decimal,
}
