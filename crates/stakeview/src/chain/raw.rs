//! Wire shapes of the node's REST responses.
//!
//! Fields the chain has renamed across SDK releases carry serde aliases; numbers
//! that arrive either quoted or bare go through [`string_or_number`].

use serde::{Deserialize, Deserializer};
use serde_json::Value;

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    Str(String),
    Num(serde_json::Number),
}

/// Accept `"12"` or `12`; `null` reads as the empty string.
pub(crate) fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<StringOrNumber>::deserialize(deserializer)? {
        Some(StringOrNumber::Str(s)) => s,
        Some(StringOrNumber::Num(n)) => n.to_string(),
        None => String::new(),
    })
}

/// Consensus keys are bech32 strings on legacy nodes and `{ "@type", "key" }`
/// objects later; the object form reduces to its `key`.
fn pubkey_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Object(map)) => match map.get("key").or_else(|| map.get("value")) {
            Some(Value::String(key)) => key.clone(),
            _ => Value::Object(map).to_string(),
        },
        Some(other) => other.to_string(),
        None => String::new(),
    })
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawCoin {
    #[serde(default)]
    pub denom: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub amount: String,
}

// ---- staking ----

/// Bonding status: integer code (legacy) or enum name (later releases).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BondStatus(pub String);

impl BondStatus {
    pub fn is_bonded(&self) -> bool {
        matches!(
            self.0.as_str(),
            "2" | "Bonded" | "bonded" | "BOND_STATUS_BONDED"
        )
    }
}

impl<'de> Deserialize<'de> for BondStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        string_or_number(deserializer).map(BondStatus)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawDescription {
    #[serde(default)]
    pub moniker: String,
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub details: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawCommissionRates {
    pub rate: Option<String>,
    pub max_rate: Option<String>,
    pub max_change_rate: Option<String>,
}

/// Legacy nodes inline the rates; later ones nest them under `commission_rates`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawCommission {
    #[serde(default)]
    pub commission_rates: Option<RawCommissionRates>,
    #[serde(flatten)]
    pub inline: RawCommissionRates,
    #[serde(default)]
    pub update_time: String,
}

impl RawCommission {
    pub fn rates(&self) -> &RawCommissionRates {
        self.commission_rates.as_ref().unwrap_or(&self.inline)
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawValidator {
    pub operator_address: String,
    #[serde(default, deserialize_with = "pubkey_string")]
    pub consensus_pubkey: String,
    #[serde(default)]
    pub jailed: bool,
    #[serde(default)]
    pub status: BondStatus,
    #[serde(default, deserialize_with = "string_or_number")]
    pub tokens: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub delegator_shares: String,
    #[serde(default)]
    pub description: RawDescription,
    #[serde(default)]
    pub commission: RawCommission,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawConsensusValidator {
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "pubkey_string")]
    pub pub_key: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub voting_power: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawValidatorSet {
    #[serde(default, deserialize_with = "string_or_number")]
    pub block_height: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub validators: Vec<RawConsensusValidator>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSigningInfo {
    #[serde(default)]
    pub address: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub start_height: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub missed_blocks_counter: String,
    #[serde(default)]
    pub jailed_until: Option<String>,
    #[serde(default)]
    pub tombstoned: bool,
}

impl RawSigningInfo {
    /// Documented stand-in when a validator's signing info cannot be fetched.
    pub fn zero() -> Self {
        Self {
            start_height: "0".to_string(),
            missed_blocks_counter: "0".to_string(),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawPool {
    #[serde(default, deserialize_with = "string_or_number")]
    pub bonded_tokens: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub not_bonded_tokens: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawStakingParams {
    #[serde(default)]
    pub bond_denom: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSlashingParams {
    #[serde(default, deserialize_with = "string_or_number")]
    pub signed_blocks_window: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawDelegation {
    #[serde(default)]
    pub delegator_address: String,
    #[serde(default)]
    pub validator_address: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub shares: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawUnbondingEntry {
    #[serde(default, deserialize_with = "string_or_number")]
    pub creation_height: String,
    #[serde(default)]
    pub completion_time: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub initial_balance: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub balance: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawUnbonding {
    #[serde(default)]
    pub delegator_address: String,
    #[serde(default)]
    pub validator_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub entries: Vec<RawUnbondingEntry>,
}

// ---- distribution ----

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawValidatorReward {
    #[serde(default)]
    pub validator_address: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reward: Vec<RawCoin>,
}

/// Batched delegator rewards (`distribution/delegators/{addr}/rewards`).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawDelegatorRewards {
    #[serde(default, deserialize_with = "null_as_default")]
    pub rewards: Vec<RawValidatorReward>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: Vec<RawCoin>,
}

// ---- governance ----

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawProposalValue {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawProposalContent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: RawProposalValue,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTally {
    #[serde(default, deserialize_with = "string_or_number")]
    pub yes: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub no: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub abstain: String,
    #[serde(default, alias = "veto", deserialize_with = "string_or_number")]
    pub no_with_veto: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawProposal {
    #[serde(alias = "proposal_id", deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "proposal_content")]
    pub content: RawProposalContent,
    #[serde(default, alias = "proposal_status")]
    pub status: String,
    #[serde(default)]
    pub final_tally_result: Option<RawTally>,
    #[serde(default)]
    pub submit_time: Option<String>,
    #[serde(default)]
    pub deposit_end_time: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_deposit: Vec<RawCoin>,
    #[serde(default)]
    pub voting_start_time: Option<String>,
    #[serde(default)]
    pub voting_end_time: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawProposer {
    #[serde(default)]
    pub proposer: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawDepositParams {
    #[serde(default, deserialize_with = "null_as_default")]
    pub min_deposit: Vec<RawCoin>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTallyParams {
    #[serde(default, deserialize_with = "string_or_number")]
    pub threshold: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub veto: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub quorum: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawVote {
    #[serde(default)]
    pub voter: String,
    #[serde(default)]
    pub option: String,
}

// ---- blocks ----

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawBlockId {
    #[serde(default)]
    pub hash: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawHeader {
    #[serde(default, deserialize_with = "string_or_number")]
    pub height: String,
    #[serde(default)]
    pub chain_id: String,
    #[serde(default)]
    pub time: String,
    #[serde(default)]
    pub proposer_address: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawBlockMeta {
    #[serde(default)]
    pub block_id: RawBlockId,
    pub header: RawHeader,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawBlockBody {
    pub header: RawHeader,
}

/// `blocks/{height}`: legacy nodes answer with `block_meta`, later ones with
/// a top-level `block_id` next to the full `block`.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawBlock {
    #[serde(default)]
    pub block_meta: Option<RawBlockMeta>,
    #[serde(default)]
    pub block_id: Option<RawBlockId>,
    #[serde(default)]
    pub block: Option<RawBlockBody>,
}

impl RawBlock {
    pub fn header(&self) -> Option<&RawHeader> {
        self.block_meta
            .as_ref()
            .map(|meta| &meta.header)
            .or_else(|| self.block.as_ref().map(|block| &block.header))
    }

    pub fn hash(&self) -> Option<&str> {
        self.block_meta
            .as_ref()
            .map(|meta| meta.block_id.hash.as_str())
            .or_else(|| self.block_id.as_ref().map(|id| id.hash.as_str()))
    }
}

// ---- transactions ----

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawAttribute {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub attributes: Vec<RawAttribute>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTxLog {
    #[serde(default)]
    pub success: Option<bool>,
    #[serde(default)]
    pub log: Option<String>,
    #[serde(default)]
    pub events: Option<Vec<RawEvent>>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawMsg {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub value: Value,
}

/// Fee amount: a coin list on most nodes, a bare coin on some.
#[derive(Clone, Debug, Deserialize)]
#[serde(untagged)]
pub enum RawFeeAmount {
    Many(Vec<RawCoin>),
    One(RawCoin),
}

impl RawFeeAmount {
    pub fn first(&self) -> Option<&RawCoin> {
        match self {
            RawFeeAmount::Many(coins) => coins.first(),
            RawFeeAmount::One(coin) => Some(coin),
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawFee {
    #[serde(default)]
    pub amount: Option<RawFeeAmount>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub gas: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawSignature {
    #[serde(default)]
    pub signature: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawStdTx {
    #[serde(default, deserialize_with = "null_as_default")]
    pub msg: Vec<RawMsg>,
    #[serde(default)]
    pub fee: RawFee,
    #[serde(default, deserialize_with = "null_as_default")]
    pub signatures: Vec<RawSignature>,
    #[serde(default)]
    pub memo: String,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTxEnvelope {
    #[serde(default)]
    pub value: RawStdTx,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTx {
    pub txhash: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub height: String,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub code: Option<u32>,
    #[serde(default)]
    pub raw_log: Option<String>,
    #[serde(default)]
    pub logs: Option<Vec<RawTxLog>>,
    #[serde(default, deserialize_with = "string_or_number")]
    pub gas_wanted: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub gas_used: String,
    #[serde(default)]
    pub tags: Option<Vec<RawAttribute>>,
    #[serde(default)]
    pub events: Option<Vec<RawEvent>>,
    pub tx: RawTxEnvelope,
}

/// Tx search response of the updated protocol (`{ "txs": [...] }`).
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RawTxSearch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub txs: Vec<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn proposal_accepts_both_field_generations() {
        let legacy: RawProposal = serde_json::from_value(json!({
            "proposal_id": "7",
            "proposal_status": "VotingPeriod",
            "proposal_content": {"type": "cosmos-sdk/TextProposal", "value": {"title": "t"}}
        }))
        .unwrap();
        let later: RawProposal =
            serde_json::from_value(json!({"id": 7, "status": "VotingPeriod"})).unwrap();
        assert_eq!(legacy.id, "7");
        assert_eq!(later.id, "7");
        assert_eq!(legacy.content.value.title, "t");
        assert_eq!(later.status, "VotingPeriod");
    }

    #[test]
    fn commission_rates_inline_or_nested() {
        let legacy: RawCommission =
            serde_json::from_value(json!({"rate": "0.1", "update_time": "x"})).unwrap();
        let nested: RawCommission = serde_json::from_value(json!({
            "commission_rates": {"rate": "0.2", "max_rate": "1"},
            "update_time": "y"
        }))
        .unwrap();
        assert_eq!(legacy.rates().rate.as_deref(), Some("0.1"));
        assert_eq!(nested.rates().rate.as_deref(), Some("0.2"));
    }

    #[test]
    fn bond_status_int_or_name() {
        let a: RawValidator =
            serde_json::from_value(json!({"operator_address": "v", "status": 2})).unwrap();
        let b: RawValidator = serde_json::from_value(
            json!({"operator_address": "v", "status": "BOND_STATUS_BONDED"}),
        )
        .unwrap();
        let c: RawValidator =
            serde_json::from_value(json!({"operator_address": "v", "status": 1})).unwrap();
        assert!(a.status.is_bonded());
        assert!(b.status.is_bonded());
        assert!(!c.status.is_bonded());
    }

    #[test]
    fn fee_amount_list_or_scalar() {
        let list: RawFee =
            serde_json::from_value(json!({"amount": [{"denom": "uatom", "amount": "5"}]})).unwrap();
        let single: RawFee =
            serde_json::from_value(json!({"amount": {"denom": "uatom", "amount": "6"}})).unwrap();
        let none: RawFee = serde_json::from_value(json!({"amount": null})).unwrap();
        assert_eq!(list.amount.unwrap().first().unwrap().amount, "5");
        assert_eq!(single.amount.unwrap().first().unwrap().amount, "6");
        assert!(none.amount.is_none());
    }

    #[test]
    fn block_header_from_either_shape() {
        let legacy: RawBlock = serde_json::from_value(json!({
            "block_meta": {"block_id": {"hash": "AA"}, "header": {"height": "10"}}
        }))
        .unwrap();
        let later: RawBlock = serde_json::from_value(json!({
            "block_id": {"hash": "BB"},
            "block": {"header": {"height": "11"}}
        }))
        .unwrap();
        assert_eq!(legacy.header().unwrap().height, "10");
        assert_eq!(legacy.hash(), Some("AA"));
        assert_eq!(later.header().unwrap().height, "11");
        assert_eq!(later.hash(), Some("BB"));
    }
}
