//! Blocks and transactions.

use super::coin::coin;
use super::{parse_u64, ReduceError};
use crate::chain::raw::{RawBlock, RawEvent, RawTx};
use crate::model::{Block, Coin, Transaction, TransactionGroup};
use crate::tools::DISPLAY_SCALE;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::warn;

const END_TIME_TAG: &str = "end-time";

/// Message type → group.
pub fn group_for(message_type: &str) -> TransactionGroup {
    match message_type {
        "cosmos-sdk/MsgSend" | "cosmos-sdk/MsgMultiSend" => TransactionGroup::Banking,
        "cosmos-sdk/MsgCreateValidator"
        | "cosmos-sdk/MsgEditValidator"
        | "cosmos-sdk/MsgDelegate"
        | "cosmos-sdk/MsgUndelegate"
        | "cosmos-sdk/MsgBeginRedelegate"
        | "cosmos-sdk/MsgUnjail" => TransactionGroup::Staking,
        "cosmos-sdk/MsgSubmitProposal" | "cosmos-sdk/MsgDeposit" | "cosmos-sdk/MsgVote" => {
            TransactionGroup::Governance
        }
        "cosmos-sdk/MsgModifyWithdrawAddress"
        | "cosmos-sdk/MsgWithdrawDelegationReward"
        | "cosmos-sdk/MsgWithdrawValidatorCommission" => TransactionGroup::Distribution,
        _ => TransactionGroup::Unknown,
    }
}

fn unbond_completion(events: &[RawEvent]) -> Option<String> {
    events
        .iter()
        .filter(|event| event.kind == "unbond")
        .flat_map(|event| event.attributes.iter())
        .find(|attr| attr.key == "completion_time")
        .and_then(|attr| attr.value.clone())
}

/// When an undelegation matures: the `end-time` tag on legacy nodes, the
/// `unbond` event's `completion_time` later. `None` when neither is present.
pub fn undelegation_end_time(raw: &RawTx) -> Option<String> {
    if let Some(tags) = &raw.tags {
        return tags
            .iter()
            .find(|tag| tag.key == END_TIME_TAG)
            .and_then(|tag| tag.value.clone());
    }
    if let Some(found) = raw.events.as_deref().and_then(unbond_completion) {
        return Some(found);
    }
    raw.logs
        .iter()
        .flatten()
        .filter_map(|log| log.events.as_deref())
        .find_map(unbond_completion)
}

fn success(raw: &RawTx) -> bool {
    match (raw.code, raw.logs.as_ref().and_then(|logs| logs.first())) {
        (Some(code), _) => code == 0,
        (None, Some(log)) => log.success.unwrap_or(true),
        (None, None) => false,
    }
}

/// First log's message, else the `message` of a JSON raw log, else the raw log.
fn log(raw: &RawTx) -> Option<String> {
    if let Some(message) = raw.logs.iter().flatten().find_map(|log| log.log.clone()) {
        return Some(message);
    }
    let raw_log = raw.raw_log.as_ref()?;
    match serde_json::from_str::<Value>(raw_log) {
        Ok(Value::Object(map)) => match map.get("message") {
            Some(Value::String(message)) => Some(message.clone()),
            _ => Some(raw_log.clone()),
        },
        _ => Some(raw_log.clone()),
    }
}

fn try_transaction(value: &Value) -> Result<Transaction, ReduceError> {
    let raw: RawTx =
        serde_json::from_value(value.clone()).map_err(|e| ReduceError::Shape(e.to_string()))?;
    let std_tx = &raw.tx.value;
    let msg = std_tx.msg.first().ok_or(ReduceError::Missing("message"))?;
    let fee = coin(std_tx.fee.amount.as_ref().and_then(|amount| amount.first()))?;
    Ok(Transaction {
        hash: raw.txhash.clone(),
        height: parse_u64("height", &raw.height).ok(),
        timestamp: raw.timestamp.clone(),
        tx_type: msg.kind.clone(),
        group: group_for(&msg.kind),
        success: success(&raw),
        log: log(&raw),
        memo: std_tx.memo.clone(),
        fee,
        gas_used: raw.gas_used.clone(),
        gas_wanted: raw.gas_wanted.clone(),
        signature: std_tx.signatures.first().map(|sig| sig.signature.clone()),
        value: serde_json::to_string(&msg.value).ok(),
        undelegation_end_time: undelegation_end_time(&raw),
        raw: value.clone(),
    })
}

/// Placeholder for a transaction that could not be reduced: hash (if any) and raw payload.
pub fn unparsed(value: &Value) -> Transaction {
    Transaction {
        hash: value
            .get("txhash")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        height: None,
        timestamp: value.get("timestamp").and_then(Value::as_str).map(str::to_string),
        tx_type: String::new(),
        group: TransactionGroup::Unknown,
        success: false,
        log: None,
        memo: String::new(),
        fee: Coin {
            denom: String::new(),
            amount: Decimal::new(0, DISPLAY_SCALE),
        },
        gas_used: String::new(),
        gas_wanted: String::new(),
        signature: None,
        value: None,
        undelegation_end_time: None,
        raw: value.clone(),
    }
}

/// Reduce one transaction; shapes that cannot be reduced degrade to [`unparsed`].
pub fn transaction(value: &Value) -> Transaction {
    match try_transaction(value) {
        Ok(tx) => tx,
        Err(err) => {
            warn!(error = %err, raw = %value, "transaction not reducible, keeping raw payload");
            unparsed(value)
        }
    }
}

pub fn block(
    network_id: &str,
    raw: &RawBlock,
    transactions: Vec<Transaction>,
) -> Result<Block, ReduceError> {
    let header = raw.header().ok_or(ReduceError::Missing("block header"))?;
    Ok(Block {
        network_id: network_id.to_string(),
        height: parse_u64("block height", &header.height)?,
        chain_id: header.chain_id.clone(),
        hash: raw.hash().unwrap_or_default().to_string(),
        time: header.time.clone(),
        proposer_address: header.proposer_address.clone(),
        transactions,
    })
}
