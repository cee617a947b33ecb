//! Updated protocol: `{ height, result }` envelopes and event-indexed transactions.

use super::protocol::{
    is_exception, ExtractionError, Protocol, ProtocolVersion, SIGNING_INFO_TTL_SECS,
    TX_SEARCH_PAGINATION,
};
use super::{ClientError, Snapshot};
use crate::chain::cache::CachePolicy;
use crate::chain::raw::{RawCoin, RawDelegatorRewards, RawEvent, RawSigningInfo, RawTxSearch, RawValidator};
use crate::tools::pubkey_to_consensus_address;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::warn;

pub struct EnvelopeProtocol;

#[async_trait]
impl Protocol for EnvelopeProtocol {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V2
    }

    fn unwrap_envelope(&self, body: Value) -> Value {
        match body {
            Value::Object(mut map) if map.contains_key("result") => {
                map.remove("result").unwrap_or(Value::Null)
            }
            other => other,
        }
    }

    fn unwrap_tx_search(&self, body: Value) -> Vec<Value> {
        serde_json::from_value::<RawTxSearch>(body)
            .map(|search| search.txs)
            .unwrap_or_default()
    }

    fn transaction_queries(&self, address: &str) -> Vec<String> {
        let address = urlencoding::encode(address);
        vec![
            format!("txs?message.sender={address}{TX_SEARCH_PAGINATION}"),
            format!("txs?transfer.recipient={address}{TX_SEARCH_PAGINATION}"),
        ]
    }

    /// `sender` and `recipient` attributes of every event. Failed transactions
    /// carry no events and involve nobody.
    fn involved_addresses(
        &self,
        raw_tx: &Value,
        _address_prefix: &str,
    ) -> Result<Vec<String>, ExtractionError> {
        let Some(events) = raw_tx.get("events").filter(|e| e.is_array()) else {
            return Ok(Vec::new());
        };
        let events: Vec<RawEvent> =
            serde_json::from_value(events.clone()).map_err(|e| ExtractionError::Malformed {
                field: "events",
                reason: e.to_string(),
            })?;
        let mut found = Vec::new();
        for event in &events {
            for key in ["sender", "recipient"] {
                if let Some(attr) = event.attributes.iter().find(|a| a.key == key) {
                    let value = attr.value.clone().ok_or(ExtractionError::Malformed {
                        field: "events",
                        reason: format!("{} attribute without value in {}", key, event.kind),
                    })?;
                    found.push(value);
                }
            }
        }
        Ok(found)
    }

    /// One batched request; a failed batch degrades every validator to the zero default.
    async fn signing_infos(
        &self,
        snapshot: &Snapshot<'_>,
        validators: &[RawValidator],
    ) -> HashMap<String, RawSigningInfo> {
        let ttl = CachePolicy::Ttl(Duration::from_secs(SIGNING_INFO_TTL_SECS));
        let batch = match snapshot
            .module::<Option<Vec<RawSigningInfo>>>("slashing/signing_infos", ttl)
            .await
        {
            Ok(list) => list.unwrap_or_default(),
            Err(err) => {
                warn!(error = %err, "signing infos unavailable, using zero defaults");
                Vec::new()
            }
        };
        let by_address: HashMap<&str, &RawSigningInfo> =
            batch.iter().map(|info| (info.address.as_str(), info)).collect();

        validators
            .iter()
            .map(|v| {
                let pubkey = v.consensus_pubkey.clone();
                if is_exception(&pubkey) {
                    return (pubkey, RawSigningInfo::zero());
                }
                let info = pubkey_to_consensus_address(&pubkey)
                    .ok()
                    .and_then(|address| by_address.get(address.as_str()).map(|i| (*i).clone()))
                    .unwrap_or_else(RawSigningInfo::zero);
                (pubkey, info)
            })
            .collect()
    }

    /// One request for all validators.
    async fn delegator_rewards(
        &self,
        snapshot: &Snapshot<'_>,
        delegator: &str,
        _validators: &[String],
    ) -> Result<HashMap<String, Vec<RawCoin>>, ClientError> {
        let path = format!("distribution/delegators/{delegator}/rewards");
        let rewards: RawDelegatorRewards = snapshot.module(&path, CachePolicy::PerBlock).await?;
        Ok(rewards
            .rewards
            .into_iter()
            .map(|r| (r.validator_address, r.reward))
            .collect())
    }
}
