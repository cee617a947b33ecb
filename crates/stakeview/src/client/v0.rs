//! Legacy protocol: bare module responses and tag-indexed transactions.

use super::protocol::{
    is_exception, ExtractionError, Protocol, ProtocolVersion, SIGNING_INFO_TTL_SECS,
    TX_SEARCH_PAGINATION,
};
use super::{ClientError, Snapshot};
use crate::chain::cache::CachePolicy;
use crate::chain::raw::{RawAttribute, RawCoin, RawSigningInfo, RawValidator};
use async_trait::async_trait;
use futures::future::{join_all, try_join_all};
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

/// Address-indexed searches, one per action a user can take.
const ACTION_QUERIES: &[&str] = &[
    "sender={}",
    "recipient={}",
    "action=submit_proposal&proposer={}",
    "action=deposit&depositor={}",
    "action=vote&voter={}",
    "action=delegate&delegator={}",
    "action=begin_redelegate&delegator={}",
    "action=begin_unbonding&delegator={}",
    "action=withdraw_delegator_reward&delegator={}",
];

pub struct LegacyProtocol;

impl LegacyProtocol {
    async fn signing_info(&self, snapshot: &Snapshot<'_>, pubkey: &str) -> RawSigningInfo {
        if is_exception(pubkey) {
            debug!(pubkey, "signing info skipped for excepted key");
            return RawSigningInfo::zero();
        }
        let path = format!("slashing/validators/{pubkey}/signing_info");
        let ttl = CachePolicy::Ttl(Duration::from_secs(SIGNING_INFO_TTL_SECS));
        match snapshot.module::<RawSigningInfo>(&path, ttl).await {
            Ok(info) => info,
            Err(err) => {
                warn!(pubkey, error = %err, "signing info unavailable, using zero default");
                RawSigningInfo::zero()
            }
        }
    }
}

#[async_trait]
impl Protocol for LegacyProtocol {
    fn version(&self) -> ProtocolVersion {
        ProtocolVersion::V0
    }

    fn unwrap_envelope(&self, body: Value) -> Value {
        body
    }

    fn unwrap_tx_search(&self, body: Value) -> Vec<Value> {
        match body {
            Value::Array(txs) => txs,
            _ => Vec::new(),
        }
    }

    fn transaction_queries(&self, address: &str) -> Vec<String> {
        let address = urlencoding::encode(address);
        ACTION_QUERIES
            .iter()
            .map(|q| format!("txs?{}{TX_SEARCH_PAGINATION}", q.replace("{}", &address)))
            .collect()
    }

    /// Every tag value carrying the chain's address prefix.
    fn involved_addresses(
        &self,
        raw_tx: &Value,
        address_prefix: &str,
    ) -> Result<Vec<String>, ExtractionError> {
        let tags = raw_tx.get("tags").ok_or(ExtractionError::Missing("tags"))?;
        let tags: Vec<RawAttribute> =
            serde_json::from_value(tags.clone()).map_err(|e| ExtractionError::Malformed {
                field: "tags",
                reason: e.to_string(),
            })?;
        Ok(tags
            .into_iter()
            .filter_map(|tag| tag.value)
            .filter(|value| value.starts_with(address_prefix))
            .collect())
    }

    async fn signing_infos(
        &self,
        snapshot: &Snapshot<'_>,
        validators: &[RawValidator],
    ) -> HashMap<String, RawSigningInfo> {
        let infos = join_all(
            validators
                .iter()
                .map(|v| self.signing_info(snapshot, &v.consensus_pubkey)),
        )
        .await;
        validators
            .iter()
            .map(|v| v.consensus_pubkey.clone())
            .zip(infos)
            .collect()
    }

    /// One request per validator.
    async fn delegator_rewards(
        &self,
        snapshot: &Snapshot<'_>,
        delegator: &str,
        validators: &[String],
    ) -> Result<HashMap<String, Vec<RawCoin>>, ClientError> {
        let rewards = try_join_all(validators.iter().map(|validator| async move {
            let path = format!("distribution/delegators/{delegator}/rewards/{validator}");
            let coins: Option<Vec<RawCoin>> = snapshot.module(&path, CachePolicy::PerBlock).await?;
            Ok::<_, ClientError>((validator.clone(), coins.unwrap_or_default()))
        }))
        .await?;
        Ok(rewards.into_iter().collect())
    }
}
