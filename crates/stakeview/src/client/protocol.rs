//! Per-network protocol strategy.
//!
//! Both strategies answer the same queries; they differ in how responses are
//! enveloped, which tx searches cover an address, how involved addresses are
//! read from a transaction, and how signing infos and rewards are batched.

use super::{ClientError, Snapshot};
use crate::chain::raw::{RawCoin, RawSigningInfo, RawValidator};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Consensus keys whose signing info the node cannot serve.
pub(crate) const SIGNING_INFO_EXCEPTIONS: &[&str] = &[
    "cosmosvalconspub1zcjduepqx38v580cmd9em3n7mcgzj22jwdwks5lr3lfxl8g87vzjp7jyyszsr4xvzv",
    "cosmosvalconspub1zcjduepqlzmd0spn9m0m3eq9zp93d4w6e5tugamv44yqjzyacelnvra634fqnfec0r",
];

/// Signing infos change slowly.
pub(crate) const SIGNING_INFO_TTL_SECS: u64 = 60;

/// `limit` appended to tx searches so one page holds the whole history.
pub(crate) const TX_SEARCH_PAGINATION: &str = "&limit=1000000000";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProtocolVersion {
    /// Bare module responses, tag-indexed transactions.
    #[default]
    V0,
    /// `{ height, result }` envelopes, event-indexed transactions.
    V2,
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolVersion::V0 => write!(f, "v0"),
            ProtocolVersion::V2 => write!(f, "v2"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("transaction has no {0}")]
    Missing(&'static str),
    #[error("malformed {field}: {reason}")]
    Malformed { field: &'static str, reason: String },
}

#[async_trait]
pub trait Protocol: Send + Sync {
    fn version(&self) -> ProtocolVersion;

    /// Strip the response envelope of a module query.
    fn unwrap_envelope(&self, body: Value) -> Value;

    /// Raw transactions of a `txs?...` search response.
    fn unwrap_tx_search(&self, body: Value) -> Vec<Value>;

    /// Tx search paths (relative, with pagination) that together cover `address`.
    fn transaction_queries(&self, address: &str) -> Vec<String>;

    /// Addresses a transaction touches, possibly with repeats.
    fn involved_addresses(
        &self,
        raw_tx: &Value,
        address_prefix: &str,
    ) -> Result<Vec<String>, ExtractionError>;

    /// Signing info for every validator, keyed by consensus pubkey.
    ///
    /// Never fails: unavailable entries are replaced by [`RawSigningInfo::zero`].
    async fn signing_infos(
        &self,
        snapshot: &Snapshot<'_>,
        validators: &[RawValidator],
    ) -> HashMap<String, RawSigningInfo>;

    /// Outstanding rewards of `delegator`, keyed by validator operator address.
    async fn delegator_rewards(
        &self,
        snapshot: &Snapshot<'_>,
        delegator: &str,
        validators: &[String],
    ) -> Result<HashMap<String, Vec<RawCoin>>, ClientError>;
}

pub fn for_version(version: ProtocolVersion) -> Arc<dyn Protocol> {
    match version {
        ProtocolVersion::V0 => Arc::new(super::v0::LegacyProtocol),
        ProtocolVersion::V2 => Arc::new(super::v2::EnvelopeProtocol),
    }
}

pub(crate) fn is_exception(consensus_pubkey: &str) -> bool {
    SIGNING_INFO_EXCEPTIONS.contains(&consensus_pubkey)
}
