//! Chain query client.
//!
//! One [`ChainClient`] per network. Every operation pins a [`Snapshot`] first
//! so all of its upstream reads resolve against one cache generation.

pub mod blocks;
pub mod governance;
pub mod protocol;
pub mod staking;
mod v0;
mod v2;

use crate::chain::cache::{CachePolicy, CacheView, PerBlockCache};
use crate::chain::clock::Clock;
use crate::chain::fetch::{FetchConfig, FetchError, HttpUpstream, Upstream};
use crate::chain::raw::{RawSlashingParams, RawStakingParams};
use crate::config::NetworkConfig;
use crate::reducers::{optional_decimal, ReduceError};
use crate::tools::{check_prefix, parse_decimal};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub use blocks::sort_transactions;
pub use protocol::{for_version, ExtractionError, Protocol, ProtocolVersion};
pub use v0::LegacyProtocol;
pub use v2::EnvelopeProtocol;

/// Chain parameters rarely change.
pub(crate) const PARAMETERS_TTL: CachePolicy = CachePolicy::Ttl(Duration::from_secs(3600));

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("upstream {path} unavailable: {source}")]
    UpstreamUnavailable {
        path: String,
        #[source]
        source: FetchError,
    },
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error(transparent)]
    Reduce(#[from] ReduceError),
}

impl ClientError {
    /// True when the node answered with a non-success status.
    pub fn is_status(&self) -> bool {
        matches!(self, ClientError::UpstreamUnavailable { source, .. } if source.is_status())
    }
}

pub struct ChainClient {
    network: NetworkConfig,
    upstream: Arc<dyn Upstream>,
    protocol: Arc<dyn Protocol>,
    cache: PerBlockCache,
    clock: Arc<dyn Clock>,
}

impl ChainClient {
    pub fn new(network: NetworkConfig, upstream: Arc<dyn Upstream>, clock: Arc<dyn Clock>) -> Self {
        let protocol = for_version(network.protocol);
        Self {
            cache: PerBlockCache::new(Arc::clone(&clock)),
            network,
            upstream,
            protocol,
            clock,
        }
    }

    /// Client talking HTTP to the network's REST endpoint.
    pub fn connect(
        network: NetworkConfig,
        fetch: &FetchConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FetchError> {
        let upstream = Arc::new(HttpUpstream::new(&network.api_url, fetch)?);
        Ok(Self::new(network, upstream, clock))
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    pub fn network_id(&self) -> &str {
        &self.network.id
    }

    pub fn protocol(&self) -> &dyn Protocol {
        self.protocol.as_ref()
    }

    pub fn cache(&self) -> &PerBlockCache {
        &self.cache
    }

    /// Invalidate every height-scoped response.
    pub fn on_new_block(&self, height: u64) {
        self.cache.advance(height);
    }

    pub fn snapshot(&self) -> Snapshot<'_> {
        Snapshot {
            client: self,
            view: self.cache.pin(),
        }
    }

    fn check_address(&self, address: &str) -> Result<(), ClientError> {
        check_prefix(address, &self.network.address_prefix)
            .map_err(|e| ClientError::InvalidArgument(e.to_string()))
    }
}

/// Upstream reads bound to one cache generation.
pub struct Snapshot<'a> {
    client: &'a ChainClient,
    view: CacheView<'a>,
}

impl Snapshot<'_> {
    pub fn client(&self) -> &ChainClient {
        self.client
    }

    /// Height of the pinned generation.
    pub fn height(&self) -> Option<u64> {
        self.view.height()
    }

    /// Memoized upstream response for `path`, envelope untouched.
    pub async fn raw(&self, path: &str, policy: CachePolicy) -> Result<Value, ClientError> {
        let upstream = &self.client.upstream;
        self.view
            .get(path, policy, || upstream.get_json(path))
            .await
            .map_err(|source| ClientError::UpstreamUnavailable {
                path: path.to_string(),
                source,
            })
    }

    /// Module query: strip the protocol envelope, then decode.
    pub async fn module<T: DeserializeOwned>(
        &self,
        path: &str,
        policy: CachePolicy,
    ) -> Result<T, ClientError> {
        let body = self.client.protocol.unwrap_envelope(self.raw(path, policy).await?);
        decode(path, body)
    }

    /// Query whose response is never enveloped (`blocks/...`).
    pub async fn plain<T: DeserializeOwned>(
        &self,
        path: &str,
        policy: CachePolicy,
    ) -> Result<T, ClientError> {
        decode(path, self.raw(path, policy).await?)
    }

    /// Annual provision in micro-units.
    pub async fn annual_provision(&self) -> Result<Decimal, ClientError> {
        let value: Value = self.module("minting/annual-provisions", CachePolicy::PerBlock).await?;
        let text = match &value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Ok(parse_decimal(&text).map_err(ReduceError::from)?)
    }

    pub async fn signed_blocks_window(&self) -> Result<Decimal, ClientError> {
        let params: RawSlashingParams = self.module("slashing/parameters", PARAMETERS_TTL).await?;
        Ok(optional_decimal(Some(&params.signed_blocks_window))?)
    }

    pub async fn staking_denom(&self) -> Result<String, ClientError> {
        let params: RawStakingParams = self.module("staking/parameters", PARAMETERS_TTL).await?;
        Ok(params.bond_denom)
    }
}

fn decode<T: DeserializeOwned>(path: &str, body: Value) -> Result<T, ClientError> {
    serde_json::from_value(body).map_err(|e| ClientError::UpstreamUnavailable {
        path: path.to_string(),
        source: FetchError::Decode(e),
    })
}
