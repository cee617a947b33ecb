//! stakeview: aggregation and caching layer over Cosmos chain nodes.
//!
//! Joins a node's REST endpoints into validator, proposal, block and account
//! records, caches upstream reads per block, and fans new-block notifications
//! out to per-address listeners. Read-only; no signing.

pub mod bus;
pub mod chain;
pub mod client;
pub mod config;
pub mod model;
pub mod reducers;
pub mod service;
pub mod subscription;
pub mod tools;

pub use bus::{BusError, ChainEvent, EventBus, Topic};
pub use chain::{
    CachePolicy, Clock, FetchConfig, FetchError, ManualClock, MemoryUpstream, PerBlockCache,
    SystemClock, Upstream,
};
pub use client::{ChainClient, ClientError, Protocol, ProtocolVersion};
pub use config::{ConfigError, NetworkConfig, NetworksConfig};
pub use reducers::ReduceError;
pub use service::Service;
pub use subscription::{BlockSubscription, ConnectionState, SubscriptionConfig, SubscriptionError};
