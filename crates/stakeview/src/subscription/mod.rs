//! Block subscription pipeline.
//!
//! One worker per network: wait for a new-block height, let the node settle,
//! invalidate the cache, fetch the block with its transactions, then publish
//! `BlockAdded` and one `UserTransactionAdded` per involved address. The settle
//! delay runs from each height's arrival; blocks are processed one at a time.

pub mod source;

use crate::bus::{ChainEvent, EventBus};
use crate::client::{ChainClient, ClientError};
use crate::model::Block;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, watch};
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

pub use crate::client::ExtractionError;
pub use source::{BlockSource, ChannelSource, TendermintSource};

/// Nodes announce a block slightly before its data can be queried.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum SubscriptionError {
    #[error("websocket: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),
    #[error("invalid rpc url: {0}")]
    InvalidUrl(String),
    #[error("subscription rejected: {0}")]
    Rejected(String),
    #[error("decode event: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("stream closed before subscribing")]
    Closed,
    #[error("not subscribed")]
    NotSubscribed,
}

impl From<tokio_tungstenite::tungstenite::Error> for SubscriptionError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        SubscriptionError::WebSocket(Box::new(e))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Subscribed,
    Receiving,
    Closed,
}

#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    pub settle_delay: Duration,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

/// What one processed block produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockReport {
    pub height: u64,
    pub transactions: usize,
    /// `UserTransactionAdded` events published.
    pub notifications: usize,
    /// Transactions whose addresses could not be extracted.
    pub extraction_failures: usize,
}

pub struct BlockSubscription {
    client: Arc<ChainClient>,
    bus: Arc<EventBus>,
    config: SubscriptionConfig,
    state: watch::Sender<ConnectionState>,
}

impl BlockSubscription {
    pub fn new(client: Arc<ChainClient>, bus: Arc<EventBus>, config: SubscriptionConfig) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            client,
            bus,
            config,
            state,
        }
    }

    pub fn network_id(&self) -> &str {
        self.client.network_id()
    }

    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    fn set_state(&self, next: ConnectionState) {
        let previous = self.state.send_replace(next);
        if previous != next {
            debug!(network = self.network_id(), ?previous, ?next, "connection state");
        }
    }

    /// Drive `source` until it ends or `shutdown` fires.
    ///
    /// A failing block is logged and skipped; only connection errors end the run.
    pub async fn run<S: BlockSource>(
        &self,
        mut source: S,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), SubscriptionError> {
        self.set_state(ConnectionState::Connecting);
        let subscribed = tokio::select! {
            _ = shutdown.recv() => None,
            result = source.subscribe() => Some(result),
        };
        match subscribed {
            None => {
                self.set_state(ConnectionState::Closed);
                return Ok(());
            }
            Some(Err(err)) => {
                self.set_state(ConnectionState::Closed);
                return Err(err);
            }
            Some(Ok(())) => self.set_state(ConnectionState::Subscribed),
        }

        // Each height gets its own settle deadline from the moment it arrives,
        // so delays overlap while blocks are still handled in order.
        let mut pending: VecDeque<(Instant, u64)> = VecDeque::new();
        let mut source_open = true;
        let outcome = loop {
            if !source_open && pending.is_empty() {
                break Ok(());
            }
            let due = pending.front().map(|(at, _)| *at);
            tokio::select! {
                _ = shutdown.recv() => break Ok(()),
                next = source.next_height(), if source_open => match next {
                    Ok(Some(height)) => {
                        self.set_state(ConnectionState::Receiving);
                        pending.push_back((Instant::now() + self.config.settle_delay, height));
                    }
                    Ok(None) => source_open = false,
                    Err(err) => break Err(err),
                },
                () = time::sleep_until(due.unwrap_or_else(Instant::now)), if due.is_some() => {
                    if let Some((_, height)) = pending.pop_front() {
                        if let Err(err) = self.handle_new_block(Some(height)).await {
                            warn!(network = self.network_id(), height, error = %err, "block processing failed");
                        }
                    }
                }
            }
        };
        if !pending.is_empty() {
            debug!(network = self.network_id(), dropped = pending.len(), "pending blocks dropped");
        }
        self.set_state(ConnectionState::Closed);
        info!(network = self.network_id(), "block subscription stopped");
        outcome
    }

    /// Process one block: `None` means the latest.
    pub async fn handle_new_block(&self, height: Option<u64>) -> Result<BlockReport, ClientError> {
        if let Some(height) = height {
            self.client.on_new_block(height);
        }
        let block = self.client.snapshot().block(height).await?;
        if height.is_none() {
            self.client.on_new_block(block.height);
        }

        if let Err(err) = self.client.get_all_validators().await {
            warn!(network = self.network_id(), height = block.height, error = %err, "validator prefetch failed");
        }

        let block = Arc::new(block);
        let report = self.publish(&block);
        info!(
            network = self.network_id(),
            height = report.height,
            transactions = report.transactions,
            notifications = report.notifications,
            "block processed"
        );
        Ok(report)
    }

    fn publish(&self, block: &Arc<Block>) -> BlockReport {
        let network_id = self.network_id();
        let prefix = &self.client.network().address_prefix;
        let protocol = self.client.protocol();
        self.bus.publish(ChainEvent::BlockAdded {
            network_id: network_id.to_string(),
            block: Arc::clone(block),
        });

        let mut report = BlockReport {
            height: block.height,
            transactions: block.transactions.len(),
            notifications: 0,
            extraction_failures: 0,
        };
        for tx in &block.transactions {
            let addresses = match protocol.involved_addresses(&tx.raw, prefix) {
                Ok(addresses) => addresses,
                Err(err) => {
                    warn!(network = network_id, hash = %tx.hash, error = %err, raw = %tx.raw, "address extraction failed");
                    report.extraction_failures += 1;
                    continue;
                }
            };
            let transaction = Arc::new(tx.clone());
            let mut seen = HashSet::new();
            for address in addresses {
                if !seen.insert(address.clone()) {
                    continue;
                }
                self.bus.publish(ChainEvent::UserTransactionAdded {
                    network_id: network_id.to_string(),
                    address,
                    transaction: Arc::clone(&transaction),
                });
                report.notifications += 1;
            }
        }
        report
    }
}
