//! In-process pub/sub for chain events.
//!
//! The bus is an explicit instance owned by the process: the block pipeline
//! publishes into it and the serving layer subscribes per topic.

use crate::model::{Block, Transaction};
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::debug;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Topic {
    BlockAdded { network_id: String },
    UserTransactionAdded { network_id: String, address: String },
}

impl Topic {
    pub fn block_added(network_id: &str) -> Self {
        Topic::BlockAdded {
            network_id: network_id.to_string(),
        }
    }

    pub fn user_transaction_added(network_id: &str, address: &str) -> Self {
        Topic::UserTransactionAdded {
            network_id: network_id.to_string(),
            address: address.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub enum ChainEvent {
    BlockAdded {
        network_id: String,
        block: Arc<Block>,
    },
    UserTransactionAdded {
        network_id: String,
        address: String,
        transaction: Arc<Transaction>,
    },
}

impl ChainEvent {
    pub fn topic(&self) -> Topic {
        match self {
            ChainEvent::BlockAdded { network_id, .. } => Topic::block_added(network_id),
            ChainEvent::UserTransactionAdded {
                network_id, address, ..
            } => Topic::user_transaction_added(network_id, address),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    #[error("event bus is closed")]
    Closed,
}

pub struct EventBus {
    topics: DashMap<Topic, broadcast::Sender<ChainEvent>>,
    capacity: usize,
    closed: AtomicBool,
}

impl EventBus {
    /// `capacity` bounds how far one listener may lag before it misses events.
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: DashMap::new(),
            capacity: capacity.max(1),
            closed: AtomicBool::new(false),
        }
    }

    pub fn subscribe(&self, topic: Topic) -> Result<broadcast::Receiver<ChainEvent>, BusError> {
        if self.is_closed() {
            return Err(BusError::Closed);
        }
        let sender = self
            .topics
            .entry(topic)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        Ok(sender.subscribe())
    }

    /// Deliver `event` to its topic's listeners; returns how many received it.
    ///
    /// Topics whose listeners have all gone away are dropped.
    pub fn publish(&self, event: ChainEvent) -> usize {
        if self.is_closed() {
            return 0;
        }
        let topic = event.topic();
        let delivered = match self.topics.get(&topic) {
            Some(sender) => sender.send(event).unwrap_or(0),
            None => 0,
        };
        if delivered == 0 {
            self.topics.remove_if(&topic, |_, sender| sender.receiver_count() == 0);
        }
        debug!(?topic, delivered, "event published");
        delivered
    }

    /// Stop accepting listeners and end every open subscription.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.topics.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn subscriber_count(&self, topic: &Topic) -> usize {
        self.topics.get(topic).map_or(0, |sender| sender.receiver_count())
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}
