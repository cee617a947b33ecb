//! Per-network wiring with an explicit lifecycle.
//!
//! `start` spawns one subscription worker per network; `stop` signals them,
//! waits for them to finish and closes the bus.

use crate::bus::EventBus;
use crate::chain::{Clock, FetchConfig, FetchError};
use crate::client::ChainClient;
use crate::config::{NetworkConfig, NetworksConfig};
use crate::subscription::{
    BlockSource, BlockSubscription, SubscriptionConfig, SubscriptionError, TendermintSource,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub struct Service {
    bus: Arc<EventBus>,
    clients: BTreeMap<String, Arc<ChainClient>>,
    subscription: SubscriptionConfig,
    shutdown: broadcast::Sender<()>,
    workers: Vec<JoinHandle<()>>,
}

impl Service {
    /// HTTP clients for every configured network.
    pub fn new(
        networks: &NetworksConfig,
        fetch: &FetchConfig,
        subscription: SubscriptionConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, FetchError> {
        let clients = networks
            .networks
            .iter()
            .map(|network| {
                ChainClient::connect(network.clone(), fetch, Arc::clone(&clock)).map(Arc::new)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::from_clients(clients, subscription))
    }

    pub fn from_clients(clients: Vec<Arc<ChainClient>>, subscription: SubscriptionConfig) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            bus: Arc::new(EventBus::default()),
            clients: clients
                .into_iter()
                .map(|client| (client.network_id().to_string(), client))
                .collect(),
            subscription,
            shutdown,
            workers: Vec::new(),
        }
    }

    pub fn bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.bus)
    }

    pub fn client(&self, network_id: &str) -> Option<Arc<ChainClient>> {
        self.clients.get(network_id).cloned()
    }

    pub fn network_ids(&self) -> impl Iterator<Item = &str> {
        self.clients.keys().map(String::as_str)
    }

    /// Subscribe every network to its Tendermint RPC.
    pub fn start(&mut self) {
        self.start_with(|network| TendermintSource::new(&network.rpc_url));
    }

    /// Subscribe every network to the source `make_source` builds for it.
    ///
    /// A network whose source cannot be built or fails later is logged and
    /// left stopped; the others keep running.
    pub fn start_with<S, F>(&mut self, mut make_source: F)
    where
        S: BlockSource + 'static,
        F: FnMut(&NetworkConfig) -> Result<S, SubscriptionError>,
    {
        for client in self.clients.values() {
            let network_id = client.network_id().to_string();
            let source = match make_source(client.network()) {
                Ok(source) => source,
                Err(err) => {
                    error!(network = %network_id, error = %err, "block source unavailable");
                    continue;
                }
            };
            let subscription =
                BlockSubscription::new(Arc::clone(client), self.bus(), self.subscription.clone());
            let shutdown = self.shutdown.subscribe();
            self.workers.push(tokio::spawn(async move {
                if let Err(err) = subscription.handle_new_block(None).await {
                    warn!(network = %network_id, error = %err, "initial block unavailable");
                }
                if let Err(err) = subscription.run(source, shutdown).await {
                    error!(network = %network_id, error = %err, "block subscription failed");
                }
            }));
            info!(network = %client.network_id(), "block subscription started");
        }
    }

    /// Signal every worker, wait for them, then close the bus.
    pub async fn stop(self) {
        let _ = self.shutdown.send(());
        for worker in self.workers {
            if let Err(err) = worker.await {
                warn!(error = %err, "subscription worker ended abnormally");
            }
        }
        self.bus.close();
        info!("service stopped");
    }
}
