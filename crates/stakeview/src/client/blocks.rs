//! Blocks and transaction history.

use super::{ChainClient, ClientError, Snapshot};
use crate::chain::cache::CachePolicy;
use crate::chain::raw::RawBlock;
use crate::model::{Block, Transaction};
use crate::reducers::{self, parse_time};
use futures::future::try_join_all;
use serde_json::Value;
use std::collections::HashSet;
use tracing::debug;

fn tx_hash(raw: &Value) -> &str {
    raw.get("txhash").and_then(Value::as_str).unwrap_or_default()
}

/// De-duplicate by hash, order oldest first by (timestamp, hash), then reverse.
///
/// The hash tie-break makes the result independent of the order the inputs
/// arrived in. Transactions without a hash are never merged.
pub fn sort_transactions(raws: Vec<Value>) -> Vec<Value> {
    let mut seen = HashSet::new();
    let mut unique: Vec<Value> = raws
        .into_iter()
        .filter(|raw| {
            let hash = tx_hash(raw);
            hash.is_empty() || seen.insert(hash.to_string())
        })
        .collect();
    unique.sort_by_cached_key(|raw| {
        let time = raw.get("timestamp").and_then(Value::as_str).and_then(parse_time);
        (time, tx_hash(raw).to_string())
    });
    unique.reverse();
    unique
}

impl Snapshot<'_> {
    pub async fn transactions_at(&self, height: u64) -> Result<Vec<Transaction>, ClientError> {
        let body = self.raw(&format!("txs?tx.height={height}"), CachePolicy::PerBlock).await?;
        let raws = self.client().protocol().unwrap_tx_search(body);
        Ok(raws.iter().map(reducers::transaction).collect())
    }

    /// Block at `height`, or the latest block, with its transactions.
    pub async fn block(&self, height: Option<u64>) -> Result<Block, ClientError> {
        let network_id = self.client().network_id();
        match height {
            Some(height) => {
                let path = format!("blocks/{height}");
                let (raw, transactions) = futures::try_join!(
                    self.plain::<RawBlock>(&path, CachePolicy::PerBlock),
                    self.transactions_at(height)
                )?;
                Ok(reducers::block(network_id, &raw, transactions)?)
            }
            None => {
                let raw: RawBlock = self.plain("blocks/latest", CachePolicy::PerBlock).await?;
                let latest = reducers::block(network_id, &raw, Vec::new())?;
                let transactions = self.transactions_at(latest.height).await?;
                Ok(Block { transactions, ..latest })
            }
        }
    }
}

impl ChainClient {
    pub async fn get_block_by_height(&self, height: Option<u64>) -> Result<Block, ClientError> {
        self.snapshot().block(height).await
    }

    /// Full history of `address`, most recent first.
    pub async fn get_transactions(&self, address: &str) -> Result<Vec<Transaction>, ClientError> {
        self.check_address(address)?;
        let snapshot = self.snapshot();
        let protocol = self.protocol();
        let queries = protocol.transaction_queries(address);
        let groups = try_join_all(queries.iter().map(|path| snapshot.raw(path, CachePolicy::PerBlock))).await?;
        let raws: Vec<Value> = groups
            .into_iter()
            .flat_map(|body| protocol.unwrap_tx_search(body))
            .collect();
        let found = raws.len();
        let sorted = sort_transactions(raws);
        debug!(address, found, unique = sorted.len(), "transactions collected");
        Ok(sorted.iter().map(reducers::transaction).collect())
    }
}
