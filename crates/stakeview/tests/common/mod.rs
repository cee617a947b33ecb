//! Fixture loading and a canned legacy node shared by the integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use stakeview::client::{LegacyProtocol, Protocol};
use stakeview::{ChainClient, Clock, ManualClock, MemoryUpstream, NetworkConfig, ProtocolVersion};
use std::path::Path;
use std::sync::Arc;
use time::macros::datetime;

pub const NETWORK: &str = "cosmos-hub";

pub const OPERATOR_A: &str = "cosmosvaloper1qyqszqgpqyqszqgpqyqszqgpqyqszqgph84tp0";
pub const OPERATOR_B: &str = "cosmosvaloper1qgpqyqszqgpqyqszqgpqyqszqgpqyqszxrnw2e";
pub const OPERATOR_C: &str = "cosmosvaloper1qvpsxqcrqvpsxqcrqvpsxqcrqvpsxqcr8nj0qc";
pub const OPERATOR_D: &str = "cosmosvaloper1qszqgpqyqszqgpqyqszqgpqyqszqgpqy8r428y";
/// Account of operator A.
pub const ACCOUNT_A: &str = "cosmos1qyqszqgpqyqszqgpqyqszqgpqyqszqgpjnp7du";
pub const DELEGATOR: &str = "cosmos1pyysjzgfpyysjzgfpyysjzgfpyysjzgfam50we";
pub const RECIPIENT: &str = "cosmos1pqyqszqgpqyqszqgpqyqszqgpqyqszqgut4wyc";
/// Valid bech32, foreign prefix.
pub const TERRA_ADDRESS: &str = "terra1pyysjzgfpyysjzgfpyysjzgfpyysjzgfmlw0ve";

pub fn load_fixture(path: &str) -> Value {
    let root = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../testdata");
    let full = root.join(path);
    let s =
        std::fs::read_to_string(&full).unwrap_or_else(|e| panic!("read {}: {}", full.display(), e));
    serde_json::from_str(&s).unwrap_or_else(|e| panic!("parse {}: {}", path, e))
}

pub fn network() -> NetworkConfig {
    NetworkConfig {
        id: NETWORK.to_string(),
        api_url: "http://localhost:1317".to_string(),
        rpc_url: "http://localhost:26657".to_string(),
        address_prefix: "cosmos".to_string(),
        protocol: ProtocolVersion::V0,
    }
}

pub fn clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(datetime!(2020-06-01 0:00 UTC)))
}

pub fn client(upstream: &Arc<MemoryUpstream>) -> ChainClient {
    ChainClient::new(network(), upstream.clone(), clock() as Arc<dyn Clock>)
}

pub fn tx(name: &str) -> Value {
    load_fixture("txs.json")[name].clone()
}

pub fn signing_info_path(pubkey: &str) -> String {
    format!("slashing/validators/{pubkey}/signing_info")
}

/// Everything the validator join reads.
pub fn seed_validators(up: &MemoryUpstream) {
    let validators = load_fixture("validators.json");
    for status in ["bonded", "unbonded", "unbonding"] {
        up.insert(
            &format!("staking/validators?status={status}"),
            validators[status].clone(),
        );
    }
    up.insert("validatorsets/latest", load_fixture("validatorset_latest.json"));
    up.insert("minting/annual-provisions", json!("1000000000000.000000000000000000"));
    up.insert("slashing/parameters", json!({"signed_blocks_window": "10000"}));
    up.insert("staking/parameters", json!({"bond_denom": "uatom"}));
    up.insert(
        "staking/pool",
        json!({"not_bonded_tokens": "5000000", "bonded_tokens": "100000000000"}),
    );
    let infos = load_fixture("signing_infos.json");
    if let Value::Object(infos) = infos {
        for (pubkey, info) in infos {
            up.insert(&signing_info_path(&pubkey), info);
        }
    }
}

/// Block 100 with one tagged and one untagged transaction.
pub fn seed_block(up: &MemoryUpstream) {
    let block = load_fixture("block_100.json");
    up.insert("blocks/100", block.clone());
    up.insert("blocks/latest", block);
    up.insert("txs?tx.height=100", json!([tx("in_block"), tx("untagged")]));
}

/// Empty answers for every history search of `address`.
pub fn seed_empty_history(up: &MemoryUpstream, address: &str) {
    for path in LegacyProtocol.transaction_queries(address) {
        up.insert(&path, json!([]));
    }
}

pub fn history_path(query: &str, address: &str) -> String {
    format!("txs?{query}={address}&limit=1000000000")
}
