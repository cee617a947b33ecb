//! Query client and block pipeline against a node speaking the enveloped protocol.

mod common;

use common::{DELEGATOR, NETWORK, OPERATOR_A, OPERATOR_B, RECIPIENT};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use stakeview::subscription::BlockReport;
use stakeview::{
    BlockSubscription, ChainClient, ChainEvent, Clock, EventBus, ManualClock, MemoryUpstream,
    NetworkConfig, ProtocolVersion, SubscriptionConfig, Topic,
};
use std::sync::Arc;
use std::time::Duration;
use time::macros::datetime;

const PUBKEY_A: &str =
    "cosmosvalconspub1zcjduepqzyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zygsgxfmk0";
const CONSENSUS_A: &str = "cosmosvalcons1qt2yngclhvn8ere496vk3fu78e0ujhqmmh33gn";
const PUBKEY_B: &str =
    "cosmosvalconspub1zcjduepqyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3zyg3qmjhw0r";
const CONSENSUS_B: &str = "cosmosvalcons1naew5r85j5mw83nv0plhq5vxm7dyx7qgrg4vle";

fn enveloped(result: Value) -> Value {
    json!({"height": "100", "result": result})
}

fn validator(operator: &str, pubkey: &str, tokens: &str) -> Value {
    json!({
        "operator_address": operator,
        "consensus_pubkey": pubkey,
        "jailed": false,
        "status": 2,
        "tokens": tokens,
        "delegator_shares": format!("{tokens}.000000000000000000"),
        "description": {"moniker": operator},
        "commission": {
            "commission_rates": {"rate": "0.100000000000000000", "max_rate": "0.2", "max_change_rate": "0.01"},
            "update_time": "2020-01-01T00:00:00Z"
        }
    })
}

fn node() -> Arc<MemoryUpstream> {
    let up = Arc::new(MemoryUpstream::new());
    up.insert(
        "staking/validators?status=bonded",
        enveloped(json!([
            validator(OPERATOR_A, PUBKEY_A, "750000000"),
            validator(OPERATOR_B, PUBKEY_B, "250000000")
        ])),
    );
    up.insert("staking/validators?status=unbonded", enveloped(json!([])));
    up.insert("staking/validators?status=unbonding", enveloped(Value::Null));
    // consensus keys arrive in object form, so the join falls back to the address
    up.insert(
        "validatorsets/latest",
        enveloped(json!({"block_height": "100", "validators": [
            {"address": CONSENSUS_A, "pub_key": {"type": "tendermint/PubKeyEd25519", "value": "ERER"}, "voting_power": "75"},
            {"address": CONSENSUS_B, "pub_key": {"type": "tendermint/PubKeyEd25519", "value": "IiIi"}, "voting_power": "25"}
        ]})),
    );
    up.insert("minting/annual-provisions", enveloped(json!("1000000000000")));
    up.insert("slashing/parameters", enveloped(json!({"signed_blocks_window": "100"})));
    up.insert("staking/parameters", enveloped(json!({"bond_denom": "uatom"})));
    up.insert(
        "slashing/signing_infos",
        enveloped(json!([{
            "address": CONSENSUS_A,
            "start_height": "4",
            "missed_blocks_counter": "5",
            "jailed_until": "1970-01-01T00:00:00Z"
        }])),
    );
    up
}

fn client(up: &Arc<MemoryUpstream>) -> ChainClient {
    let network = NetworkConfig {
        id: NETWORK.to_string(),
        api_url: "http://localhost:1317".to_string(),
        rpc_url: "http://localhost:26657".to_string(),
        address_prefix: "cosmos".to_string(),
        protocol: ProtocolVersion::V2,
    };
    let clock: Arc<dyn Clock> = Arc::new(ManualClock::new(datetime!(2020-06-01 0:00 UTC)));
    ChainClient::new(network, up.clone(), clock)
}

#[tokio::test]
async fn envelope_validators_join_by_consensus_address() {
    let up = node();
    let validators = client(&up).get_all_validators().await.unwrap();
    assert_eq!(validators.len(), 2);
    let alpha = &validators[0];
    assert_eq!(alpha.voting_power.to_string(), "0.750000000");
    assert_eq!(alpha.uptime_percentage.to_string(), "0.950000");
    assert_eq!(alpha.start_height.as_deref(), Some("4"));
    assert_eq!(alpha.commission.rate, Decimal::new(1, 1));

    // absent from the batch: zero default
    let beta = &validators[1];
    assert_eq!(beta.voting_power.to_string(), "0.250000000");
    assert_eq!(beta.start_height.as_deref(), Some("0"));
    assert_eq!(beta.uptime_percentage.to_string(), "1.000000");
    assert_eq!(up.hits("slashing/signing_infos"), 1);
}

#[tokio::test]
async fn envelope_failed_signing_batch_degrades_every_validator() {
    let up = node();
    up.fail("slashing/signing_infos", 500);
    let validators = client(&up).get_all_validators().await.unwrap();
    assert!(validators
        .iter()
        .all(|v| v.signing_info.as_ref().unwrap().missed_blocks_counter == "0"));
}

#[tokio::test]
async fn envelope_rewards_come_from_one_batch() {
    let up = node();
    up.insert(
        &format!("staking/delegators/{DELEGATOR}/delegations"),
        enveloped(json!([
            {"delegator_address": DELEGATOR, "validator_address": OPERATOR_A, "shares": "1000000.0"},
            {"delegator_address": DELEGATOR, "validator_address": OPERATOR_B, "shares": "1000000.0"}
        ])),
    );
    up.insert(
        &format!("distribution/delegators/{DELEGATOR}/rewards"),
        enveloped(json!({
            "rewards": [{"validator_address": OPERATOR_A, "reward": [{"denom": "uatom", "amount": "2500000.000000000000000000"}]}],
            "total": [{"denom": "uatom", "amount": "2500000.000000000000000000"}]
        })),
    );
    let rewards = client(&up).get_rewards(Some(DELEGATOR), None).await.unwrap();
    assert_eq!(rewards.len(), 2);
    assert_eq!(rewards[0].amount.to_string(), "2.500000");
    assert_eq!(rewards[1].amount, Decimal::ZERO);
    assert_eq!(rewards[1].denom, "ATOM");
    assert_eq!(up.hits(&format!("distribution/delegators/{DELEGATOR}/rewards")), 1);
    assert_eq!(
        up.hits(&format!("distribution/delegators/{DELEGATOR}/rewards/{OPERATOR_A}")),
        0
    );
}

#[tokio::test]
async fn envelope_history_reads_the_txs_field() {
    let up = node();
    let tx = |hash: &str, time: &str| {
        json!({"txhash": hash, "height": "9", "timestamp": time, "code": 0,
               "tx": {"value": {"msg": [{"type": "cosmos-sdk/MsgSend", "value": {}}]}}})
    };
    up.insert(
        &format!("txs?message.sender={DELEGATOR}&limit=1000000000"),
        json!({"total_count": "2", "txs": [tx("B", "2020-01-02T00:00:00Z"), tx("A", "2020-01-01T00:00:00Z")]}),
    );
    up.insert(
        &format!("txs?transfer.recipient={DELEGATOR}&limit=1000000000"),
        json!({"total_count": "1", "txs": [tx("A", "2020-01-01T00:00:00Z")]}),
    );
    let history = client(&up).get_transactions(DELEGATOR).await.unwrap();
    let hashes: Vec<&str> = history.iter().map(|t| t.hash.as_str()).collect();
    assert_eq!(hashes, vec!["B", "A"]);
}

#[tokio::test]
async fn envelope_block_events_fan_out() {
    let up = node();
    up.insert(
        "blocks/100",
        json!({
            "block_id": {"hash": "F00D"},
            "block": {"header": {"chain_id": "cosmoshub-4", "height": "100", "time": "2021-03-01T00:00:00Z", "proposer_address": "AB"}}
        }),
    );
    up.insert(
        "txs?tx.height=100",
        json!({"total_count": "2", "txs": [
            {
                "txhash": "E1", "height": "100", "timestamp": "2021-03-01T00:00:00Z", "code": 0,
                "events": [
                    {"type": "message", "attributes": [{"key": "action", "value": "send"}, {"key": "sender", "value": DELEGATOR}]},
                    {"type": "transfer", "attributes": [{"key": "recipient", "value": RECIPIENT}, {"key": "sender", "value": DELEGATOR}]}
                ],
                "tx": {"value": {"msg": [{"type": "cosmos-sdk/MsgSend", "value": {}}]}}
            },
            {
                "txhash": "E2", "height": "100", "timestamp": "2021-03-01T00:00:00Z", "code": 5,
                "tx": {"value": {"msg": [{"type": "cosmos-sdk/MsgSend", "value": {}}]}}
            }
        ]}),
    );
    let bus = Arc::new(EventBus::default());
    let mut recipient = bus
        .subscribe(Topic::user_transaction_added(NETWORK, RECIPIENT))
        .unwrap();
    let subscription = BlockSubscription::new(
        Arc::new(client(&up)),
        Arc::clone(&bus),
        SubscriptionConfig {
            settle_delay: Duration::ZERO,
        },
    );
    let report = subscription.handle_new_block(Some(100)).await.unwrap();
    assert_eq!(
        report,
        BlockReport {
            height: 100,
            transactions: 2,
            notifications: 2,
            extraction_failures: 0,
        }
    );
    match recipient.try_recv().unwrap() {
        ChainEvent::UserTransactionAdded { transaction, .. } => {
            assert_eq!(transaction.hash, "E1");
            assert!(transaction.success);
        }
        other => panic!("unexpected {other:?}"),
    }
}
