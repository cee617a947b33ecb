//! Query client against a canned legacy node.

mod common;

use common::*;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use stakeview::model::{ProposalStatus, StatusDetail, ValidatorStatus};
use stakeview::{ClientError, MemoryUpstream};
use std::str::FromStr;
use std::sync::Arc;

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn node() -> Arc<MemoryUpstream> {
    let up = Arc::new(MemoryUpstream::new());
    seed_validators(&up);
    up
}

#[tokio::test]
async fn integration_validator_set_is_joined() {
    let up = node();
    let client = client(&up);
    let validators = client.get_all_validators().await.unwrap();
    assert_eq!(validators.len(), 4);

    let total: Decimal = validators.iter().map(|v| v.voting_power).sum();
    assert!(total <= Decimal::ONE);
    assert!(validators.iter().all(|v| v.voting_power >= Decimal::ZERO));

    let by = |op: &str| validators.iter().find(|v| v.operator_address == op).unwrap();
    let alpha = by(OPERATOR_A);
    assert_eq!(alpha.voting_power.to_string(), "0.600000000");
    assert_eq!(alpha.status, ValidatorStatus::Active);
    assert_eq!(alpha.tokens.to_string(), "600.000000");
    assert_eq!(alpha.uptime_percentage.to_string(), "0.990000");
    assert_eq!(alpha.website, "https://alpha.example");
    assert!(alpha.expected_returns > Decimal::ZERO);

    assert_eq!(by(OPERATOR_B).voting_power, dec("0.4"));

    let gamma = by(OPERATOR_C);
    assert!(gamma.jailed);
    assert_eq!(gamma.status, ValidatorStatus::Inactive);
    assert_eq!(gamma.status_detailed, StatusDetail::Banned);
    assert_eq!(gamma.voting_power, Decimal::ZERO);
    assert_eq!(gamma.expected_returns, Decimal::ZERO);
    assert_eq!(gamma.website, "");
}

#[tokio::test]
async fn integration_excepted_signing_info_is_zero_without_a_request() {
    let up = node();
    let client = client(&up);
    let validators = client.get_all_validators().await.unwrap();
    let delta = validators
        .iter()
        .find(|v| v.operator_address == OPERATOR_D)
        .unwrap();
    let info = delta.signing_info.as_ref().unwrap();
    assert_eq!(info.missed_blocks_counter, "0");
    assert_eq!(info.start_height, "0");
    assert_eq!(delta.status_detailed, StatusDetail::Inactive);
    assert_eq!(up.hits(&signing_info_path(&delta.consensus_pubkey)), 0);
    assert_eq!(up.hits(&signing_info_path("cosmosvalconspub1validatora")), 1);
}

#[tokio::test]
async fn integration_unavailable_signing_info_degrades_to_zero() {
    let up = node();
    up.fail(&signing_info_path("cosmosvalconspub1validatorb"), 500);
    let client = client(&up);
    let validators = client.get_all_validators().await.unwrap();
    let beta = validators
        .iter()
        .find(|v| v.operator_address == OPERATOR_B)
        .unwrap();
    assert_eq!(beta.signing_info.as_ref().unwrap().missed_blocks_counter, "0");
    assert_eq!(beta.uptime_percentage.to_string(), "1.000000");
}

#[tokio::test]
async fn integration_one_fetch_per_block() {
    let up = node();
    let client = client(&up);
    assert_eq!(client.get_bonded_tokens().await.unwrap().to_string(), "100000.000000");
    client.get_bonded_tokens().await.unwrap();
    assert_eq!(up.hits("staking/pool"), 1);

    client.on_new_block(101);
    client.get_bonded_tokens().await.unwrap();
    assert_eq!(up.hits("staking/pool"), 2);
}

#[tokio::test]
async fn integration_parameters_outlive_blocks() {
    let up = node();
    let client = client(&up);
    client.get_all_validators().await.unwrap();
    client.on_new_block(101);
    client.get_all_validators().await.unwrap();
    assert_eq!(up.hits("validatorsets/latest"), 2);
    assert_eq!(up.hits("slashing/parameters"), 1);
    assert_eq!(up.hits(&signing_info_path("cosmosvalconspub1validatora")), 1);
}

#[tokio::test]
async fn integration_transactions_are_deduplicated_and_ordered() {
    let fetch_with = |sender: Vec<&str>, recipient: Vec<&str>| {
        let up = Arc::new(MemoryUpstream::new());
        seed_empty_history(&up, DELEGATOR);
        let list = |names: Vec<&str>| json!(names.into_iter().map(tx).collect::<Vec<_>>());
        up.insert(&history_path("sender", DELEGATOR), list(sender));
        up.insert(&history_path("recipient", DELEGATOR), list(recipient));
        up
    };

    let up = fetch_with(vec!["first", "second"], vec!["second", "third"]);
    let forward = client(&up).get_transactions(DELEGATOR).await.unwrap();
    let up = fetch_with(vec!["third", "second"], vec!["first", "second"]);
    let reversed = client(&up).get_transactions(DELEGATOR).await.unwrap();

    let hashes = |list: &[stakeview::model::Transaction]| {
        list.iter().map(|t| t.hash.clone()).collect::<Vec<_>>()
    };
    assert_eq!(hashes(&forward), vec!["2C3D", "1B2E", "0A1F"]);
    assert_eq!(hashes(&forward), hashes(&reversed));
    assert_eq!(forward[0].height, Some(97));
    assert!(forward.iter().all(|t| t.success));
}

#[tokio::test]
async fn integration_foreign_prefix_is_rejected_before_any_request() {
    let up = node();
    let client = client(&up);
    let err = client.get_balances(TERRA_ADDRESS).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    let err = client.get_transactions("not-an-address").await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert_eq!(up.total_hits(), 0);
}

#[tokio::test]
async fn integration_rewards_need_an_address() {
    let up = node();
    let client = client(&up);
    let err = client.get_rewards(None, None).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidArgument(_)));
    assert_eq!(up.total_hits(), 0);
}

fn seed_delegator(up: &MemoryUpstream) {
    up.insert(
        &format!("staking/delegators/{DELEGATOR}/delegations"),
        json!([
            {"delegator_address": DELEGATOR, "validator_address": OPERATOR_A, "shares": "50000000.000000000000000000"},
            {"delegator_address": DELEGATOR, "validator_address": OPERATOR_B, "shares": "0.500000000000000000"}
        ]),
    );
    up.insert(
        &format!("distribution/delegators/{DELEGATOR}/rewards/{OPERATOR_A}"),
        json!([{"denom": "uatom", "amount": "1500000"}]),
    );
    up.insert(
        &format!("distribution/delegators/{DELEGATOR}/rewards/{OPERATOR_B}"),
        json!(null),
    );
    up.insert(
        &format!("staking/delegators/{DELEGATOR}/unbonding_delegations"),
        json!([{
            "delegator_address": DELEGATOR,
            "validator_address": OPERATOR_B,
            "entries": [{
                "creation_height": "90",
                "completion_time": "2020-06-20T00:00:00Z",
                "initial_balance": "3000000",
                "balance": "3000000"
            }]
        }]),
    );
    up.insert(
        &format!("bank/balances/{DELEGATOR}"),
        json!([{"denom": "uatom", "amount": "2000000"}, {"denom": "uluna", "amount": "7"}]),
    );
}

#[tokio::test]
async fn integration_delegations_convert_shares_to_tokens() {
    let up = node();
    seed_delegator(&up);
    let client = client(&up);
    let delegations = client.get_delegations(DELEGATOR).await.unwrap();
    assert_eq!(delegations.len(), 2);
    assert_eq!(delegations[0].amount.to_string(), "50.000000");
    assert_eq!(
        delegations[0].validator.as_ref().unwrap().operator_address,
        OPERATOR_A
    );
    assert_eq!(delegations[1].amount.to_string(), "0.000001");
}

#[tokio::test]
async fn integration_missing_delegation_reads_as_zero() {
    let up = node();
    let client = client(&up);
    let delegation = client
        .get_delegation_for_validator(DELEGATOR, OPERATOR_B)
        .await
        .unwrap();
    assert_eq!(delegation.amount, Decimal::ZERO);
    assert_eq!(delegation.validator_address, OPERATOR_B);
    let validator = delegation.validator.unwrap();
    assert_eq!(validator.self_stake, Some(Decimal::ZERO));
}

#[tokio::test]
async fn integration_validator_carries_self_stake() {
    let up = node();
    up.insert(
        &format!("staking/delegators/{ACCOUNT_A}/delegations/{OPERATOR_A}"),
        json!({"delegator_address": ACCOUNT_A, "validator_address": OPERATOR_A, "shares": "300000000.000000000000000000"}),
    );
    let client = client(&up);
    let alpha = client.get_validator_by_address(OPERATOR_A).await.unwrap().unwrap();
    assert_eq!(alpha.self_stake.unwrap().to_string(), "300.000000");
    assert!(client
        .get_validator_by_address(TERRA_ADDRESS)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn integration_rewards_per_delegation() {
    let up = node();
    seed_delegator(&up);
    let client = client(&up);
    let rewards = client.get_rewards(Some(DELEGATOR), None).await.unwrap();
    assert_eq!(rewards.len(), 2);
    let alpha = rewards
        .iter()
        .find(|r| r.validator_address.as_deref() == Some(OPERATOR_A))
        .unwrap();
    assert_eq!(alpha.denom, "ATOM");
    assert_eq!(alpha.amount.to_string(), "1.500000");
    let beta = rewards
        .iter()
        .find(|r| r.validator_address.as_deref() == Some(OPERATOR_B))
        .unwrap();
    assert_eq!(beta.denom, "ATOM");
    assert_eq!(beta.amount, Decimal::ZERO);
}

#[tokio::test]
async fn integration_overview_sums_stake() {
    let up = node();
    seed_delegator(&up);
    let client = client(&up);
    let overview = client.get_overview(DELEGATOR).await.unwrap();
    assert_eq!(overview.liquid_stake.to_string(), "2.000000");
    assert_eq!(overview.total_rewards.to_string(), "1.500000");
    assert_eq!(overview.total_stake.to_string(), "55.000001");

    let balances = client.get_balances(DELEGATOR).await.unwrap();
    assert_eq!(balances[1].denom, "LUNA");
    let undelegations = client.get_undelegations(DELEGATOR).await.unwrap();
    assert_eq!(undelegations[0].end_time, "2020-06-20T00:00:00Z");
    assert_eq!(undelegations[0].amount.to_string(), "3.000000");
}

#[tokio::test]
async fn integration_proposals_newest_first() {
    let up = node();
    up.insert("gov/proposals", load_fixture("proposals.json"));
    up.insert(
        "gov/proposals/7/tally",
        json!({"yes": "6000000", "abstain": "0", "no": "0", "no_with_veto": "0"}),
    );
    let client = client(&up);
    let proposals = client.get_all_proposals().await.unwrap();
    let ids: Vec<u64> = proposals.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![7, 5, 3]);

    let voting = &proposals[0];
    assert_eq!(voting.status, ProposalStatus::VotingPeriod);
    assert_eq!(voting.tally.total.to_string(), "6.000000");
    assert_eq!(voting.tally.total_voted_percentage, dec("0.00006"));
    assert_eq!(voting.deposit.to_string(), "512.000000");
    assert!(voting.proposer.is_none());

    let passed = &proposals[2];
    assert_eq!(passed.status, ProposalStatus::Passed);
    assert_eq!(passed.tally.total_voted_percentage, Decimal::NEGATIVE_ONE);
    assert_eq!(passed.tally.yes.to_string(), "90.000000");
    assert_eq!(up.hits("gov/proposals/3/tally"), 0);
    assert_eq!(up.hits("gov/proposals/5/tally"), 0);
}

#[tokio::test]
async fn integration_proposal_with_unknown_status_is_skipped() {
    let up = node();
    let mut proposals = load_fixture("proposals.json");
    let mut unspecified = proposals[0].clone();
    unspecified["id"] = json!("9");
    unspecified["proposal_status"] = json!("PROPOSAL_STATUS_UNSPECIFIED");
    if let Value::Array(list) = &mut proposals {
        list.push(unspecified);
    }
    up.insert("gov/proposals", proposals);
    up.insert(
        "gov/proposals/7/tally",
        json!({"yes": "6000000", "abstain": "0", "no": "0", "no_with_veto": "0"}),
    );
    let listed = client(&up).get_all_proposals().await.unwrap();
    let ids: Vec<u64> = listed.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![7, 5, 3]);
    assert_eq!(up.hits("gov/proposals/9/tally"), 0);
}

#[tokio::test]
async fn integration_single_proposal_with_proposer() {
    let up = node();
    let proposals = load_fixture("proposals.json");
    up.insert("gov/proposals/7", proposals[1].clone());
    up.insert(
        "gov/proposals/7/tally",
        json!({"yes": "6000000", "abstain": "0", "no": "0", "no_with_veto": "0"}),
    );
    up.insert(
        "gov/proposals/7/proposer",
        json!({"proposal_id": "7", "proposer": DELEGATOR}),
    );
    up.fail("staking/pool", 500);
    let client = client(&up);
    let proposal = client.get_proposal_by_id(7).await.unwrap();
    assert_eq!(proposal.proposer.as_deref(), Some(DELEGATOR));
    assert_eq!(proposal.title, "Community pool spend");
    assert_eq!(proposal.tally.total_voted_percentage, Decimal::NEGATIVE_ONE);
}

#[tokio::test]
async fn integration_latest_block_with_transactions() {
    let up = node();
    seed_block(&up);
    let client = client(&up);
    let block = client.get_block_by_height(None).await.unwrap();
    assert_eq!(block.height, 100);
    assert_eq!(block.network_id, NETWORK);
    assert_eq!(block.chain_id, "cosmoshub-3");
    assert_eq!(block.hash, "5C8E1A7B3F");
    assert_eq!(block.transactions.len(), 2);
    assert_eq!(block.transactions[0].hash, "3D4C");

    let same = client.get_block_by_height(Some(100)).await.unwrap();
    assert_eq!(same.transactions.len(), 2);
    assert_eq!(up.hits("txs?tx.height=100"), 1);
}

#[tokio::test]
async fn integration_upstream_failure_is_reported() {
    let up = node();
    up.fail("gov/proposals", 503);
    let client = client(&up);
    let err = client.get_all_proposals().await.unwrap_err();
    assert!(err.is_status());
    assert!(matches!(err, ClientError::UpstreamUnavailable { ref path, .. } if path == "gov/proposals"));
}
