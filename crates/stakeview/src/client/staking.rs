//! Validators, balances, delegations, rewards and the account overview.

use super::{ChainClient, ClientError, Snapshot};
use crate::chain::cache::CachePolicy;
use crate::chain::raw::{RawCoin, RawDelegation, RawPool, RawUnbonding, RawValidator, RawValidatorSet};
use crate::model::{Coin, Delegation, Overview, Reward, Undelegation, Validator};
use crate::reducers::{self, optional_decimal, ValidatorInput};
use crate::tools::{display_amount, fraction, operator_to_account, pubkey_to_consensus_address};
use futures::future::try_join_all;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::{debug, warn};

const STATUS_BUCKETS: [&str; 3] = ["unbonding", "bonded", "unbonded"];

fn by_operator(validators: Vec<Validator>) -> HashMap<String, Validator> {
    validators
        .into_iter()
        .map(|v| (v.operator_address.clone(), v))
        .collect()
}

impl Snapshot<'_> {
    /// Every validator of the three bonding buckets, joined with the latest
    /// consensus set and signing infos.
    pub async fn validators(&self) -> Result<Vec<Validator>, ClientError> {
        let client = self.client();
        let buckets = try_join_all(STATUS_BUCKETS.iter().map(|status| async move {
            let path = format!("staking/validators?status={status}");
            let list: Option<Vec<RawValidator>> = self.module(&path, CachePolicy::PerBlock).await?;
            Ok::<_, ClientError>(list.unwrap_or_default())
        }));
        let (buckets, set, annual_provision, window) = futures::try_join!(
            buckets,
            self.module::<RawValidatorSet>("validatorsets/latest", CachePolicy::PerBlock),
            self.annual_provision(),
            self.signed_blocks_window(),
        )?;
        let raws: Vec<RawValidator> = buckets.into_iter().flatten().collect();
        let signing_infos = client.protocol().signing_infos(self, &raws).await;

        let mut by_pubkey = HashMap::new();
        let mut by_address = HashMap::new();
        let mut total_power = Decimal::ZERO;
        for member in &set.validators {
            let power = optional_decimal(Some(&member.voting_power))?;
            total_power += power;
            by_pubkey.insert(member.pub_key.as_str(), power);
            by_address.insert(member.address.as_str(), power);
        }

        let now = client.clock.now();
        let validators = raws
            .iter()
            .map(|raw| {
                let power = by_pubkey
                    .get(raw.consensus_pubkey.as_str())
                    .copied()
                    .or_else(|| {
                        pubkey_to_consensus_address(&raw.consensus_pubkey)
                            .ok()
                            .and_then(|address| by_address.get(address.as_str()).copied())
                    })
                    .unwrap_or(Decimal::ZERO);
                let input = ValidatorInput {
                    raw,
                    voting_power: fraction(power, total_power),
                    signing_info: signing_infos.get(&raw.consensus_pubkey),
                    signed_blocks_window: window,
                    annual_provision,
                };
                reducers::validator(client.network_id(), &input, now)
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(count = validators.len(), height = ?self.height(), "validators reduced");
        Ok(validators)
    }

    /// Bonded pool in micro-units; `None` when the pool cannot be fetched.
    pub async fn bonded_micro(&self) -> Option<Decimal> {
        match self.module::<RawPool>("staking/pool", CachePolicy::PerBlock).await {
            Ok(pool) => optional_decimal(Some(&pool.bonded_tokens)).ok(),
            Err(err) => {
                warn!(error = %err, "bonded pool unavailable");
                None
            }
        }
    }

    async fn raw_delegations(&self, delegator: &str) -> Result<Vec<RawDelegation>, ClientError> {
        let path = format!("staking/delegators/{delegator}/delegations");
        let list: Option<Vec<RawDelegation>> = self.module(&path, CachePolicy::PerBlock).await?;
        Ok(list.unwrap_or_default())
    }

    async fn delegation_to(&self, delegator: &str, operator: &str) -> Result<RawDelegation, ClientError> {
        let path = format!("staking/delegators/{delegator}/delegations/{operator}");
        self.module(&path, CachePolicy::PerBlock).await
    }

    pub async fn delegations(&self, delegator: &str) -> Result<Vec<Delegation>, ClientError> {
        let (raws, validators) = futures::try_join!(self.raw_delegations(delegator), self.validators())?;
        let validators = by_operator(validators);
        raws.iter()
            .map(|raw| reducers::delegation(raw, validators.get(&raw.validator_address)))
            .collect::<Result<_, _>>()
            .map_err(ClientError::from)
    }

    pub async fn undelegations(&self, delegator: &str) -> Result<Vec<Undelegation>, ClientError> {
        let path = format!("staking/delegators/{delegator}/unbonding_delegations");
        let (raws, validators) = futures::try_join!(
            self.module::<Option<Vec<RawUnbonding>>>(&path, CachePolicy::PerBlock),
            self.validators()
        )?;
        let validators = by_operator(validators);
        let mut list = Vec::new();
        for raw in raws.unwrap_or_default() {
            list.extend(reducers::undelegations(&raw, &validators)?);
        }
        Ok(list)
    }

    pub async fn balances(&self, address: &str) -> Result<Vec<Coin>, ClientError> {
        let path = format!("bank/balances/{address}");
        let coins: Option<Vec<RawCoin>> = self.module(&path, CachePolicy::PerBlock).await?;
        coins
            .unwrap_or_default()
            .iter()
            .map(|c| reducers::coin(Some(c)))
            .collect::<Result<_, _>>()
            .map_err(ClientError::from)
    }

    pub async fn validator_by_address(&self, operator: &str) -> Result<Option<Validator>, ClientError> {
        let account = operator_to_account(operator, &self.client().network.address_prefix)
            .map_err(|e| ClientError::InvalidArgument(e.to_string()))?;
        let (validators, self_delegation) =
            futures::join!(self.validators(), self.delegation_to(&account, operator));
        let Some(mut validator) = validators?.into_iter().find(|v| v.operator_address == operator) else {
            return Ok(None);
        };
        let self_stake = match self_delegation {
            Ok(raw) => reducers::delegation(&raw, Some(&validator))?.amount,
            Err(err) => {
                debug!(operator, error = %err, "self delegation unavailable");
                display_amount(Decimal::ZERO)
            }
        };
        validator.self_stake = Some(self_stake);
        Ok(Some(validator))
    }

    /// Reward coins at `path` attributed to one validator.
    async fn validator_reward(&self, path: &str, operator: &str) -> Result<Reward, ClientError> {
        let (coins, validators, denom) = futures::try_join!(
            self.module::<Option<Vec<RawCoin>>>(path, CachePolicy::PerBlock),
            self.validators(),
            self.staking_denom()
        )?;
        let record = validators.into_iter().find(|v| v.operator_address == operator);
        Ok(reducers::reward(
            Some(operator.to_string()),
            &coins.unwrap_or_default(),
            record,
            &denom,
        )?)
    }

    async fn rewards_of_delegator(
        &self,
        delegator: &str,
        delegations: &[Delegation],
    ) -> Result<Vec<Reward>, ClientError> {
        let operators: Vec<String> = delegations.iter().map(|d| d.validator_address.clone()).collect();
        let (by_validator, denom) = futures::try_join!(
            self.client().protocol().delegator_rewards(self, delegator, &operators),
            self.staking_denom()
        )?;
        delegations
            .iter()
            .map(|d| {
                let coins = by_validator.get(&d.validator_address).map_or(&[][..], Vec::as_slice);
                reducers::reward(Some(d.validator_address.clone()), coins, d.validator.clone(), &denom)
            })
            .collect::<Result<_, _>>()
            .map_err(ClientError::from)
    }
}

impl ChainClient {
    pub async fn get_all_validators(&self) -> Result<Vec<Validator>, ClientError> {
        self.snapshot().validators().await
    }

    /// The validator with its self-delegation; `None` for an unknown operator.
    pub async fn get_validator_by_address(&self, operator: &str) -> Result<Option<Validator>, ClientError> {
        self.snapshot().validator_by_address(operator).await
    }

    pub async fn get_balances(&self, address: &str) -> Result<Vec<Coin>, ClientError> {
        self.check_address(address)?;
        self.snapshot().balances(address).await
    }

    pub async fn get_delegations(&self, delegator: &str) -> Result<Vec<Delegation>, ClientError> {
        self.check_address(delegator)?;
        self.snapshot().delegations(delegator).await
    }

    pub async fn get_undelegations(&self, delegator: &str) -> Result<Vec<Undelegation>, ClientError> {
        self.check_address(delegator)?;
        self.snapshot().undelegations(delegator).await
    }

    /// A status error on the delegation endpoint means there is no delegation.
    pub async fn get_delegation_for_validator(
        &self,
        delegator: &str,
        operator: &str,
    ) -> Result<Delegation, ClientError> {
        self.check_address(delegator)?;
        let snapshot = self.snapshot();
        let (delegation, validator) = futures::join!(
            snapshot.delegation_to(delegator, operator),
            snapshot.validator_by_address(operator)
        );
        let raw = match delegation {
            Ok(raw) => raw,
            Err(err) if err.is_status() => RawDelegation {
                delegator_address: delegator.to_string(),
                validator_address: operator.to_string(),
                shares: "0".to_string(),
            },
            Err(err) => return Err(err),
        };
        Ok(reducers::delegation(&raw, validator?.as_ref())?)
    }

    /// Rewards by delegator, by validator, or for one pair.
    pub async fn get_rewards(
        &self,
        delegator: Option<&str>,
        validator: Option<&str>,
    ) -> Result<Vec<Reward>, ClientError> {
        if let Some(delegator) = delegator {
            self.check_address(delegator)?;
        }
        let snapshot = self.snapshot();
        match (delegator, validator) {
            (None, None) => Err(ClientError::InvalidArgument(
                "a delegator or validator address is required".to_string(),
            )),
            (Some(delegator), Some(operator)) => {
                let path = format!("distribution/delegators/{delegator}/rewards/{operator}");
                Ok(vec![snapshot.validator_reward(&path, operator).await?])
            }
            (Some(delegator), None) => {
                let delegations = snapshot.delegations(delegator).await?;
                snapshot.rewards_of_delegator(delegator, &delegations).await
            }
            (None, Some(operator)) => {
                let path = format!("distribution/validators/{operator}/rewards");
                Ok(vec![snapshot.validator_reward(&path, operator).await?])
            }
        }
    }

    pub async fn get_overview(&self, address: &str) -> Result<Overview, ClientError> {
        self.check_address(address)?;
        let snapshot = self.snapshot();
        let (balances, delegations, undelegations, denom) = futures::try_join!(
            snapshot.balances(address),
            snapshot.delegations(address),
            snapshot.undelegations(address),
            snapshot.staking_denom()
        )?;
        let rewards = snapshot.rewards_of_delegator(address, &delegations).await?;
        Ok(reducers::overview(&balances, &delegations, &undelegations, &rewards, &denom))
    }

    /// Bonded tokens in display units.
    pub async fn get_bonded_tokens(&self) -> Result<Decimal, ClientError> {
        let pool: RawPool = self.snapshot().module("staking/pool", CachePolicy::PerBlock).await?;
        Ok(display_amount(optional_decimal(Some(&pool.bonded_tokens))?))
    }

    /// Annual provision in display units.
    pub async fn get_annual_provision(&self) -> Result<Decimal, ClientError> {
        Ok(display_amount(self.snapshot().annual_provision().await?))
    }
}
