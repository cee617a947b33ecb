//! Proposals, governance parameters and votes.

use super::{ChainClient, ClientError, Snapshot, PARAMETERS_TTL};
use crate::chain::cache::CachePolicy;
use crate::chain::raw::{RawDepositParams, RawProposal, RawProposer, RawTally, RawTallyParams, RawVote};
use crate::model::{GovernanceParameters, Proposal, ProposalStatus, Vote};
use crate::reducers;
use futures::future::join_all;
use tracing::warn;

impl Snapshot<'_> {
    /// Live tally; `None` (with a warning) when the node cannot serve it.
    async fn live_tally(&self, id: &str) -> Option<RawTally> {
        let path = format!("gov/proposals/{id}/tally");
        match self.module::<RawTally>(&path, CachePolicy::PerBlock).await {
            Ok(tally) => Some(tally),
            Err(err) => {
                warn!(proposal = id, error = %err, "live tally unavailable");
                None
            }
        }
    }

    async fn proposer(&self, id: u64) -> Option<String> {
        let path = format!("gov/proposals/{id}/proposer");
        self.module::<RawProposer>(&path, CachePolicy::PerBlock)
            .await
            .ok()
            .map(|p| p.proposer)
            .filter(|p| !p.is_empty())
    }
}

impl ChainClient {
    /// All proposals, newest id first. Only proposals in their voting period
    /// carry a live tally; proposals with an unrecognised status are skipped.
    pub async fn get_all_proposals(&self) -> Result<Vec<Proposal>, ClientError> {
        let snapshot = self.snapshot();
        let (raws, bonded) = futures::join!(
            snapshot.module::<Option<Vec<RawProposal>>>("gov/proposals", CachePolicy::PerBlock),
            snapshot.bonded_micro()
        );
        let raws: Vec<RawProposal> = raws?
            .unwrap_or_default()
            .into_iter()
            .filter(|raw| match reducers::parse_status(&raw.status) {
                Ok(_) => true,
                Err(err) => {
                    warn!(proposal = %raw.id, error = %err, "skipping proposal");
                    false
                }
            })
            .collect();
        let tallies = join_all(raws.iter().map(|raw| async {
            match reducers::parse_status(&raw.status) {
                Ok(ProposalStatus::VotingPeriod) => snapshot.live_tally(&raw.id).await,
                _ => None,
            }
        }))
        .await;
        let mut proposals = raws
            .iter()
            .zip(&tallies)
            .map(|(raw, tally)| reducers::proposal(self.network_id(), raw, tally.as_ref(), None, bonded))
            .collect::<Result<Vec<_>, _>>()?;
        proposals.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(proposals)
    }

    pub async fn get_proposal_by_id(&self, id: u64) -> Result<Proposal, ClientError> {
        let snapshot = self.snapshot();
        let path = format!("gov/proposals/{id}");
        let key = id.to_string();
        let (raw, bonded, tally, proposer) = futures::join!(
            snapshot.module::<RawProposal>(&path, CachePolicy::PerBlock),
            snapshot.bonded_micro(),
            snapshot.live_tally(&key),
            snapshot.proposer(id)
        );
        Ok(reducers::proposal(self.network_id(), &raw?, tally.as_ref(), proposer, bonded)?)
    }

    pub async fn get_governance_parameters(&self) -> Result<GovernanceParameters, ClientError> {
        let snapshot = self.snapshot();
        let (deposit, tallying) = futures::try_join!(
            snapshot.module::<RawDepositParams>("gov/parameters/deposit", PARAMETERS_TTL),
            snapshot.module::<RawTallyParams>("gov/parameters/tallying", PARAMETERS_TTL)
        )?;
        Ok(reducers::governance_parameters(&deposit, &tallying)?)
    }

    /// The option `address` voted on proposal `id`, if any.
    pub async fn get_delegator_vote(&self, id: u64, address: &str) -> Result<Vote, ClientError> {
        self.check_address(address)?;
        let path = format!("gov/proposals/{id}/votes");
        let votes: Option<Vec<RawVote>> = self.snapshot().module(&path, CachePolicy::PerBlock).await?;
        let option = votes
            .unwrap_or_default()
            .into_iter()
            .find(|vote| vote.voter == address)
            .map(|vote| vote.option);
        Ok(Vote { option })
    }
}
