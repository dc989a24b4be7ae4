//! Witness vote engine.
//!
//! Elector `i` of a role voting for `n` targets with `rr` round-robin votes
//! takes the `rr` consecutive targets starting at `(i * rr) mod n`, stepping
//! over itself, then samples its random votes from the remaining targets.
//! One PRNG is shared by all electors of an invocation, so the draws depend
//! on elector order.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

use forge_keys::KeyDatabase;
use forge_types::{AccountWitnessVoteOperation, KeySeed, Operation, Transaction};

use crate::config::{DerivedAccount, GenConfig};
use crate::source::TransactionSource;
use crate::TxgenError;

/// Vote layout parameters for one elector role.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VotePlan {
    pub round_robin: usize,
    pub random: usize,
    pub max_votes: usize,
}

impl VotePlan {
    /// Round-robin target indices for elector `index`.
    ///
    /// When the window covers the elector itself it is extended by one past
    /// the self index, so an elector still casts `round_robin` votes as long
    /// as there are that many other targets.
    pub fn round_robin_targets(&self, index: usize, elector: &str, targets: &[String]) -> Vec<usize> {
        let n = targets.len();
        if n == 0 {
            return Vec::new();
        }
        let offset = (index * self.round_robin) % n;
        (0..n)
            .map(|step| (offset + step) % n)
            .filter(|&target| targets[target] != elector)
            .take(self.round_robin)
            .collect()
    }

    /// Indices eligible for random votes: not self, not already chosen.
    fn random_candidates(&self, elector: &str, targets: &[String], chosen: &[usize]) -> Vec<usize> {
        (0..targets.len())
            .filter(|target| !chosen.contains(target) && targets[*target] != elector)
            .collect()
    }

    /// Number of votes elector `index` casts; independent of the PRNG.
    pub fn vote_count(&self, index: usize, elector: &str, targets: &[String]) -> usize {
        let chosen = self.round_robin_targets(index, elector, targets);
        let candidates = self.random_candidates(elector, targets, &chosen);
        (chosen.len() + self.random.min(candidates.len())).min(self.max_votes)
    }

    /// Full vote set for elector `index`, sorted by target index.
    pub fn select<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        index: usize,
        elector: &str,
        targets: &[String],
    ) -> Vec<usize> {
        let mut chosen = self.round_robin_targets(index, elector, targets);
        let candidates = self.random_candidates(elector, targets, &chosen);
        let amount = self.random.min(candidates.len());
        chosen.extend(
            rand::seq::index::sample(rng, candidates.len(), amount)
                .into_iter()
                .map(|i| candidates[i]),
        );
        chosen.sort_unstable();
        chosen.truncate(self.max_votes);
        chosen
    }
}

/// Lazily builds one vote transaction per elector with at least one vote.
pub struct VoteSource<R = StdRng> {
    plan: VotePlan,
    targets: Vec<String>,
    electors: VecDeque<DerivedAccount>,
    rng: R,
}

impl VoteSource<StdRng> {
    /// Seeds the PRNG from the elector role's `randseed`.
    pub fn new(config: &GenConfig, elector_role: &str, target_role: &str) -> Result<Self, TxgenError> {
        let seed = config.account(elector_role)?.randseed;
        Self::with_rng(config, elector_role, target_role, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> VoteSource<R> {
    pub fn with_rng(
        config: &GenConfig,
        elector_role: &str,
        target_role: &str,
        rng: R,
    ) -> Result<Self, TxgenError> {
        let spec = config.account(elector_role)?;
        let plan = VotePlan {
            round_robin: spec.round_robin_votes_per_elector,
            random: spec.random_votes_per_elector,
            max_votes: config.max_account_witness_votes,
        };
        let targets: Vec<String> = config
            .derived(target_role)?
            .into_iter()
            .map(|account| account.name)
            .collect();
        let electors = spec
            .derive(elector_role)
            .into_iter()
            .filter(|elector| plan.vote_count(elector.index, &elector.name, &targets) > 0)
            .collect();
        Ok(Self {
            plan,
            targets,
            electors,
            rng,
        })
    }
}

impl<R: Rng> TransactionSource for VoteSource<R> {
    fn len(&self) -> usize {
        self.electors.len()
    }

    fn next_transaction(
        &mut self,
        _keydb: &mut KeyDatabase,
    ) -> Option<Result<Transaction, TxgenError>> {
        let elector = self.electors.pop_front()?;
        let votes = self
            .plan
            .select(&mut self.rng, elector.index, &elector.name, &self.targets);
        tracing::trace!(elector = %elector.name, votes = votes.len(), "built vote transaction");
        let operations = votes
            .into_iter()
            .map(|target| {
                Operation::AccountWitnessVote(AccountWitnessVoteOperation {
                    account: elector.name.clone(),
                    witness: self.targets[target].clone(),
                    approve: true,
                })
            })
            .collect();
        Some(Ok(Transaction::signed_by(
            operations,
            KeySeed::active(elector.name),
        )))
    }
}

pub fn vote_accounts(
    config: &GenConfig,
    keydb: &mut KeyDatabase,
    elector_role: &str,
    target_role: &str,
) -> Result<Vec<Transaction>, TxgenError> {
    VoteSource::new(config, elector_role, target_role)?.collect_transactions(keydb)
}
