//! Genesis action scheduling.
//!
//! [`build_actions`] does every fallible check that depends on the inputs
//! (configuration, snapshot version, supply, backfill) up front and returns
//! an [`ActionStream`]. The stream derives keys and draws votes as it is
//! consumed, so it can only be iterated once; a second pass needs a new call
//! to [`build_actions`].

use std::collections::VecDeque;
use std::iter::FusedIterator;

use forge_keys::{KeyDatabase, SignatureMode};
use forge_types::{Action, Metadata, SubmitTransaction, Timestamp, Transaction};

use crate::backfill::{load_backfill, recorded_wait};
use crate::config::GenConfig;
use crate::porting::{account_creation_source, account_update_source, ported_accounts};
use crate::snapshot::load_snapshot;
use crate::source::TransactionSource;
use crate::stats::{compute_proportions, compute_stats};
use crate::system::{root_setup_source, system_account_source, witness_update_source};
use crate::votes::VoteSource;
use crate::TxgenError;

/// Version tag of the action stream format.
pub const TXGEN_SEMVER: &str = "0.2";

enum Stage {
    Emit(Action),
    Transactions(Box<dyn TransactionSource>),
    WaitBlocks(u32),
}

/// Actions and block waits a sequence of stages expands to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct Layout {
    actions: usize,
    waited_blocks: u64,
}

fn layout<'a>(stages: impl IntoIterator<Item = &'a Stage>, transactions_per_block: usize) -> Layout {
    let mut out = Layout::default();
    let mut in_block = 0;
    for stage in stages {
        match stage {
            Stage::Emit(action) => {
                if !action.is_metadata() {
                    out.actions += 1;
                }
                if let Action::Recorded(recorded) = action {
                    out.waited_blocks += recorded_wait(recorded).unwrap_or(0);
                }
            }
            Stage::WaitBlocks(count) => {
                out.actions += 1;
                out.waited_blocks += u64::from(*count);
                in_block = 0;
            }
            Stage::Transactions(source) => {
                let mut remaining = source.len();
                while remaining > 0 {
                    if in_block == 0 || in_block == transactions_per_block {
                        out.actions += 1;
                        out.waited_blocks += 1;
                        in_block = 0;
                    }
                    let take = remaining.min(transactions_per_block - in_block);
                    in_block += take;
                    out.actions += take;
                    remaining -= take;
                }
            }
        }
    }
    out
}

/// Blocks a driver starting at `now` should let the chain skip before
/// replaying, given the blocks the stream itself waits.
///
/// The padded wait is `waited_blocks + ceil(pad / transactions_per_block)`;
/// whatever wall-clock time since genesis that wait does not cover is
/// counted in block intervals, minus one block of margin.
pub fn recommend_miss_blocks(config: &GenConfig, now: Timestamp, waited_blocks: u64) -> u64 {
    let interval = config.steem_block_interval.max(1);
    let pad_blocks = config
        .transaction_witness_setup_pad
        .div_ceil(config.transactions_per_block.max(1)) as u64;
    let covered = (waited_blocks + pad_blocks).saturating_mul(interval);
    let uncovered = Timestamp::new(config.genesis_timestamp)
        .elapsed_since(now)
        .saturating_sub(covered);
    (uncovered / interval).saturating_sub(1)
}

/// Single-pass iterator over the genesis actions.
///
/// Owns its key database and vote PRNG. After yielding an `Err` the stream
/// is exhausted.
pub struct ActionStream {
    stages: VecDeque<Stage>,
    keydb: KeyDatabase,
    mode: SignatureMode,
    transactions_per_block: usize,
    in_block: usize,
    pending: Option<Transaction>,
    failed: bool,
    action_count: usize,
    miss_blocks: u64,
}

impl ActionStream {
    /// Choose how signature slots are rendered.
    pub fn with_signature_mode(mut self, mode: SignatureMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn signature_mode(&self) -> SignatureMode {
        self.mode
    }

    /// Non-metadata actions announced by the leading metadata.
    pub fn action_count(&self) -> usize {
        self.action_count
    }

    pub fn miss_blocks(&self) -> u64 {
        self.miss_blocks
    }

    pub fn keydb(&self) -> &KeyDatabase {
        &self.keydb
    }

    fn submit(&mut self, mut tx: Transaction) -> Result<Action, TxgenError> {
        self.in_block += 1;
        self.keydb.render_transaction(&mut tx, self.mode)?;
        Ok(Action::SubmitTransaction(SubmitTransaction {
            tx,
            esc: self.mode.escape_char(),
        }))
    }

    fn advance(&mut self) -> Option<Result<Action, TxgenError>> {
        loop {
            if let Some(tx) = self.pending.take() {
                return Some(self.submit(tx));
            }
            let stage = self.stages.front_mut()?;
            match stage {
                Stage::Emit(_) | Stage::WaitBlocks(_) => {
                    return match self.stages.pop_front()? {
                        Stage::Emit(action) => Some(Ok(action)),
                        Stage::WaitBlocks(count) => {
                            self.in_block = 0;
                            Some(Ok(Action::wait_blocks(count)))
                        }
                        Stage::Transactions(_) => None,
                    };
                }
                Stage::Transactions(source) => match source.next_transaction(&mut self.keydb) {
                    None => {
                        self.stages.pop_front();
                    }
                    Some(Err(e)) => return Some(Err(e)),
                    Some(Ok(tx)) => {
                        if self.in_block == 0 || self.in_block == self.transactions_per_block {
                            self.in_block = 0;
                            self.pending = Some(tx);
                            return Some(Ok(Action::wait_blocks(1)));
                        }
                        return Some(self.submit(tx));
                    }
                },
            }
        }
    }
}

impl Iterator for ActionStream {
    type Item = Result<Action, TxgenError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let item = self.advance();
        if matches!(item, Some(Err(_))) {
            self.failed = true;
            self.stages.clear();
            self.pending = None;
        }
        item
    }
}

impl FusedIterator for ActionStream {}

/// Build the genesis action stream stamped with the current time.
pub fn build_actions(config: &GenConfig) -> Result<ActionStream, TxgenError> {
    build_actions_at(config, Timestamp::now())
}

/// Build the genesis action stream as if generated at `now`.
pub fn build_actions_at(config: &GenConfig, now: Timestamp) -> Result<ActionStream, TxgenError> {
    config.validate()?;
    let snapshot_path = config
        .snapshot_file
        .as_ref()
        .ok_or_else(|| TxgenError::InvalidInvocation("snapshot_file is required".into()))?;
    let snapshot = load_snapshot(snapshot_path)?;
    let stats = compute_stats(&snapshot, config)?;
    let proportions = compute_proportions(&stats, config)?;
    let ported = ported_accounts(&snapshot, &stats, &proportions)?;
    let backfill = match &config.backfill_file {
        Some(path) => Some(load_backfill(path)?),
        None => None,
    };

    let mut generated: Vec<Stage> = Vec::new();
    generated.push(Stage::Transactions(Box::new(root_setup_source(config))));
    for role in config.creation_order()? {
        generated.push(Stage::Transactions(Box::new(system_account_source(config, role)?)));
    }
    let witness_role = config.roles.witness.as_str();
    let has_witnesses = config.accounts.contains_key(witness_role);
    if has_witnesses {
        generated.push(Stage::Transactions(Box::new(witness_update_source(
            config,
            witness_role,
        )?)));
    } else {
        tracing::warn!(role = witness_role, "no witness role configured");
    }
    if config.num_blocks_to_clear_witness_round > 0 {
        generated.push(Stage::WaitBlocks(config.num_blocks_to_clear_witness_round));
    }
    let elector_role = config.roles.elector.as_str();
    if has_witnesses && config.accounts.contains_key(elector_role) {
        generated.push(Stage::Transactions(Box::new(VoteSource::new(
            config,
            elector_role,
            witness_role,
        )?)));
    }
    if config.porter_name().is_some() {
        generated.push(Stage::Transactions(Box::new(account_creation_source(
            &ported, config,
        )?)));
    } else if !ported.is_empty() {
        tracing::warn!(accounts = ported.len(), "no porter configured, skipping balance port");
    }
    if config.porter_name().is_some() && config.manager_name().is_some() {
        generated.push(Stage::Transactions(Box::new(account_update_source(
            &snapshot, &ported, config,
        )?)));
    }

    let tpb = config.transactions_per_block;
    let generated_layout = layout(&generated, tpb);
    let recorded: Vec<Stage> = backfill
        .iter()
        .flatten()
        .cloned()
        .map(|action| Stage::Emit(Action::Recorded(action)))
        .collect();
    let recorded_layout = layout(&recorded, tpb);
    let action_count = generated_layout.actions + recorded_layout.actions;
    let miss_blocks = recommend_miss_blocks(
        config,
        now,
        generated_layout.waited_blocks + recorded_layout.waited_blocks,
    );

    let metadata = |action_count: usize, post_backfill: bool| {
        Stage::Emit(Action::Metadata(Metadata {
            generator_semver: TXGEN_SEMVER.to_string(),
            transactions_per_block: tpb,
            created: now,
            action_count,
            miss_blocks,
            snapshot_semver: snapshot.metadata.semver.clone(),
            snapshot_origin_api: snapshot.metadata.origin_api.clone(),
            post_backfill,
        }))
    };

    let mut stages = VecDeque::new();
    stages.push_back(metadata(action_count, false));
    if backfill.is_some() {
        stages.extend(recorded);
        stages.push_back(metadata(generated_layout.actions, true));
    }
    stages.extend(generated);

    tracing::info!(
        actions = action_count,
        miss_blocks,
        ported = ported.len(),
        backfill = recorded_layout.actions,
        "built genesis action plan"
    );

    Ok(ActionStream {
        stages,
        keydb: KeyDatabase::new(config.key_secret.as_bytes(), config.steem_address_prefix.clone()),
        mode: SignatureMode::default(),
        transactions_per_block: tpb,
        in_block: 0,
        pending: None,
        failed: false,
        action_count,
        miss_blocks,
    })
}
