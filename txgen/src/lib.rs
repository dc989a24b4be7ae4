//! Genesis action stream generation for a fresh testnet.
//!
//! Given a [`GenConfig`] and a snapshot of an existing network,
//! [`build_actions`] produces the ordered `metadata` / `wait_blocks` /
//! `submit_transaction` stream that creates the system accounts, registers
//! and elects the witnesses, and ports balances proportionally.

pub mod backfill;
pub mod config;
pub mod error;
pub mod porting;
pub mod schedule;
pub mod snapshot;
pub mod source;
pub mod stats;
pub mod system;
pub mod votes;

pub use backfill::{load_backfill, parse_backfill};
pub use config::{AccountSpec, DerivedAccount, GenConfig, RoleNames};
pub use error::TxgenError;
pub use porting::{create_accounts, update_accounts, AccountResolver, PortedAccount};
pub use schedule::{build_actions, build_actions_at, recommend_miss_blocks, ActionStream, TXGEN_SEMVER};
pub use snapshot::{load_snapshot, Snapshot, SnapshotAccount, SnapshotMetadata};
pub use source::TransactionSource;
pub use stats::{compute_proportions, compute_stats, AccountStats, Proportions, DENOM};
pub use system::{create_system_accounts, initminer_setup, update_witnesses};
pub use votes::{vote_accounts, VoteSource};
