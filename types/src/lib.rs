//! Wire types for testnet genesis generation.
//!
//! This crate defines the data shared by the key database, the builders and
//! the action scheduler: asset amounts, authorities, key seeds, ledger
//! operations, transactions, and the `(command, args)` action stream.

pub mod action;
pub mod amount;
pub mod authority;
pub mod error;
pub mod keys;
pub mod operation;
pub mod time;
pub mod transaction;

pub use action::{Action, Command, Metadata, RecordedAction, SubmitTransaction, WaitBlocks};
pub use amount::{Amount, MAX_PRECISION, STEEM_NAI, STEEM_PRECISION, VESTS_NAI, VESTS_PRECISION};
pub use authority::Authority;
pub use error::TypesError;
pub use keys::{KeyRole, KeySeed};
pub use operation::{
    AccountCreateOperation, AccountUpdateOperation, AccountWitnessVoteOperation, Operation,
    TransferOperation, TransferToVestingOperation, WitnessUpdateOperation,
};
pub use time::Timestamp;
pub use transaction::{SignatureMaterial, Transaction, RESOLVED_SIGNATURE_LEN};
