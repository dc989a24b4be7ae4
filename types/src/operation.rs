//! Ledger operations emitted by the generator.
//!
//! Each operation serializes as `{"type": "<name>_operation", "value": {...}}`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::amount::Amount;
use crate::authority::Authority;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum Operation {
    #[serde(rename = "account_create_operation")]
    AccountCreate(AccountCreateOperation),
    #[serde(rename = "account_update_operation")]
    AccountUpdate(AccountUpdateOperation),
    #[serde(rename = "transfer_to_vesting_operation")]
    TransferToVesting(TransferToVestingOperation),
    #[serde(rename = "transfer_operation")]
    Transfer(TransferOperation),
    #[serde(rename = "witness_update_operation")]
    WitnessUpdate(WitnessUpdateOperation),
    #[serde(rename = "account_witness_vote_operation")]
    AccountWitnessVote(AccountWitnessVoteOperation),
}

impl Operation {
    /// Wire name of the operation type.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::AccountCreate(_) => "account_create_operation",
            Self::AccountUpdate(_) => "account_update_operation",
            Self::TransferToVesting(_) => "transfer_to_vesting_operation",
            Self::Transfer(_) => "transfer_operation",
            Self::WitnessUpdate(_) => "witness_update_operation",
            Self::AccountWitnessVote(_) => "account_witness_vote_operation",
        }
    }

    /// Authorities installed by this operation, if any.
    pub fn authorities(&self) -> Vec<&Authority> {
        match self {
            Self::AccountCreate(op) => vec![&op.owner, &op.active, &op.posting],
            Self::AccountUpdate(op) => [&op.owner, &op.active, &op.posting]
                .into_iter()
                .flatten()
                .collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountCreateOperation {
    pub fee: Amount,
    pub creator: String,
    pub new_account_name: String,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: String,
    #[serde(default)]
    pub json_metadata: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdateOperation {
    pub account: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Authority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<Authority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub posting: Option<Authority>,
    pub memo_key: String,
    #[serde(default)]
    pub json_metadata: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferToVestingOperation {
    pub from: String,
    pub to: String,
    pub amount: Amount,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub from: String,
    pub to: String,
    pub amount: Amount,
    pub memo: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WitnessUpdateOperation {
    pub owner: String,
    pub url: String,
    pub block_signing_key: String,
    /// Chain properties; always empty for genesis witnesses.
    #[serde(default)]
    pub props: BTreeMap<String, serde_json::Value>,
    pub fee: Amount,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountWitnessVoteOperation {
    pub account: String,
    pub witness: String,
    pub approve: bool,
}
