//! Counters over a generated action stream.

use std::collections::BTreeMap;

use forge_types::Action;
use serde::Serialize;

/// Per-command and per-operation counts for an action stream.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ActionTally {
    pub commands: BTreeMap<&'static str, u64>,
    pub operations: BTreeMap<&'static str, u64>,
    /// Sum of all `wait_blocks` counts.
    pub blocks_waited: u64,
}

impl ActionTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, action: &Action) {
        *self.commands.entry(action.command().as_str()).or_insert(0) += 1;
        match action {
            Action::WaitBlocks(wait) => self.blocks_waited += u64::from(wait.count),
            Action::SubmitTransaction(submit) => {
                for op in &submit.tx.operations {
                    *self.operations.entry(op.type_name()).or_insert(0) += 1;
                }
            }
            _ => {}
        }
    }

    pub fn command(&self, name: &str) -> u64 {
        self.commands.get(name).copied().unwrap_or(0)
    }

    pub fn operation(&self, name: &str) -> u64 {
        self.operations.get(name).copied().unwrap_or(0)
    }

    /// Actions recorded, metadata excluded.
    pub fn non_metadata(&self) -> u64 {
        self.commands
            .iter()
            .filter(|(name, _)| **name != "metadata")
            .map(|(_, count)| count)
            .sum()
    }
}
