//! The action stream consumed by the submission driver.
//!
//! Every action is a `(command, args)` pair serialized as a two-element JSON
//! array, e.g. `["wait_blocks", {"count": 1}]`.

use serde::ser::SerializeTuple;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::time::Timestamp;
use crate::transaction::Transaction;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    Metadata,
    WaitBlocks,
    SubmitTransaction,
}

impl Command {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Metadata => "metadata",
            Self::WaitBlocks => "wait_blocks",
            Self::SubmitTransaction => "submit_transaction",
        }
    }
}

/// Header describing the stream that follows it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(rename = "txgen:semver")]
    pub generator_semver: String,
    #[serde(rename = "txgen:transactions_per_block")]
    pub transactions_per_block: usize,
    #[serde(rename = "epoch:created")]
    pub created: Timestamp,
    /// Non-metadata actions that follow this header.
    #[serde(rename = "actions:count")]
    pub action_count: usize,
    #[serde(rename = "recommend:miss_blocks")]
    pub miss_blocks: u64,
    #[serde(rename = "snapshot:semver")]
    pub snapshot_semver: String,
    #[serde(rename = "snapshot:origin_api")]
    pub snapshot_origin_api: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub post_backfill: bool,
}

fn is_false(value: &bool) -> bool {
    !*value
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitBlocks {
    pub count: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SubmitTransaction {
    pub tx: Transaction,
    /// Escape character delimiting placeholder signatures in `tx`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub esc: Option<char>,
}

/// An action read from a backfill file, replayed without interpretation.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedAction {
    pub command: Command,
    pub args: serde_json::Value,
}

impl<'de> Deserialize<'de> for RecordedAction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (command, args) = <(Command, serde_json::Value)>::deserialize(deserializer)?;
        Ok(Self { command, args })
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Action {
    Metadata(Metadata),
    WaitBlocks(WaitBlocks),
    SubmitTransaction(SubmitTransaction),
    Recorded(RecordedAction),
}

impl Action {
    pub fn wait_blocks(count: u32) -> Self {
        Self::WaitBlocks(WaitBlocks { count })
    }

    pub fn command(&self) -> Command {
        match self {
            Self::Metadata(_) => Command::Metadata,
            Self::WaitBlocks(_) => Command::WaitBlocks,
            Self::SubmitTransaction(_) => Command::SubmitTransaction,
            Self::Recorded(recorded) => recorded.command,
        }
    }

    pub fn is_metadata(&self) -> bool {
        self.command() == Command::Metadata
    }

    pub fn transaction(&self) -> Option<&Transaction> {
        match self {
            Self::SubmitTransaction(submit) => Some(&submit.tx),
            _ => None,
        }
    }
}

impl Serialize for Action {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut pair = serializer.serialize_tuple(2)?;
        pair.serialize_element(self.command().as_str())?;
        match self {
            Self::Metadata(metadata) => pair.serialize_element(metadata)?,
            Self::WaitBlocks(wait) => pair.serialize_element(wait)?,
            Self::SubmitTransaction(submit) => pair.serialize_element(submit)?,
            Self::Recorded(recorded) => pair.serialize_element(&recorded.args)?,
        }
        pair.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_blocks_serializes_as_pair() {
        let json = serde_json::to_string(&Action::wait_blocks(21)).unwrap();
        assert_eq!(json, r#"["wait_blocks",{"count":21}]"#);
    }

    #[test]
    fn metadata_uses_namespaced_keys() {
        let metadata = Metadata {
            generator_semver: "0.2".into(),
            transactions_per_block: 40,
            created: Timestamp::new(1_700_000_000),
            action_count: 3,
            miss_blocks: 10,
            snapshot_semver: "0.2".into(),
            snapshot_origin_api: "http://calculon.local".into(),
            post_backfill: false,
        };
        let json = serde_json::to_value(Action::Metadata(metadata)).unwrap();
        assert_eq!(json[0], "metadata");
        assert_eq!(json[1]["actions:count"], 3);
        assert_eq!(json[1]["epoch:created"], 1_700_000_000u64);
        assert!(json[1].get("post_backfill").is_none());
    }

    #[test]
    fn recorded_action_replays_verbatim() {
        let line = r#"["submit_transaction",{"esc":"$","tx":{"operations":[],"wif_sigs":["$x$"]}}]"#;
        let recorded: RecordedAction = serde_json::from_str(line).unwrap();
        assert_eq!(recorded.command, Command::SubmitTransaction);
        let out = serde_json::to_string(&Action::Recorded(recorded)).unwrap();
        assert_eq!(out, line);
    }

    #[test]
    fn unknown_command_rejected() {
        assert!(serde_json::from_str::<RecordedAction>(r#"["fly",{}]"#).is_err());
    }
}
