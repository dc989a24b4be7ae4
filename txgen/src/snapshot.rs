//! Balance snapshot of the source network.
//!
//! The header is checked before the body is interpreted, so a snapshot in an
//! unknown schema is rejected without trying to make sense of its accounts.

use serde::{Deserialize, Serialize};
use std::path::Path;

use forge_types::{Amount, Authority};

use crate::TxgenError;

/// Snapshot schema versions this generator understands.
pub const SUPPORTED_SNAPSHOT_SEMVERS: &[&str] = &["0.2"];

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotMetadata {
    #[serde(rename = "snapshot:semver")]
    pub semver: String,
    #[serde(rename = "snapshot:origin_api", default)]
    pub origin_api: String,
}

#[derive(Deserialize)]
struct SnapshotHeader {
    metadata: SnapshotMetadata,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DynamicGlobalProperties {
    pub total_vesting_fund_steem: Amount,
}

/// One account record as exported from the source network.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapshotAccount {
    pub name: String,
    pub vesting_shares: Amount,
    pub balance: Amount,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    #[serde(default)]
    pub memo_key: String,
    #[serde(default)]
    pub json_metadata: String,
}

impl SnapshotAccount {
    /// Owner, active and posting authorities, in that order.
    pub fn authorities(&self) -> [&Authority; 3] {
        [&self.owner, &self.active, &self.posting]
    }

    /// Whether any authority delegates to another account.
    pub fn has_account_auths(&self) -> bool {
        self.authorities()
            .iter()
            .any(|auth| !auth.account_auths.is_empty())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    pub dynamic_global_properties: DynamicGlobalProperties,
    #[serde(default)]
    pub accounts: Vec<SnapshotAccount>,
}

impl Snapshot {
    pub fn from_json_str(s: &str) -> Result<Self, TxgenError> {
        let header: SnapshotHeader = serde_json::from_str(s)
            .map_err(|e| TxgenError::InvalidSnapshot(format!("unreadable header: {e}")))?;
        check_semver(&header.metadata.semver)?;
        serde_json::from_str(s).map_err(|e| TxgenError::InvalidSnapshot(e.to_string()))
    }

    pub fn account(&self, name: &str) -> Option<&SnapshotAccount> {
        self.accounts.iter().find(|account| account.name == name)
    }
}

fn check_semver(semver: &str) -> Result<(), TxgenError> {
    if SUPPORTED_SNAPSHOT_SEMVERS.contains(&semver) {
        Ok(())
    } else {
        Err(TxgenError::UnsupportedSnapshot(semver.to_string()))
    }
}

/// Read and version-check a snapshot file.
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<Snapshot, TxgenError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let snapshot = Snapshot::from_json_str(&content)?;
    tracing::info!(
        path = %path.display(),
        semver = %snapshot.metadata.semver,
        origin = %snapshot.metadata.origin_api,
        accounts = snapshot.accounts.len(),
        "loaded snapshot"
    );
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"{
        "metadata": {"snapshot:semver": "0.2", "snapshot:origin_api": "http://calculon.local"},
        "dynamic_global_properties": {
            "total_vesting_fund_steem": {"amount": "1000", "precision": 3, "nai": "@@000000021"}
        },
        "accounts": [{
            "name": "alice",
            "vesting_shares": {"amount": "5000000", "precision": 6, "nai": "@@000000037"},
            "balance": {"amount": "10", "precision": 3, "nai": "@@000000021"},
            "owner": {"weight_threshold": 1, "account_auths": [], "key_auths": [["STM5a", 1]]},
            "active": {"weight_threshold": 1, "account_auths": [["bob", 1]], "key_auths": []},
            "posting": {"weight_threshold": 1, "account_auths": [], "key_auths": []},
            "memo_key": "STM5m",
            "json_metadata": ""
        }]
    }"#;

    #[test]
    fn parses_supported_snapshot() {
        let snapshot = Snapshot::from_json_str(MINIMAL).unwrap();
        assert_eq!(snapshot.metadata.origin_api, "http://calculon.local");
        let alice = snapshot.account("alice").unwrap();
        assert_eq!(alice.vesting_shares.raw(), 5_000_000);
        assert!(alice.has_account_auths());
    }

    #[test]
    fn unsupported_semver_rejected_before_body() {
        let text = r#"{"metadata": {"snapshot:semver": "0.3"}, "accounts": "not a list"}"#;
        let err = Snapshot::from_json_str(text).unwrap_err();
        assert!(matches!(err, TxgenError::UnsupportedSnapshot(ref v) if v == "0.3"));
        assert!(err.to_string().contains("Unsupported snapshot"));
    }

    #[test]
    fn malformed_body_is_invalid() {
        let text = r#"{"metadata": {"snapshot:semver": "0.2"}, "accounts": []}"#;
        assert!(matches!(
            Snapshot::from_json_str(text),
            Err(TxgenError::InvalidSnapshot(_))
        ));
    }

    #[test]
    fn oversized_precision_is_invalid() {
        let text = MINIMAL.replace(
            r#""amount": "5000000", "precision": 6"#,
            r#""amount": "5000000", "precision": 60"#,
        );
        let err = Snapshot::from_json_str(&text).unwrap_err();
        assert!(matches!(err, TxgenError::InvalidSnapshot(ref m) if m.contains("precision 60")));
    }
}
