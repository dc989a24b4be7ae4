//! Account authorities (owner / active / posting permission sets).

use serde::{Deserialize, Serialize};

/// Weighted set of accounts and keys allowed to act at one permission level.
///
/// Serialized as `{"weight_threshold": n, "account_auths": [[name, w]], "key_auths": [[key, w]]}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authority {
    pub weight_threshold: u32,
    #[serde(default)]
    pub account_auths: Vec<(String, u16)>,
    #[serde(default)]
    pub key_auths: Vec<(String, u16)>,
}

impl Authority {
    /// Threshold 1, a single key with weight 1.
    pub fn single_key(public_key: impl Into<String>) -> Self {
        Self {
            weight_threshold: 1,
            account_auths: Vec::new(),
            key_auths: vec![(public_key.into(), 1)],
        }
    }

    /// Add an account with the given weight unless it is already present.
    pub fn push_account(&mut self, name: impl Into<String>, weight: u16) {
        let name = name.into();
        if !self.account_auths.iter().any(|(n, _)| *n == name) {
            self.account_auths.push((name, weight));
        }
    }

    pub fn has_account(&self, name: &str) -> bool {
        self.account_auths.iter().any(|(n, _)| n == name)
    }

    /// Drop entries past `max_membership` in both lists.
    ///
    /// Returns the number of entries removed.
    pub fn truncate(&mut self, max_membership: usize) -> usize {
        let before = self.account_auths.len() + self.key_auths.len();
        self.account_auths.truncate(max_membership);
        self.key_auths.truncate(max_membership);
        before - (self.account_auths.len() + self.key_auths.len())
    }
}
