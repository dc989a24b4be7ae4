//! Key seeds: the stable identifiers procedural keys are derived from.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TypesError;

/// Permission level (or purpose) of a derived key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyRole {
    Owner,
    Active,
    Posting,
    Memo,
    /// Witness block signing.
    Signing,
}

impl KeyRole {
    /// The three authority levels carried by every account.
    pub const AUTHORITIES: [KeyRole; 3] = [KeyRole::Owner, KeyRole::Active, KeyRole::Posting];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Active => "active",
            Self::Posting => "posting",
            Self::Memo => "memo",
            Self::Signing => "signing",
        }
    }
}

impl fmt::Display for KeyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyRole {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "owner" => Ok(Self::Owner),
            "active" => Ok(Self::Active),
            "posting" => Ok(Self::Posting),
            "memo" => Ok(Self::Memo),
            "signing" => Ok(Self::Signing),
            other => Err(TypesError::UnknownRole(other.to_string())),
        }
    }
}

/// `(account, role)` pair identifying exactly one procedural keypair.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KeySeed {
    pub account: String,
    pub role: KeyRole,
}

impl KeySeed {
    pub fn new(account: impl Into<String>, role: KeyRole) -> Self {
        Self {
            account: account.into(),
            role,
        }
    }

    pub fn owner(account: impl Into<String>) -> Self {
        Self::new(account, KeyRole::Owner)
    }

    pub fn active(account: impl Into<String>) -> Self {
        Self::new(account, KeyRole::Active)
    }

    /// Canonical string form, `"{account}-{role}"`, fed to the derivation.
    pub fn as_seed_string(&self) -> String {
        format!("{}-{}", self.account, self.role)
    }
}

impl fmt::Display for KeySeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.account, self.role)
    }
}
