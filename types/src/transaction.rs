//! Transactions and the signature material attached to them.

use serde::ser::Error as _;
use serde::{Serialize, Serializer};

use crate::keys::KeySeed;
use crate::operation::Operation;

/// Length of a resolved (WIF-encoded) private key.
pub const RESOLVED_SIGNATURE_LEN: usize = 51;

/// What a signature slot holds.
///
/// Builders always produce `KeyHandle`; the action stream renders it into
/// one of the string forms before the transaction leaves the process.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SignatureMaterial {
    /// Fully encoded signing key (WIF).
    Resolved(String),
    /// Escape-delimited token naming the key, e.g. `$init-0-active$`.
    Placeholder(String),
    /// Reference into the key database; not yet rendered.
    KeyHandle(KeySeed),
}

impl SignatureMaterial {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Resolved(s) | Self::Placeholder(s) => Some(s),
            Self::KeyHandle(_) => None,
        }
    }

    pub fn seed(&self) -> Option<&KeySeed> {
        match self {
            Self::KeyHandle(seed) => Some(seed),
            _ => None,
        }
    }
}

impl Serialize for SignatureMaterial {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Resolved(s) | Self::Placeholder(s) => serializer.serialize_str(s),
            Self::KeyHandle(seed) => Err(S::Error::custom(format!(
                "unrendered key handle {seed} cannot be serialized"
            ))),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Transaction {
    pub operations: Vec<Operation>,
    pub wif_sigs: Vec<SignatureMaterial>,
}

impl Transaction {
    /// A transaction signed by a single key.
    pub fn signed_by(operations: Vec<Operation>, signer: KeySeed) -> Self {
        Self {
            operations,
            wif_sigs: vec![SignatureMaterial::KeyHandle(signer)],
        }
    }
}
