//! Deterministic key derivation and caching.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;

use forge_types::{Authority, KeySeed, SignatureMaterial, Transaction, RESOLVED_SIGNATURE_LEN};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::encoding;
use crate::error::KeyError;

type HmacSha256 = Hmac<Sha256>;

/// How signature slots are written into emitted transactions.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SignatureMode {
    /// Full WIF private key.
    #[default]
    Resolved,
    /// `{esc}{seed}{esc}` token, falling back to the WIF when the token would
    /// be at least as long as a resolved key.
    Escaped(char),
    /// Leave the key handle in place for a later rendering pass.
    Deferred,
}

impl SignatureMode {
    pub fn escape_char(&self) -> Option<char> {
        match self {
            Self::Escaped(esc) => Some(*esc),
            _ => None,
        }
    }
}

#[derive(Zeroize, ZeroizeOnDrop)]
struct SecretScalar([u8; 32]);

/// One derived keypair with lazily computed encodings.
pub struct ProceduralKey {
    seed: KeySeed,
    secret: SecretScalar,
    public_key: Option<String>,
    wif: Option<String>,
}

impl ProceduralKey {
    pub fn seed(&self) -> &KeySeed {
        &self.seed
    }

    pub fn secret_bytes(&self) -> &[u8; 32] {
        &self.secret.0
    }
}

impl fmt::Debug for ProceduralKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProceduralKey")
            .field("seed", &self.seed)
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Cache of procedural keys keyed by seed.
///
/// The secret for a seed is `HMAC-SHA256(key = database secret, message =
/// "{account}-{role}")`. Entries are never evicted; the cache only grows as
/// new seeds are requested.
pub struct KeyDatabase {
    secret: Vec<u8>,
    address_prefix: String,
    keys: HashMap<KeySeed, ProceduralKey>,
}

impl KeyDatabase {
    pub fn new(secret: impl AsRef<[u8]>, address_prefix: impl Into<String>) -> Self {
        Self {
            secret: secret.as_ref().to_vec(),
            address_prefix: address_prefix.into(),
            keys: HashMap::new(),
        }
    }

    pub fn address_prefix(&self) -> &str {
        &self.address_prefix
    }

    /// Number of seeds derived so far.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn contains(&self, seed: &KeySeed) -> bool {
        self.keys.contains_key(seed)
    }

    /// Derive (or fetch) the keypair for `seed`.
    pub fn derive(&mut self, seed: &KeySeed) -> Result<&ProceduralKey, KeyError> {
        entry(&mut self.keys, &self.secret, seed).map(|key| &*key)
    }

    /// Prefixed public key for `seed`.
    pub fn public_key(&mut self, seed: &KeySeed) -> Result<String, KeyError> {
        let key = entry(&mut self.keys, &self.secret, seed)?;
        if let Some(public_key) = &key.public_key {
            return Ok(public_key.clone());
        }
        let point = encoding::compressed_public_key(key.secret_bytes()).ok_or_else(|| {
            KeyError::InvalidScalar {
                seed: seed.to_string(),
            }
        })?;
        let encoded = encoding::encode_public_key(&point, &self.address_prefix);
        key.public_key = Some(encoded.clone());
        Ok(encoded)
    }

    /// WIF private key for `seed`.
    pub fn wif(&mut self, seed: &KeySeed) -> Result<String, KeyError> {
        let key = entry(&mut self.keys, &self.secret, seed)?;
        if let Some(wif) = &key.wif {
            return Ok(wif.clone());
        }
        let encoded = encoding::encode_wif(key.secret_bytes());
        key.wif = Some(encoded.clone());
        Ok(encoded)
    }

    /// Threshold-1 authority holding only the procedural key for `seed`.
    pub fn authority(&mut self, seed: &KeySeed) -> Result<Authority, KeyError> {
        Ok(Authority::single_key(self.public_key(seed)?))
    }

    /// Handle to the signing key for `seed`, to be rendered later.
    pub fn signing_key(&mut self, seed: &KeySeed) -> Result<SignatureMaterial, KeyError> {
        self.derive(seed)?;
        Ok(SignatureMaterial::KeyHandle(seed.clone()))
    }

    /// Render one signature slot according to `mode`.
    ///
    /// Material that is already a string passes through unchanged.
    pub fn render(
        &mut self,
        material: &SignatureMaterial,
        mode: SignatureMode,
    ) -> Result<SignatureMaterial, KeyError> {
        let Some(seed) = material.seed() else {
            return Ok(material.clone());
        };
        match mode {
            SignatureMode::Deferred => Ok(material.clone()),
            SignatureMode::Resolved => Ok(SignatureMaterial::Resolved(self.wif(seed)?)),
            SignatureMode::Escaped(esc) => {
                let token = format!("{esc}{seed}{esc}");
                if token.chars().count() < RESOLVED_SIGNATURE_LEN {
                    self.derive(seed)?;
                    Ok(SignatureMaterial::Placeholder(token))
                } else {
                    Ok(SignatureMaterial::Resolved(self.wif(seed)?))
                }
            }
        }
    }

    /// Render every signature slot of `tx` in place.
    pub fn render_transaction(
        &mut self,
        tx: &mut Transaction,
        mode: SignatureMode,
    ) -> Result<(), KeyError> {
        for slot in tx.wif_sigs.iter_mut() {
            *slot = self.render(slot, mode)?;
        }
        Ok(())
    }
}

impl Default for KeyDatabase {
    fn default() -> Self {
        Self::new(b"", "TST")
    }
}

impl fmt::Debug for KeyDatabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyDatabase")
            .field("address_prefix", &self.address_prefix)
            .field("keys", &self.keys.len())
            .finish_non_exhaustive()
    }
}

fn entry<'a>(
    keys: &'a mut HashMap<KeySeed, ProceduralKey>,
    secret: &[u8],
    seed: &KeySeed,
) -> Result<&'a mut ProceduralKey, KeyError> {
    if seed.account.is_empty() {
        return Err(KeyError::EmptySeed);
    }
    match keys.entry(seed.clone()) {
        Entry::Occupied(occupied) => Ok(occupied.into_mut()),
        Entry::Vacant(vacant) => {
            let scalar = derive_secret(secret, seed)?;
            tracing::trace!(seed = %seed, "derived procedural key");
            Ok(vacant.insert(ProceduralKey {
                seed: seed.clone(),
                secret: SecretScalar(scalar),
                public_key: None,
                wif: None,
            }))
        }
    }
}

fn derive_secret(secret: &[u8], seed: &KeySeed) -> Result<[u8; 32], KeyError> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| KeyError::InvalidMacKey(e.to_string()))?;
    mac.update(seed.as_seed_string().as_bytes());
    Ok(mac.finalize().into_bytes().into())
}
