//! Procedural key database.
//!
//! Every keypair on the generated testnet is a pure function of the database
//! secret and a `(account, role)` seed, so the same configuration always
//! yields the same keys.

pub mod encoding;
pub mod error;
pub mod keydb;

pub use encoding::{
    compressed_public_key, encode_public_key, encode_wif, passphrase_secret, WIF_VERSION,
};
pub use error::KeyError;
pub use keydb::{KeyDatabase, ProceduralKey, SignatureMode};
