//! Text encodings for secp256k1 keys.
//!
//! Private keys use WIF: base58check over `0x80 || secret`. Public keys are
//! the address prefix followed by base58 of the compressed point with the
//! first four bytes of its RIPEMD-160 digest appended.

use k256::elliptic_curve::sec1::ToEncodedPoint;
use ripemd::{Digest, Ripemd160};
use sha2::Sha256;

/// Version byte prepended to the secret before base58check encoding.
pub const WIF_VERSION: u8 = 0x80;

/// Secret behind a well-known brain key, `SHA-256(passphrase)`.
///
/// Used for the init miner, whose genesis key is fixed by the node.
pub fn passphrase_secret(passphrase: &str) -> [u8; 32] {
    Sha256::digest(passphrase.as_bytes()).into()
}

/// Encode a 32-byte secret as a WIF string (always 51 characters).
pub fn encode_wif(secret: &[u8; 32]) -> String {
    let mut payload = Vec::with_capacity(33);
    payload.push(WIF_VERSION);
    payload.extend_from_slice(secret);
    bs58::encode(payload).with_check().into_string()
}

/// Compressed SEC1 public point for `secret`.
///
/// Returns `None` if the bytes are zero or not below the curve order.
pub fn compressed_public_key(secret: &[u8; 32]) -> Option<[u8; 33]> {
    let secret_key = k256::SecretKey::from_slice(secret).ok()?;
    let point = secret_key.public_key().to_encoded_point(true);
    <[u8; 33]>::try_from(point.as_bytes()).ok()
}

/// Encode a compressed public point with the network address prefix.
pub fn encode_public_key(point: &[u8; 33], prefix: &str) -> String {
    let checksum = Ripemd160::digest(point);
    let mut payload = Vec::with_capacity(37);
    payload.extend_from_slice(point);
    payload.extend_from_slice(&checksum[..4]);
    format!("{prefix}{}", bs58::encode(payload).into_string())
}
