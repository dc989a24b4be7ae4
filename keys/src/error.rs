use thiserror::Error;

#[derive(Debug, Error)]
pub enum KeyError {
    #[error("key seed has an empty account name")]
    EmptySeed,

    #[error("derived scalar for {seed} is not a valid secp256k1 secret key")]
    InvalidScalar { seed: String },

    #[error("invalid HMAC key: {0}")]
    InvalidMacKey(String),
}
