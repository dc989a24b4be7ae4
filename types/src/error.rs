//! Errors raised by the wire types themselves.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("amount asset mismatch: {left} vs {right}")]
    AmountMismatch { left: String, right: String },

    #[error("amount overflow")]
    AmountOverflow,

    #[error("unknown key role: {0}")]
    UnknownRole(String),
}
