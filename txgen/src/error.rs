use thiserror::Error;

#[derive(Debug, Error)]
pub enum TxgenError {
    #[error("invalid invocation: {0}")]
    InvalidInvocation(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("Unsupported snapshot: {0}")]
    UnsupportedSnapshot(String),

    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),

    #[error("insufficient supply: {0}")]
    InsufficientSupply(String),

    #[error("invalid backfill at line {line}: {reason}")]
    InvalidBackfill { line: usize, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("key error: {0}")]
    Keys(#[from] forge_keys::KeyError),

    #[error("{0}")]
    Types(#[from] forge_types::TypesError),
}
