//! Error taxonomy for configuration and the administrative surface.
//!
//! Configuration errors are fatal at startup. Administrative errors
//! (unknown kind, malformed outcome, bad boost amount) are rejected
//! synchronously with no partial effect. Store and tick errors live with
//! the components that raise them.

use thiserror::Error;

/// Invalid signal parameters, detected at load time.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("signal `{kind}`: {message}")]
    InvalidSignal { kind: String, message: String },

    #[error("signal `{kind}` missing from registry")]
    MissingSignal { kind: String },

    #[error("invalid config value for `{key}`: {message}")]
    InvalidValue { key: String, message: String },
}

/// Invalid administrative input, rejected synchronously.
#[derive(Error, Debug)]
pub enum AdminError {
    #[error("unknown signal kind `{0}`")]
    UnknownKind(String),

    #[error("unknown outcome `{0}` (expected high_engagement, low_engagement, acknowledged, error or skipped)")]
    UnknownOutcome(String),

    #[error("boost amount must be finite and >= 0, got {0}")]
    InvalidBoost(f64),

    #[error("quiet duration must be > 0")]
    InvalidQuietDuration,
}
