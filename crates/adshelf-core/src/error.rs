//! Domain errors that callers need to tell apart.
//!
//! Everything else travels as `anyhow::Error`; these are the cases the HTTP
//! layer maps to a client error instead of a 500.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("invalid: ad has no image reference, cannot derive its identity")]
    MissingImage,

    #[error("invalid keyword registration: {reason}")]
    InvalidKeyword { reason: String },

    #[error("invalid advertiser selection \"{value}\": expected \"all\", \"none\" or a list")]
    InvalidSelection { value: String },
}
