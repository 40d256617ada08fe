//! Error types for stowage

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StowageError {
    #[error("Bucket name \"{name}\" {reason}")]
    InvalidBucketName { name: String, reason: String },

    #[error("Invalid URI supplied: {0}")]
    InvalidUri(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Unknown ACL: {0}")]
    InvalidAcl(String),

    #[error("Signature error: {0}")]
    Signature(String),
}

impl StowageError {
    /// True for errors raised by bucket naming rules
    pub fn is_naming(&self) -> bool {
        matches!(self, StowageError::InvalidBucketName { .. })
    }

    /// True for errors raised while building a request URI
    pub fn is_uri(&self) -> bool {
        matches!(self, StowageError::InvalidUri(_))
    }
}
