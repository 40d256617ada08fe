//! Server error types

use hyper::StatusCode;
use stowage_core::StowageError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("The specified bucket does not exist: {0}")]
    NoSuchBucket(String),

    #[error("The specified key does not exist: {0}")]
    NoSuchKey(String),

    #[error("The bucket you tried to delete is not empty: {0}")]
    BucketNotEmpty(String),

    #[error("Access Denied")]
    AccessDenied,

    #[error("The request signature we calculated does not match the signature you provided")]
    SignatureDoesNotMatch,

    #[error("The Content-MD5 you specified did not match what we received")]
    BadDigest,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("The specified method is not allowed against this resource")]
    MethodNotAllowed,

    #[error(transparent)]
    Core(#[from] StowageError),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// S3 error code reported in the XML error document
    pub fn code(&self) -> &'static str {
        match self {
            ServerError::NoSuchBucket(_) => "NoSuchBucket",
            ServerError::NoSuchKey(_) => "NoSuchKey",
            ServerError::BucketNotEmpty(_) => "BucketNotEmpty",
            ServerError::AccessDenied => "AccessDenied",
            ServerError::SignatureDoesNotMatch => "SignatureDoesNotMatch",
            ServerError::BadDigest => "BadDigest",
            ServerError::InvalidArgument(_) => "InvalidArgument",
            ServerError::MethodNotAllowed => "MethodNotAllowed",
            ServerError::Core(StowageError::InvalidBucketName { .. }) => "InvalidBucketName",
            ServerError::Core(StowageError::InvalidUri(_)) => "InvalidURI",
            ServerError::Core(StowageError::InvalidAcl(_)) => "InvalidArgument",
            ServerError::Core(StowageError::InvalidKey(_)) => "InvalidArgument",
            ServerError::Core(StowageError::Signature(_)) => "AccessDenied",
            _ => "InternalError",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::NoSuchBucket(_) | ServerError::NoSuchKey(_) => StatusCode::NOT_FOUND,
            ServerError::BucketNotEmpty(_) => StatusCode::CONFLICT,
            ServerError::AccessDenied | ServerError::SignatureDoesNotMatch => StatusCode::FORBIDDEN,
            ServerError::BadDigest | ServerError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            ServerError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ServerError::Core(StowageError::Signature(_)) => StatusCode::FORBIDDEN,
            ServerError::Core(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
