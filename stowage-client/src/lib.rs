//! Async client for S3-compatible object storage

pub mod client;
pub mod config;
pub mod error;
pub mod xml;

pub use client::{ListOptions, PutOptions, S3Client};
pub use config::{AddressingStyle, ClientConfig};
pub use error::ClientError;

pub use stowage_core::auth::Credentials;
pub use stowage_core::{Acl, ETag, ObjectInfo};

pub type Result<T> = std::result::Result<T, ClientError>;
