//! Local S3-compatible endpoint: an in-memory store behind the S3 REST API

pub mod error;
pub mod handlers;
pub mod server;
pub mod store;
pub mod xml;

pub use error::ServerError;
pub use handlers::{handle_request, Endpoint};
pub use server::StowageServer;
pub use store::{ListQuery, Listing, ObjectStore, StoredObject};

#[cfg(any(test, feature = "test-utils"))]
pub use server::spawn_local;

/// Result type alias for server operations
pub type Result<T> = std::result::Result<T, ServerError>;
