//! Request authentication for stowage
//!
//! Implements AWS Signature Version 2:
//! - access-key-id / secret-key credentials
//! - canonical string-to-sign construction shared by signer and verifier
//! - constant-time signature comparison

pub mod canonical;
pub mod credentials;

pub use canonical::*;
pub use credentials::*;
