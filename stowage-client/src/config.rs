//! Client configuration

use std::str::FromStr;
use std::time::Duration;
use stowage_core::auth::Credentials;

use crate::{ClientError, Result};

pub const DEFAULT_ENDPOINT: &str = "http://s3.amazonaws.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const ENDPOINT_VAR: &str = "STOWAGE_S3_ENDPOINT";
pub const ACCESS_KEY_ID_VAR: &str = "STOWAGE_S3_ACCESS_KEY_ID";
pub const SECRET_KEY_VAR: &str = "STOWAGE_S3_SECRET_KEY";
pub const ADDRESSING_VAR: &str = "STOWAGE_S3_ADDRESSING";

/// How the bucket is placed in request URLs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AddressingStyle {
    /// `{endpoint}/{bucket}/{key}`
    #[default]
    Path,
    /// `{scheme}://{bucket}.{host}/{key}`, path style for names that are not DNS compatible
    VirtualHost,
}

impl FromStr for AddressingStyle {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "path" => Ok(AddressingStyle::Path),
            "virtual-host" | "virtual" => Ok(AddressingStyle::VirtualHost),
            other => Err(ClientError::Config(format!("unknown addressing style '{}'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub endpoint: String,
    pub credentials: Credentials,
    pub addressing: AddressingStyle,
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>, credentials: Credentials) -> Self {
        ClientConfig {
            endpoint: endpoint.into(),
            credentials,
            addressing: AddressingStyle::default(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_addressing(mut self, addressing: AddressingStyle) -> Self {
        self.addressing = addressing;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Read the configuration from `STOWAGE_S3_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ClientError::Config(format!("{} is not set", name)))
        };

        let credentials = Credentials::new(required(ACCESS_KEY_ID_VAR)?, required(SECRET_KEY_VAR)?);
        let endpoint = lookup(ENDPOINT_VAR)
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let addressing = match lookup(ADDRESSING_VAR) {
            Some(value) if !value.is_empty() => value.parse()?,
            _ => AddressingStyle::default(),
        };

        Ok(ClientConfig::new(endpoint, credentials).with_addressing(addressing))
    }
}
