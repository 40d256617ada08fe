//! Nested configuration trees and a writer that persists them

pub mod config;
pub mod error;
pub mod writer;

pub use config::{Config, ConfigValue};
pub use error::ConfigError;
pub use writer::{render, ConfigWriter};

pub type Result<T> = std::result::Result<T, ConfigError>;
