//! sitepush core library: domain types, configuration loading, errors.
//!
//! - [`types`]: object keys, key prefixes, content hashes
//! - [`config`]: credential file and YAML site config loading
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{CredentialSource, PushConfig, StaticCredentials};
pub use error::ConfigError;
pub use types::{ContentHash, KeyPrefix, ObjectKey};
