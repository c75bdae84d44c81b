//! Error types for sitepush-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while loading push configuration.
///
/// Every variant is fatal: the run aborts before any network call.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file did not exist at the expected path.
    #[error("config file not found at {path}")]
    NotFound { path: PathBuf },

    /// Underlying I/O failure while reading a configuration file.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The credential file did not carry the expected number of lines.
    #[error(
        "credential file {path} has {found} field(s); expected access key, secret key, \
         region, bucket and an optional prefix, one per line"
    )]
    FieldCount { path: PathBuf, found: usize },

    /// A required field was present but blank.
    #[error("{path}: {field} must not be empty")]
    EmptyField { path: PathBuf, field: &'static str },

    /// YAML parse error on load: includes file path and line context from serde_yaml.
    #[error("failed to parse site config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
