//! Push configuration.
//!
//! Two sources produce the same immutable [`PushConfig`]:
//!
//! ```text
//! .awscredentials        (legacy, one value per line)
//!   <access key>
//!   <secret key>
//!   <region>
//!   <bucket>
//!   <prefix>             (may be blank or missing)
//!
//! sitepush.yaml          (credentials from the standard AWS provider chain)
//!   bucket: example-site
//!   region: eu-west-1
//!   prefix: assets
//!   build_dir: build
//!   endpoint_url: http://localhost:9000
//!   force_path_style: true
//! ```

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{io_err, ConfigError};
use crate::types::KeyPrefix;

/// Credential file read from the working directory when no path is given.
pub const DEFAULT_CREDENTIALS_FILE: &str = ".awscredentials";

/// Directory the site generator writes its output to.
pub const DEFAULT_BUILD_DIR: &str = "build";

/// An access key pair read from the credential file.
#[derive(Clone, PartialEq, Eq)]
pub struct StaticCredentials {
    pub access_key_id: String,
    pub secret_access_key: String,
}

impl fmt::Debug for StaticCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCredentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"** redacted **")
            .finish()
    }
}

/// Where the S3 client gets its credentials from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Key pair from the legacy credential file.
    Static(StaticCredentials),
    /// Environment, shared profile, instance role, ...
    DefaultChain,
}

/// Everything a run needs to know about its target. Never mutated after load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushConfig {
    pub credentials: CredentialSource,
    pub region: String,
    pub bucket: String,
    pub prefix: KeyPrefix,
    pub build_dir: PathBuf,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

// ---------------------------------------------------------------------------
// Legacy credential file
// ---------------------------------------------------------------------------

/// Load and parse the five-line credential file at `path`.
pub fn load_credentials_file(path: &Path) -> Result<PushConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    parse_credentials(&contents, path)
}

/// Parse credential file contents. `path` is only used for error messages.
///
/// Lines are trimmed and trailing blank lines ignored, so a file whose prefix
/// line is blank or missing yields an empty prefix.
pub fn parse_credentials(contents: &str, path: &Path) -> Result<PushConfig, ConfigError> {
    let mut lines: Vec<&str> = contents.lines().map(str::trim).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }

    let (access_key, secret_key, region, bucket, prefix) = match lines.as_slice() {
        [a, s, r, b] => (*a, *s, *r, *b, ""),
        [a, s, r, b, p] => (*a, *s, *r, *b, *p),
        other => {
            return Err(ConfigError::FieldCount {
                path: path.to_path_buf(),
                found: other.len(),
            })
        }
    };

    for (field, value) in [
        ("access key", access_key),
        ("secret key", secret_key),
        ("region", region),
        ("bucket", bucket),
    ] {
        if value.is_empty() {
            return Err(ConfigError::EmptyField {
                path: path.to_path_buf(),
                field,
            });
        }
    }

    Ok(PushConfig {
        credentials: CredentialSource::Static(StaticCredentials {
            access_key_id: access_key.to_owned(),
            secret_access_key: secret_key.to_owned(),
        }),
        region: region.to_owned(),
        bucket: bucket.to_owned(),
        prefix: KeyPrefix::new(prefix),
        build_dir: PathBuf::from(DEFAULT_BUILD_DIR),
        endpoint_url: None,
        force_path_style: false,
    })
}

// ---------------------------------------------------------------------------
// YAML site config
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SiteConfigFile {
    bucket: String,
    region: String,
    #[serde(default)]
    prefix: String,
    #[serde(default = "default_build_dir")]
    build_dir: PathBuf,
    #[serde(default)]
    endpoint_url: Option<String>,
    #[serde(default)]
    force_path_style: bool,
}

fn default_build_dir() -> PathBuf {
    PathBuf::from(DEFAULT_BUILD_DIR)
}

/// Load a YAML site config. Credentials come from the default provider chain.
///
/// Returns `ConfigError::NotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed YAML.
pub fn load_site_config(path: &Path) -> Result<PushConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let file: SiteConfigFile =
        serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            source: e,
        })?;

    for (field, value) in [("bucket", &file.bucket), ("region", &file.region)] {
        if value.trim().is_empty() {
            return Err(ConfigError::EmptyField {
                path: path.to_path_buf(),
                field,
            });
        }
    }

    Ok(PushConfig {
        credentials: CredentialSource::DefaultChain,
        region: file.region.trim().to_owned(),
        bucket: file.bucket.trim().to_owned(),
        prefix: KeyPrefix::new(&file.prefix),
        build_dir: file.build_dir,
        endpoint_url: file.endpoint_url.filter(|u| !u.trim().is_empty()),
        force_path_style: file.force_path_style,
    })
}
