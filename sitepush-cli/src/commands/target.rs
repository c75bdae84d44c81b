//! Flags shared by every command that talks to a bucket.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;

use sitepush_core::{
    config::{self, DEFAULT_CREDENTIALS_FILE},
    PushConfig,
};

/// Where to push and how to authenticate.
#[derive(Args, Debug)]
pub struct TargetArgs {
    /// Credential file: access key, secret key, region, bucket and prefix,
    /// one per line [default: .awscredentials]
    #[arg(long, conflicts_with = "config")]
    pub credentials: Option<PathBuf>,

    /// YAML site config; credentials then come from the standard AWS
    /// provider chain.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: u64,
}

impl TargetArgs {
    /// Load the immutable push config from whichever source was selected.
    pub fn load(&self) -> Result<PushConfig> {
        let cfg = match &self.config {
            Some(path) => config::load_site_config(path)
                .with_context(|| format!("failed to load site config {}", path.display()))?,
            None => {
                let path = self
                    .credentials
                    .clone()
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIALS_FILE));
                config::load_credentials_file(&path)
                    .with_context(|| format!("failed to load credentials {}", path.display()))?
            }
        };
        tracing::debug!(
            bucket = %cfg.bucket,
            region = %cfg.region,
            prefix = %cfg.prefix,
            "loaded push config"
        );
        Ok(cfg)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }
}
