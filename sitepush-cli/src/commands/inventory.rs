//! `sitepush inventory`: list what the bucket already holds.

use anyhow::{Context, Result};
use clap::Args;
use serde_json::json;

use sitepush_sync::pipeline;

use super::{runtime, target::TargetArgs};

/// Arguments for `sitepush inventory`.
#[derive(Args, Debug)]
pub struct InventoryArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl InventoryArgs {
    pub fn run(self) -> Result<()> {
        let config = self.target.load()?;
        let inventory = runtime()?
            .block_on(pipeline::inventory(&config, self.target.timeout()))
            .with_context(|| format!("failed to list s3://{}/{}", config.bucket, config.prefix))?;

        if self.json {
            let objects: Vec<_> = inventory
                .entries()
                .into_iter()
                .map(|(key, fingerprint)| json!({ "key": key, "fingerprint": fingerprint }))
                .collect();
            println!("{}", serde_json::to_string_pretty(&objects)?);
            return Ok(());
        }

        for (key, fingerprint) in inventory.entries() {
            println!("{fingerprint}  {key}");
        }
        println!("{} object(s) in s3://{}/{}", inventory.len(), config.bucket, config.prefix);
        Ok(())
    }
}
