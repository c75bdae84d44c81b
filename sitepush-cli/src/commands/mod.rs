pub mod inventory;
pub mod push;
pub mod target;

use anyhow::{Context, Result};

/// Multi-threaded runtime for one command invocation.
pub(crate) fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")
}
