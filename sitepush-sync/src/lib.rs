//! # sitepush-sync
//!
//! Incremental, content-addressed upload of a static site build tree to an
//! S3-compatible bucket.
//!
//! Call [`pipeline::push`] to sync the build directory named in a
//! [`sitepush_core::PushConfig`], or [`pipeline::run`] to drive any
//! [`ObjectStore`] directly.

pub mod driver;
pub mod error;
pub mod inventory;
pub mod memory;
pub mod pipeline;
pub mod report;
pub mod s3;
pub mod store;
pub mod walk;

pub use driver::{RunOptions, SyncDriver};
pub use error::{FileError, SyncError};
pub use inventory::{list_inventory, Inventory, UploadDecision};
pub use report::{FileOutcome, SyncReport};
pub use store::{AccessPolicy, ObjectStore, PutObject, StoreError};
