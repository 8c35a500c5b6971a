//! # cloudlift-migrate
//!
//! Transactional migration of Terraform working directories from the
//! legacy remote backend to the `cloud` block.
//!
//! Call [`migrate_directory`] for a single directory, or [`run`] to process
//! every directory in a [`RunConfig`](cloudlift_core::RunConfig).

pub mod diff;
pub mod discover;
pub mod error;
pub mod pipeline;
pub mod rewriter;
pub mod terraform;

pub use diff::{diff_directory, DirectoryDiff, FileDiff};
pub use error::MigrateError;
pub use pipeline::{
    migrate_directory, plan_directory, preflight, run, DirectoryOutcome, DirectoryPlan,
    DirectoryReport,
};
pub use rewriter::{apply, RewriteOutcome, Stage, Transaction};
pub use terraform::{Terraform, TerraformCli};
