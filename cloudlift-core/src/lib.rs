//! cloudlift core library: domain types, run configuration, errors.
//!
//! - [`types`]: descriptors, plans, backup records, tag requests
//! - [`config`]: [`RunConfig`] resolution from CLI, environment and manifest
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod types;

pub use config::{ConfigOverrides, Manifest, RunConfig, RunMode};
pub use error::ConfigError;
pub use types::{
    backup_path_for, derive_tag, BackendDescriptor, BackendFields, BackupRecord, MigrationPlan,
    NotMigratable, OrganizationName, TagReconciliationRequest, WorkspaceBinding, WorkspaceName,
    DEFAULT_HOSTNAME,
};
