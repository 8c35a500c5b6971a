//! # cloudlift-remote
//!
//! Remote workspace tag reconciliation. [`reconcile`] runs against any
//! [`WorkspaceApi`]; [`TfcClient`] is the HTTPS implementation.

pub mod client;
pub mod error;
pub mod reconcile;

pub use client::{parse_workspace, TfcClient, Workspace, WorkspaceApi};
pub use error::ApiError;
pub use reconcile::{reconcile, ReconcileOutcome};
