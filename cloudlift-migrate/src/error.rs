//! Error types for cloudlift-migrate.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while migrating a directory.
#[derive(Debug, Error)]
pub enum MigrateError {
    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The terraform executable could not be found.
    #[error("terraform binary not found at '{program}'; install Terraform or set CLOUDLIFT_TERRAFORM")]
    ToolMissing { program: PathBuf },

    /// The terraform executable exists but could not be started.
    #[error("could not run '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A terraform subcommand exited unsuccessfully.
    #[error("terraform {command} failed ({status})")]
    ToolFailed {
        command: &'static str,
        status: String,
        /// Combined stdout and stderr of the process.
        output: String,
    },

    /// A restored file does not hash to the content that was backed up.
    #[error("restored {path} does not match its backup")]
    RestoreMismatch { path: PathBuf },
}

impl MigrateError {
    /// Process output attached to the error, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            MigrateError::ToolFailed { output, .. } if !output.is_empty() => Some(output),
            _ => None,
        }
    }
}

/// Convenience constructor for [`MigrateError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> MigrateError {
    MigrateError::Io {
        path: path.into(),
        source,
    }
}
