//! Error types for cloudlift-core.

use std::path::PathBuf;

use thiserror::Error;

/// All errors that can arise while resolving the run configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Underlying I/O failure, with the path that was being read.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Run manifest exists but is not valid YAML for the expected shape.
    #[error("failed to parse run manifest at {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Apply mode needs an API token for the remote workspace calls.
    #[error("no API token; pass --token or set TFC_TOKEN")]
    MissingToken,

    /// The hostname resolved to an empty string.
    #[error("hostname must not be empty")]
    EmptyHostname,
}

/// Convenience constructor for [`ConfigError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> ConfigError {
    ConfigError::Io {
        path: path.into(),
        source,
    }
}
