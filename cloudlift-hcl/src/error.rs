//! Error types for cloudlift-hcl.

use thiserror::Error;

/// Failures of an individual extraction strategy. These never escape the
/// extractor: a failing strategy hands over to the next one.
#[derive(Debug, Error)]
pub enum HclError {
    /// The structured parser rejected the document.
    #[error("HCL parse error: {0}")]
    Parse(#[from] hcl::Error),

    /// The document parsed but holds no `terraform { backend "remote" { } }`.
    #[error("document has no remote backend declaration")]
    BackendNotFound,
}
