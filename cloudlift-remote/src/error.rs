//! Error types for cloudlift-remote.

use thiserror::Error;

/// Longest response body excerpt kept in an error.
const SNIPPET_CHARS: usize = 200;

/// Failures talking to the remote workspace API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Server answered with a non-success status.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Connection, TLS, DNS or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Success status, but the body was not the expected document.
    #[error("unexpected response body: {0}")]
    Decode(String),
}

impl From<ureq::Error> for ApiError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::Status(status, response) => ApiError::Status {
                status,
                body: snippet(&response.into_string().unwrap_or_default()),
            },
            ureq::Error::Transport(transport) => ApiError::Transport(transport.to_string()),
        }
    }
}

/// First [`SNIPPET_CHARS`] characters of a response body.
pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(SNIPPET_CHARS).collect()
}
