//! Error types for the drafting client.

use thiserror::Error;

/// Errors that can occur while asking the completions API for a draft.
#[derive(Debug, Error)]
pub enum GeneratorError {
    /// The request itself failed (connect, TLS, deserialize).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("API error (status {status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, for the operator's eyes.
        body: String,
    },

    /// The completion carried no usable text.
    #[error("Completion contained no text")]
    Empty,
}
