//! Error types raised by question source adapters.

use reqwest::StatusCode;
use thiserror::Error;

/// Convenient result alias returning [`SourceError`] failures.
pub type SourceResult<T> = Result<T, SourceError>;

/// Failures that can occur while talking to the question source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Building the HTTP client failed (invalid TLS setup, etc).
    #[error("failed to build question source client")]
    ClientBuilder {
        #[source]
        source: reqwest::Error,
    },
    /// The request could not be sent or the connection dropped.
    #[error("failed to send question source request to `{url}`")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The source answered with a non-success HTTP status.
    #[error("unexpected question source response status {status} for `{url}`")]
    HttpStatus { url: String, status: StatusCode },
    /// The response body was not the expected JSON document.
    #[error("failed to decode question source response from `{url}`")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The response lacked its status code.
    #[error("question source response from `{url}` has no response_code")]
    MissingResponseCode { url: String },
}
