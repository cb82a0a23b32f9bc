//! Error types for the inference gateway.

use thiserror::Error;

/// Errors that can occur while reaching the inference service.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// The credential needed to reach the service is absent or empty.
    #[error("{var} is not set")]
    MissingCredential { var: String },

    /// The HTTP client could not be built.
    #[error("failed to create client: {0}")]
    ClientBuild(String),

    /// The request never produced a response.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an error payload.
    #[error("service error ({status}): {message}")]
    Service { status: u16, message: String },

    /// The service answered 2xx but the envelope could not be read.
    #[error("malformed service response: {0}")]
    MalformedEnvelope(String),
}
