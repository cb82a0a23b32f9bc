//! Error types for the pharmscan-core library.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the pharmscan library.
#[derive(Error, Debug)]
pub enum PharmscanError {
    /// The inference gateway could not be constructed at startup.
    #[error("inference service not initialized ({0}). Check your API key.")]
    Unavailable(String),

    /// The invoice image could not be read.
    #[error("cannot read {}: {source}", .path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Inference service failure.
    #[error("inference error: {0}")]
    Gateway(#[from] pharmscan_inference::GatewayError),

    /// The reply could not be turned into a record.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// CSV writing error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing was extracted, so there is nothing to save.
    #[error("No data to save. Please extract data first.")]
    EmptyRecord,
}

/// Errors produced while decoding a model reply.
///
/// Both variants keep the reply verbatim so callers can log it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// Neither the whole reply nor its largest brace span is JSON.
    #[error("Could not parse the response as JSON")]
    Unparseable { raw: String },

    /// The reply is JSON but not an object.
    #[error("Could not parse the response as JSON: expected an object, found {kind}")]
    UnexpectedShape { kind: &'static str, raw: String },
}

impl DecodeError {
    /// The reply text that failed to decode.
    pub fn raw_text(&self) -> &str {
        match self {
            DecodeError::Unparseable { raw } | DecodeError::UnexpectedShape { raw, .. } => raw,
        }
    }
}

/// Result type for the pharmscan library.
pub type Result<T> = std::result::Result<T, PharmscanError>;
