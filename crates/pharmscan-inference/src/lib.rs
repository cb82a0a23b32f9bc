//! Inference gateway for pharmscan.
//!
//! This crate hides the external multimodal model behind a single trait:
//! an invoice image and an instruction go in, unstructured reply text comes
//! out. Backends:
//! - `gemini` - Google Gemini `generateContent` over blocking HTTP

mod backend;
mod error;
mod image;

pub use backend::InferenceGateway;
pub use backend::gemini::{
    DEFAULT_API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_MODEL, GeminiConfig, GeminiGateway,
};
pub use error::GatewayError;
pub use image::InvoiceImage;

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
