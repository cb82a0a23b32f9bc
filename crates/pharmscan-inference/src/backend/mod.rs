//! Inference gateway implementations.

pub mod gemini;

use crate::{InvoiceImage, Result};

/// Trait for multimodal inference services.
///
/// Implementations are constructed once per process and shared read-only
/// between extraction calls, so they must be `Send + Sync`. No retries or
/// timeouts beyond what the transport does natively.
pub trait InferenceGateway: Send + Sync {
    /// Send the image and instruction, return the model's reply verbatim.
    ///
    /// # Arguments
    /// * `image` - The invoice image
    /// * `instruction` - Natural-language instruction plus schema description
    ///
    /// # Returns
    /// Unstructured reply text, with no guarantee about its format
    fn infer(&self, image: &InvoiceImage, instruction: &str) -> Result<String>;

    /// Short name used in logs.
    fn name(&self) -> &str;
}
