//! Extraction orchestrator: image in, invoice record out.
//!
//! The gateway is constructed once and shared. If construction fails the
//! extractor stays usable but reports every call as unavailable without
//! touching the network.

use std::path::Path;
use std::sync::Arc;

use image::ImageFormat;
use pharmscan_inference::{GeminiGateway, InferenceGateway, InvoiceImage};
use tracing::{debug, info, warn};

use crate::decode::decode_reply;
use crate::error::{PharmscanError, Result};
use crate::models::config::GatewayConfig;
use crate::models::policy::ExtractionPolicy;
use crate::models::record::InvoiceRecord;
use crate::request::build_instruction;

/// File extensions accepted as invoice images.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

/// Check whether `path` has a supported image extension.
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Media type guessed from the file extension, `image/jpeg` when unknown.
pub fn media_type_for(path: &Path) -> &'static str {
    ImageFormat::from_path(path)
        .map(|format| format.to_mime_type())
        .unwrap_or(InvoiceImage::DEFAULT_MEDIA_TYPE)
}

/// Read an invoice image from disk.
pub fn load_image(path: &Path) -> Result<InvoiceImage> {
    let bytes = std::fs::read(path).map_err(|source| PharmscanError::ImageRead {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(InvoiceImage::new(bytes, media_type_for(path)))
}

enum GatewayState {
    Ready(Arc<dyn InferenceGateway>),
    Unavailable(String),
}

/// Runs the request, infer and decode steps for one image at a time.
///
/// Cheap to share across threads; it holds no per-call state.
pub struct InvoiceExtractor {
    gateway: GatewayState,
}

impl InvoiceExtractor {
    /// Create an extractor over an already-built gateway.
    pub fn new(gateway: Arc<dyn InferenceGateway>) -> Self {
        Self {
            gateway: GatewayState::Ready(gateway),
        }
    }

    /// Create an extractor whose gateway could not be built.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            gateway: GatewayState::Unavailable(reason.into()),
        }
    }

    /// Build the Gemini gateway from configuration.
    ///
    /// Failure is logged once and remembered; it is not an error here.
    pub fn from_config(config: &GatewayConfig) -> Self {
        match config.resolve().and_then(GeminiGateway::new) {
            Ok(gateway) => Self::new(Arc::new(gateway)),
            Err(e) => {
                warn!("Inference gateway unavailable: {}", e);
                Self::unavailable(e.to_string())
            }
        }
    }

    /// Whether the gateway was constructed successfully.
    pub fn is_available(&self) -> bool {
        matches!(self.gateway, GatewayState::Ready(_))
    }

    /// Fail with [`PharmscanError::Unavailable`] if the gateway was not built.
    pub fn check_available(&self) -> Result<()> {
        self.gateway().map(|_| ())
    }

    /// Name of the active backend, if any.
    pub fn gateway_name(&self) -> Option<&str> {
        match &self.gateway {
            GatewayState::Ready(gateway) => Some(gateway.name()),
            GatewayState::Unavailable(_) => None,
        }
    }

    fn gateway(&self) -> Result<&dyn InferenceGateway> {
        match &self.gateway {
            GatewayState::Ready(gateway) => Ok(gateway.as_ref()),
            GatewayState::Unavailable(reason) => Err(PharmscanError::Unavailable(reason.clone())),
        }
    }

    /// Extract a record from an image already in memory.
    pub fn extract_image(
        &self,
        image: &InvoiceImage,
        policy: ExtractionPolicy,
    ) -> Result<InvoiceRecord> {
        let gateway = self.gateway()?;
        let instruction = build_instruction(policy);

        debug!(
            policy = %policy,
            backend = gateway.name(),
            image_bytes = image.len(),
            "Requesting extraction"
        );

        let raw = gateway.infer(image, &instruction)?;
        let decoded = decode_reply(&raw)?;

        info!(
            sections = decoded.record.len(),
            stage = ?decoded.stage,
            "Extraction complete"
        );

        Ok(decoded.record)
    }

    /// Extract a record from an image file.
    ///
    /// Availability is checked before the file is read, and the gateway
    /// is never called when the file cannot be read.
    pub fn try_extract(&self, path: &Path, policy: ExtractionPolicy) -> Result<InvoiceRecord> {
        self.check_available()?;
        let image = load_image(path)?;
        self.extract_image(&image, policy)
    }

    /// Extract a record, reporting failure as a message.
    ///
    /// Never fails: on error the record is empty and the message says why.
    /// On success the message is empty.
    pub fn extract(&self, path: &Path, policy: ExtractionPolicy) -> (InvoiceRecord, String) {
        match self.try_extract(path, policy) {
            Ok(record) => (record, String::new()),
            Err(e) => {
                warn!(path = %path.display(), "Extraction failed: {}", e);
                (InvoiceRecord::new(), failure_message(&e))
            }
        }
    }
}

fn failure_message(error: &PharmscanError) -> String {
    match error {
        PharmscanError::Unavailable(_) => format!("Error: {}", error),
        PharmscanError::Decode(e) => e.to_string(),
        other => format!("Error processing image: {}", other),
    }
}
