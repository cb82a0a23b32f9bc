//! Core library for pharmacy invoice extraction.
//!
//! This crate provides:
//! - Instruction building for the two extraction policies (permissive, strict)
//! - Defensive decoding of free-text model replies into invoice records
//! - The extraction orchestrator shared by every entry point
//! - CSV append persistence and configuration

pub mod decode;
pub mod error;
pub mod extractor;
pub mod models;
pub mod patterns;
pub mod persist;
pub mod request;

pub use decode::{DecodedReply, ParseStage, decode};
pub use error::{DecodeError, PharmscanError, Result};
pub use extractor::{InvoiceExtractor, SUPPORTED_EXTENSIONS, is_supported_image, load_image};
pub use models::config::PharmscanConfig;
pub use models::policy::ExtractionPolicy;
pub use models::record::{InvoiceRecord, LineItem, Section};
pub use persist::{append_record, count_invoices, record_cells};
pub use request::build_instruction;

/// Re-export gateway types.
pub use pharmscan_inference::{GatewayError, InferenceGateway, InvoiceImage};
