//! Decoding of free-text model replies into invoice records.
//!
//! The model is asked for bare JSON but may wrap it in prose or markdown
//! fences. Decoding is a two-stage state machine:
//!
//! 1. Parse the whole reply as JSON.
//! 2. Otherwise parse the largest brace span (first `{` to last `}`).
//!
//! Whichever stage succeeds, the value must be an object; null-valued
//! top-level keys are then dropped. Nested values are not inspected.
//!
//! The whole reply is always tried first so that example JSON echoed in
//! surrounding prose cannot win over a clean reply.

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::DecodeError;
use crate::models::record::InvoiceRecord;
use crate::patterns::BRACE_SPAN;

/// Stage at which the reply became JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseStage {
    /// The reply was JSON as a whole.
    Strict,
    /// JSON was recovered from the largest brace span.
    BraceScan,
}

/// A decoded reply plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedReply {
    pub record: InvoiceRecord,
    pub stage: ParseStage,
}

enum State<'a> {
    RawText(&'a str),
    StrictParse(&'a str),
    ScanForObject(&'a str),
    Validated(Value, ParseStage),
    Rejected,
}

/// Decode a reply into a record.
pub fn decode(raw: &str) -> Result<InvoiceRecord, DecodeError> {
    decode_reply(raw).map(|decoded| decoded.record)
}

/// Decode a reply, also reporting which stage produced the JSON.
pub fn decode_reply(raw: &str) -> Result<DecodedReply, DecodeError> {
    let mut state = State::RawText(raw);

    loop {
        state = match state {
            State::RawText(text) => State::StrictParse(text),

            State::StrictParse(text) => match serde_json::from_str::<Value>(text) {
                Ok(value) => State::Validated(value, ParseStage::Strict),
                Err(e) => {
                    debug!("Reply is not bare JSON ({}), scanning for an object", e);
                    State::ScanForObject(text)
                }
            },

            State::ScanForObject(text) => match BRACE_SPAN.find(text) {
                Some(span) => match serde_json::from_str::<Value>(span.as_str()) {
                    Ok(value) => State::Validated(value, ParseStage::BraceScan),
                    Err(e) => {
                        debug!("Brace span is not JSON: {}", e);
                        State::Rejected
                    }
                },
                None => {
                    debug!("No brace span in reply");
                    State::Rejected
                }
            },

            State::Validated(Value::Object(object), stage) => {
                let record = InvoiceRecord::from_object(object);
                debug!(stage = ?stage, keys = record.len(), "Reply decoded");
                return Ok(DecodedReply { record, stage });
            }

            State::Validated(other, _) => {
                let kind = kind_of(&other);
                warn!("Reply decoded to {} instead of an object", kind);
                return Err(DecodeError::UnexpectedShape {
                    kind,
                    raw: raw.to_string(),
                });
            }

            State::Rejected => {
                warn!(reply_chars = raw.len(), "Could not parse reply as JSON");
                debug!("Rejected reply: {}", raw);
                return Err(DecodeError::Unparseable {
                    raw: raw.to_string(),
                });
            }
        };
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
