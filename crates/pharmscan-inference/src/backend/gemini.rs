//! Google Gemini backend using the `generateContent` REST endpoint.
//!
//! The instruction is sent first and the image second, as one user turn.
//! The API key travels in the `x-goog-api-key` header rather than the
//! query string so it never shows up in request URLs or logs.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::GatewayError;
use crate::{InferenceGateway, InvoiceImage, Result};

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Connection settings for [`GeminiGateway`].
#[derive(Clone)]
pub struct GeminiConfig {
    api_key: String,
    /// Where the key came from, named in credential errors.
    key_source: String,
    /// Model name, e.g. `gemini-1.5-flash`.
    pub model: String,
    /// API base URL without a trailing `/models`.
    pub endpoint: String,
    /// Sampling temperature; `None` leaves the service default.
    pub temperature: Option<f32>,
}

impl GeminiConfig {
    /// Create a config with the default model and endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            key_source: "API key".to_string(),
            model: DEFAULT_MODEL.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            temperature: None,
        }
    }

    /// Read the API key from the named environment variable.
    ///
    /// An unset or blank variable is a configuration error.
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self {
                key_source: var.to_string(),
                ..Self::new(key.trim())
            }),
            _ => Err(GatewayError::MissingCredential {
                var: var.to_string(),
            }),
        }
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the API base URL.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }

    fn url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.endpoint.trim_end_matches('/'),
            self.model
        )
    }
}

impl fmt::Debug for GeminiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeminiConfig")
            .field("api_key", &"<redacted>")
            .field("key_source", &self.key_source)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .field("temperature", &self.temperature)
            .finish()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    contents: Vec<RequestContent<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Debug, Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum RequestPart<'a> {
    Text {
        text: &'a str,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Gateway backed by the Gemini API.
pub struct GeminiGateway {
    client: Client,
    config: GeminiConfig,
}

impl GeminiGateway {
    /// Build the gateway. Call once per process and share the result.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(GatewayError::MissingCredential {
                var: config.key_source.clone(),
            });
        }

        let client = Client::builder()
            .user_agent(concat!("pharmscan/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::ClientBuild(e.to_string()))?;

        info!(model = %config.model, "Gemini gateway ready");

        Ok(Self { client, config })
    }
}

impl InferenceGateway for GeminiGateway {
    fn infer(&self, image: &InvoiceImage, instruction: &str) -> Result<String> {
        let body = build_request(image, instruction, self.config.temperature);

        debug!(
            model = %self.config.model,
            image_bytes = image.len(),
            media_type = image.media_type(),
            "Sending generateContent request"
        );

        let response = self
            .client
            .post(self.config.url())
            .header("x-goog-api-key", &self.config.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        let text = response.text()?;

        if !status.is_success() {
            let message = service_error_message(&text);
            warn!(status = status.as_u16(), "Gemini returned an error");
            return Err(GatewayError::Service {
                status: status.as_u16(),
                message,
            });
        }

        let reply = reply_text(&text)?;
        debug!(reply_chars = reply.len(), "Received reply");
        Ok(reply)
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

fn build_request<'a>(
    image: &'a InvoiceImage,
    instruction: &'a str,
    temperature: Option<f32>,
) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![RequestContent {
            role: "user",
            parts: vec![
                RequestPart::Text { text: instruction },
                RequestPart::Inline {
                    inline_data: InlineData {
                        mime_type: image.media_type(),
                        data: BASE64_STANDARD.encode(image.bytes()),
                    },
                },
            ],
        }],
        generation_config: temperature.map(|temperature| GenerationConfig { temperature }),
    }
}

/// Concatenate the text parts of the first candidate.
fn reply_text(body: &str) -> Result<String> {
    let response: GenerateContentResponse = serde_json::from_str(body)
        .map_err(|e| GatewayError::MalformedEnvelope(e.to_string()))?;

    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates returned".to_string());
        return Err(GatewayError::Service {
            status: 200,
            message: reason,
        });
    };

    Ok(candidate
        .content
        .map(|c| {
            c.parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default())
}

fn service_error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => envelope.error.message,
        Err(_) if body.trim().is_empty() => "empty error body".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_request_puts_instruction_before_image() {
        let image = InvoiceImage::new(b"abc".to_vec(), "image/png");
        let body = build_request(&image, "Extract data", None);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        { "text": "Extract data" },
                        { "inlineData": { "mimeType": "image/png", "data": "YWJj" } }
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_request_includes_temperature_when_set() {
        let image = InvoiceImage::new(vec![1], "image/jpeg");
        let json = serde_json::to_value(build_request(&image, "x", Some(0.5))).unwrap();
        assert_eq!(json["generationConfig"]["temperature"], 0.5);
    }

    #[test]
    fn test_reply_text_joins_parts() {
        let body = r#"{
            "candidates": [{
                "content": { "parts": [ { "text": "{\"a\":" }, { "text": " 1}" } ] }
            }]
        }"#;
        assert_eq!(reply_text(body).unwrap(), "{\"a\": 1}");
    }

    #[test]
    fn test_reply_text_without_parts_is_empty() {
        let body = r#"{ "candidates": [ { "finishReason": "SAFETY" } ] }"#;
        assert_eq!(reply_text(body).unwrap(), "");
    }

    #[test]
    fn test_blocked_prompt_is_service_error() {
        let body = r#"{ "promptFeedback": { "blockReason": "SAFETY" } }"#;
        match reply_text(body) {
            Err(GatewayError::Service { message, .. }) => assert_eq!(message, "SAFETY"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_garbage_envelope_is_malformed() {
        assert!(matches!(
            reply_text("<html>"),
            Err(GatewayError::MalformedEnvelope(_))
        ));
    }

    #[test]
    fn test_service_error_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(service_error_message(body), "API key not valid");
        assert_eq!(service_error_message(""), "empty error body");
        assert_eq!(service_error_message("Bad Gateway"), "Bad Gateway");
    }

    #[test]
    fn test_url_and_redacted_debug() {
        let config = GeminiConfig::new("secret-key")
            .with_endpoint("https://example.test/v1beta/")
            .with_model("gemini-2.0-flash");
        assert_eq!(
            config.url(),
            "https://example.test/v1beta/models/gemini-2.0-flash:generateContent"
        );
        assert!(!format!("{:?}", config).contains("secret-key"));
    }

    #[test]
    fn test_blank_key_is_rejected() {
        match GeminiGateway::new(GeminiConfig::new("   ")) {
            Err(err) => assert_eq!(err.to_string(), "API key is not set"),
            Ok(_) => panic!("blank key accepted"),
        }
    }

    #[test]
    fn test_blank_key_names_its_variable() {
        let config = GeminiConfig {
            api_key: "  ".to_string(),
            key_source: "PHARMACY_GEMINI_KEY".to_string(),
            ..GeminiConfig::new("unused")
        };
        match GeminiGateway::new(config) {
            Err(GatewayError::MissingCredential { var }) => assert_eq!(var, "PHARMACY_GEMINI_KEY"),
            Err(other) => panic!("unexpected: {}", other),
            Ok(_) => panic!("blank key accepted"),
        }
    }

    #[test]
    fn test_from_env_missing_variable() {
        let err = GeminiConfig::from_env("PHARMSCAN_TEST_KEY_THAT_IS_NEVER_SET").unwrap_err();
        assert_eq!(err.to_string(), "PHARMSCAN_TEST_KEY_THAT_IS_NEVER_SET is not set");
    }
}
