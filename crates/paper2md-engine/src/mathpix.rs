use crate::engine_trait::RecognitionEngine;
use async_trait::async_trait;
use paper2md_core::config::DEFAULT_MATHPIX_ENDPOINT;
use paper2md_core::{Credential, EncodedImage, RecognitionError, RecognizedText};
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

pub const SERVICE_NAME: &str = "MathPix";

/// Request options sent with every upload, byte for byte.
pub const OPTIONS_JSON: &str = r#"{"math_inline_delimiters": ["$", "$"], "rm_spaces": true}"#;

/// MathPix OCR client.
///
/// `app_id` and `endpoint` come from configuration at initialisation; the
/// `app_key` credential is supplied per request by the caller.
pub struct MathpixEngine {
    app_id: Option<String>,
    endpoint: String,
    client: reqwest::Client,
}

impl MathpixEngine {
    pub fn new() -> Self {
        Self {
            app_id: None,
            endpoint: DEFAULT_MATHPIX_ENDPOINT.to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_app_id(app_id: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            app_id: Some(app_id.into()),
            endpoint: endpoint.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(err: impl std::fmt::Display) -> RecognitionError {
        RecognitionError::Transport {
            service: SERVICE_NAME.to_string(),
            message: err.to_string(),
        }
    }

    fn rejected(message: impl Into<String>) -> RecognitionError {
        RecognitionError::Rejected {
            service: SERVICE_NAME.to_string(),
            message: message.into(),
        }
    }
}

impl Default for MathpixEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct MathpixReply {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Classify a MathPix response into text or an error.
///
/// A status outside 200–299 is an error regardless of the body. A non-empty
/// `error` field is an error even with a success status. A success body
/// without `text` is treated as a rejection.
pub fn interpret_response(status: u16, body: &str) -> Result<RecognizedText, RecognitionError> {
    if !(200..300).contains(&status) {
        return Err(RecognitionError::HttpStatus {
            service: SERVICE_NAME.to_string(),
            status,
        });
    }

    let reply: MathpixReply = serde_json::from_str(body)
        .map_err(|e| MathpixEngine::rejected(format!("malformed response: {e}")))?;

    match reply.error {
        Some(serde_json::Value::String(message)) if !message.is_empty() => {
            return Err(MathpixEngine::rejected(message));
        }
        Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) | None => {}
        Some(other) => return Err(MathpixEngine::rejected(other.to_string())),
    }

    reply
        .text
        .map(RecognizedText::new)
        .ok_or_else(|| MathpixEngine::rejected("response missing 'text' field"))
}

#[async_trait]
impl RecognitionEngine for MathpixEngine {
    fn name(&self) -> &str {
        "mathpix"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), RecognitionError> {
        let app_id = config
            .get("app_id")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                RecognitionError::InitializationFailed(
                    "missing 'app_id' in mathpix config".to_string(),
                )
            })?;
        self.app_id = Some(app_id.to_string());

        if let Some(endpoint) = config.get("endpoint").and_then(|v| v.as_str()) {
            self.endpoint = endpoint.to_string();
        }

        tracing::info!(app_id = %app_id, endpoint = %self.endpoint, "MathpixEngine initialized");
        Ok(())
    }

    async fn recognize(
        &self,
        image: &EncodedImage,
        credential: &Credential,
    ) -> Result<RecognizedText, RecognitionError> {
        let app_id = self.app_id.as_deref().ok_or_else(|| {
            RecognitionError::InitializationFailed("mathpix engine not initialized".to_string())
        })?;

        let part = Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime)
            .map_err(Self::transport_error)?;
        let form = Form::new()
            .text("options_json", OPTIONS_JSON)
            .part("file", part);

        if credential.is_empty() {
            tracing::warn!("no MathPix app_key configured, sending the request anyway");
        }
        tracing::info!(
            endpoint = %self.endpoint,
            bytes = image.bytes.len(),
            width = image.width,
            height = image.height,
            "uploading snapshot to MathPix"
        );

        let resp = self
            .client
            .post(&self.endpoint)
            .header("app_id", app_id)
            .header("app_key", credential.expose())
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport_error)?;

        let status = resp.status().as_u16();
        let body = resp.text().await.map_err(Self::transport_error)?;
        tracing::debug!(status, body_len = body.len(), "MathPix responded");

        interpret_response(status, &body)
    }
}
