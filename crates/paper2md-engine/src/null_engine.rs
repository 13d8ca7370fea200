use crate::engine_trait::RecognitionEngine;
use async_trait::async_trait;
use paper2md_core::{Credential, EncodedImage, RecognitionError, RecognizedText};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Offline engine that answers every request with a fixed text.
pub struct NullEngine {
    text: String,
    request_count: AtomicUsize,
}

impl NullEngine {
    pub fn new() -> Self {
        Self {
            text: String::new(),
            request_count: AtomicUsize::new(0),
        }
    }

    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            request_count: AtomicUsize::new(0),
        }
    }

    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }
}

impl Default for NullEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecognitionEngine for NullEngine {
    fn name(&self) -> &str {
        "null"
    }

    async fn initialize(&mut self, config: toml::Value) -> Result<(), RecognitionError> {
        if let Some(text) = config.get("text").and_then(|v| v.as_str()) {
            self.text = text.to_string();
        }
        Ok(())
    }

    async fn recognize(
        &self,
        image: &EncodedImage,
        _credential: &Credential,
    ) -> Result<RecognizedText, RecognitionError> {
        let count = self.request_count.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::trace!("NullEngine request #{count}, {} bytes", image.bytes.len());
        Ok(RecognizedText::new(self.text.clone()))
    }
}
