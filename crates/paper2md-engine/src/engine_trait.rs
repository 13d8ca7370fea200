use async_trait::async_trait;
use paper2md_core::{Credential, EncodedImage, RecognitionError, RecognizedText};

/// A recognition backend turning a captured image into text.
#[async_trait]
pub trait RecognitionEngine: Send + Sync {
    /// Engine name as used in configuration (e.g. `"mathpix"`).
    fn name(&self) -> &str;
    /// One-time initialisation with engine-specific TOML configuration.
    async fn initialize(&mut self, config: toml::Value) -> Result<(), RecognitionError>;
    /// Submit one image. Exactly one attempt, no retry.
    async fn recognize(
        &self,
        image: &EncodedImage,
        credential: &Credential,
    ) -> Result<RecognizedText, RecognitionError>;
}
