use async_trait::async_trait;
use paper2md_core::DocumentError;

/// The note that recognized text is appended to.
///
/// Only whole-buffer reads and writes are exposed; [`append_text`] builds the
/// append on top of them.
#[async_trait]
pub trait Document: Send + Sync {
    /// Human-readable name shown in the dialog header (e.g. a file path).
    fn name(&self) -> &str;
    /// Returns the full current content.
    async fn read_text(&self) -> Result<String, DocumentError>;
    /// Replaces the full content.
    async fn replace_text(&self, text: &str) -> Result<(), DocumentError>;
}

/// Append `text` verbatim to the end of the document.
///
/// Read-modify-write of the whole buffer. No separator is inserted.
pub async fn append_text(document: &dyn Document, text: &str) -> Result<(), DocumentError> {
    let mut content = document.read_text().await?;
    let before = content.len();
    content.push_str(text);
    document.replace_text(&content).await?;
    tracing::info!(
        document = %document.name(),
        appended = text.len(),
        before,
        after = content.len(),
        "document updated"
    );
    Ok(())
}
