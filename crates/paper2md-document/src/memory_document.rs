use crate::document::Document;
use async_trait::async_trait;
use paper2md_core::DocumentError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// In-memory document buffer.
pub struct MemoryDocument {
    content: Mutex<String>,
    read_only: bool,
    replace_count: AtomicUsize,
}

impl MemoryDocument {
    pub fn new(initial: impl Into<String>) -> Self {
        Self {
            content: Mutex::new(initial.into()),
            read_only: false,
            replace_count: AtomicUsize::new(0),
        }
    }

    /// A buffer whose writes always fail.
    pub fn read_only(initial: impl Into<String>) -> Self {
        Self {
            read_only: true,
            ..Self::new(initial)
        }
    }

    /// Number of successful `replace_text` calls.
    pub fn replace_count(&self) -> usize {
        self.replace_count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> String {
        self.content
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new("")
    }
}

#[async_trait]
impl Document for MemoryDocument {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read_text(&self) -> Result<String, DocumentError> {
        self.content
            .lock()
            .map(|c| c.clone())
            .map_err(|e| DocumentError::ReadFailed(e.to_string()))
    }

    async fn replace_text(&self, text: &str) -> Result<(), DocumentError> {
        if self.read_only {
            return Err(DocumentError::WriteFailed("document is read-only".to_string()));
        }
        let mut content = self
            .content
            .lock()
            .map_err(|e| DocumentError::WriteFailed(e.to_string()))?;
        *content = text.to_string();
        self.replace_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
