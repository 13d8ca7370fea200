use crate::document::Document;
use async_trait::async_trait;
use paper2md_core::DocumentError;
use std::path::{Path, PathBuf};

/// A markdown note on disk. A missing file reads as empty and is created on
/// first write, along with its parent directory.
pub struct FileDocument {
    path: PathBuf,
    name: String,
}

impl FileDocument {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path.display().to_string();
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Document for FileDocument {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_text(&self) -> Result<String, DocumentError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => Ok(text),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.name, "document does not exist yet, starting empty");
                Ok(String::new())
            }
            Err(e) => Err(DocumentError::ReadFailed(format!("{}: {}", self.name, e))),
        }
    }

    async fn replace_text(&self, text: &str) -> Result<(), DocumentError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DocumentError::WriteFailed(format!("{}: {}", parent.display(), e)))?;
        }
        tokio::fs::write(&self.path, text)
            .await
            .map_err(|e| DocumentError::WriteFailed(format!("{}: {}", self.name, e)))
    }
}
