pub mod document;
pub mod file_document;
pub mod memory_document;

pub use document::{append_text, Document};
pub use file_document::FileDocument;
pub use memory_document::MemoryDocument;
