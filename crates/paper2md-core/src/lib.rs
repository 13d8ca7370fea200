pub mod config;
pub mod dialog_types;
pub mod error;
pub mod notify;
pub mod types;

pub use config::{AppConfig, CameraConfig, SnapshotFormat};
pub use dialog_types::{DialogCommand, DialogState, DialogStatus};
pub use error::{CameraError, ConfigError, DocumentError, RecognitionError, WorkflowError};
pub use notify::{NoticeBoard, Notifier, TracingNotifier};
pub use types::{Credential, EncodedImage, PreviewFrame, RecognizedText};
