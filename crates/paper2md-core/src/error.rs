use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("environment variable not found: {0}")]
    EnvVarNotFound(String),
}

#[derive(Debug, Error)]
pub enum CameraError {
    #[error("camera device not found: {0}")]
    DeviceNotFound(String),

    #[error("camera access denied: {0}")]
    AccessDenied(String),

    #[error("camera backend not available: {0}")]
    BackendUnavailable(String),

    #[error("failed to open stream: {0}")]
    StreamOpen(String),

    #[error("stream error: {0}")]
    StreamError(String),

    #[error("stream has been stopped")]
    StreamStopped,

    #[error("failed to encode snapshot: {0}")]
    Encode(String),
}

/// Failure of a single recognition attempt.
///
/// The `Display` form of the service variants is the exact text shown to the
/// user, e.g. `MathPix API returned error: 500`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RecognitionError {
    #[error("recognition engine initialization failed: {0}")]
    InitializationFailed(String),

    #[error("recognition engine not found: {0}")]
    EngineNotFound(String),

    #[error("{service} API returned error: {status}")]
    HttpStatus { service: String, status: u16 },

    #[error("{service} API returned error: {message}")]
    Rejected { service: String, message: String },

    #[error("{service} API request failed: {message}")]
    Transport { service: String, message: String },
}

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("failed to read document: {0}")]
    ReadFailed(String),

    #[error("failed to write document: {0}")]
    WriteFailed(String),
}

#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("a capture dialog is already open")]
    DialogAlreadyOpen,

    #[error("camera stream is not available")]
    NoStream,

    #[error(transparent)]
    Camera(#[from] CameraError),

    #[error(transparent)]
    Recognition(#[from] RecognitionError),

    #[error("failed to update document: {0}")]
    Document(#[from] DocumentError),
}
