use crate::types::PreviewFrame;

/// Lifecycle status of the capture dialog, for TUI display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DialogStatus {
    #[default]
    Connecting,
    Live,
    Unavailable,
    Recognizing,
    Closed,
}

impl DialogStatus {
    pub fn label(self) -> &'static str {
        match self {
            DialogStatus::Connecting => "connecting",
            DialogStatus::Live => "live",
            DialogStatus::Unavailable => "unavailable",
            DialogStatus::Recognizing => "recognizing",
            DialogStatus::Closed => "closed",
        }
    }

    /// Whether a take-photo request would be accepted in this status.
    pub fn can_capture(self) -> bool {
        self == DialogStatus::Live
    }
}

/// Dialog state broadcast to the TUI via watch channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DialogState {
    pub status: DialogStatus,
    pub device_label: String,
    pub resolution: Option<(u32, u32)>,
    pub engine: String,
    pub document: String,
    pub alert: Option<String>,
    pub preview: Option<PreviewFrame>,
    pub frames_shown: u64,
}

/// Commands sent from TUI → dialog controller via mpsc channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogCommand {
    TakePhoto,
    Close,
}
