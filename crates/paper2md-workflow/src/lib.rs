pub mod controller;
pub mod dialog;
pub mod session;

pub use controller::{capture_once, DialogController, DialogOutcome};
pub use dialog::{CaptureDialog, DialogContent, DialogSlot};
pub use session::CaptureSession;
