pub mod device;
pub mod pattern;
pub mod snapshot;
pub mod still;
pub mod stream;
#[cfg(feature = "v4l")]
pub mod v4l_capture;

pub use device::DeviceManager;
pub use pattern::{TestPatternCamera, TestPatternTrack};
pub use snapshot::{encode, preview, snapshot};
pub use still::{StillImageCamera, StillImageTrack};
pub use stream::{CameraDevice, MediaStream, VideoTrack};
#[cfg(feature = "v4l")]
pub use v4l_capture::V4lCamera;

use paper2md_core::{CameraError, EncodedImage, SnapshotFormat};

/// Snapshot the stream's video track and encode it for upload.
pub fn capture_still(
    stream: &MediaStream,
    format: SnapshotFormat,
) -> Result<EncodedImage, CameraError> {
    if stream.is_stopped() {
        return Err(CameraError::StreamStopped);
    }
    let track = stream
        .video_track()
        .ok_or_else(|| CameraError::StreamError("stream has no video track".to_string()))?;
    let frame = snapshot(track)?;
    encode(&frame, format)
}
