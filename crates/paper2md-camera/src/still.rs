use crate::stream::{CameraDevice, MediaStream, VideoTrack};
use image::{ImageError, RgbImage};
use paper2md_core::CameraError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

/// Serves a fixed image file as a live feed. Useful for scanned pages and
/// for machines without a webcam.
pub struct StillImageCamera {
    path: PathBuf,
    name: String,
}

impl StillImageCamera {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("still:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CameraDevice for StillImageCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<MediaStream, CameraError> {
        let image = image::open(&self.path).map_err(|e| match e {
            ImageError::IoError(io) => match io.kind() {
                std::io::ErrorKind::NotFound => {
                    CameraError::DeviceNotFound(self.path.display().to_string())
                }
                std::io::ErrorKind::PermissionDenied => {
                    CameraError::AccessDenied(self.path.display().to_string())
                }
                _ => CameraError::StreamOpen(io.to_string()),
            },
            other => CameraError::StreamOpen(other.to_string()),
        })?;

        let frame = image.to_rgb8();
        tracing::info!(
            path = %self.path.display(),
            width = frame.width(),
            height = frame.height(),
            "still image stream granted"
        );
        Ok(MediaStream::single(StillImageTrack::new(
            self.path.display().to_string(),
            frame,
        )))
    }
}

pub struct StillImageTrack {
    label: String,
    frame: RgbImage,
    live: AtomicBool,
}

impl StillImageTrack {
    pub fn new(label: impl Into<String>, frame: RgbImage) -> Self {
        Self {
            label: label.into(),
            frame,
            live: AtomicBool::new(true),
        }
    }
}

impl VideoTrack for StillImageTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn resolution(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn grab_frame(&self) -> Result<RgbImage, CameraError> {
        if !self.is_live() {
            return Err(CameraError::StreamStopped);
        }
        Ok(self.frame.clone())
    }

    fn stop(&self) {
        self.live.store(false, Ordering::Relaxed);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }
}
