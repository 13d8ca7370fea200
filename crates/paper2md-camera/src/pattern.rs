use crate::stream::{CameraDevice, MediaStream, VideoTrack};
use image::{Rgb, RgbImage};
use paper2md_core::CameraError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

pub const DEFAULT_PATTERN_SIZE: (u32, u32) = (640, 480);

/// Synthetic camera producing an animated test card.
pub struct TestPatternCamera {
    width: u32,
    height: u32,
}

impl TestPatternCamera {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width: width.max(1),
            height: height.max(1),
        }
    }
}

impl Default for TestPatternCamera {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERN_SIZE.0, DEFAULT_PATTERN_SIZE.1)
    }
}

impl CameraDevice for TestPatternCamera {
    fn name(&self) -> &str {
        "pattern"
    }

    fn open(&self) -> Result<MediaStream, CameraError> {
        tracing::info!(width = self.width, height = self.height, "test pattern stream granted");
        Ok(MediaStream::single(TestPatternTrack::new(self.width, self.height)))
    }
}

pub struct TestPatternTrack {
    label: String,
    width: u32,
    height: u32,
    frame_index: AtomicU64,
    live: AtomicBool,
}

impl TestPatternTrack {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            label: format!("pattern {}x{}", width, height),
            width,
            height,
            frame_index: AtomicU64::new(0),
            live: AtomicBool::new(true),
        }
    }

    fn render(&self, index: u64) -> RgbImage {
        let bar_width = (self.width / 16).max(1);
        let bar_x = ((index * 8) % u64::from(self.width)) as u32;
        RgbImage::from_fn(self.width, self.height, |x, y| {
            if x >= bar_x && x < bar_x + bar_width {
                return Rgb([255, 255, 255]);
            }
            let r = (x * 255 / self.width.max(1)) as u8;
            let g = (y * 255 / self.height.max(1)) as u8;
            Rgb([r, g, 96])
        })
    }
}

impl VideoTrack for TestPatternTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab_frame(&self) -> Result<RgbImage, CameraError> {
        if !self.is_live() {
            return Err(CameraError::StreamStopped);
        }
        let index = self.frame_index.fetch_add(1, Ordering::Relaxed);
        Ok(self.render(index))
    }

    fn stop(&self) {
        self.live.store(false, Ordering::Relaxed);
    }

    fn is_live(&self) -> bool {
        self.live.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pattern_frames_match_native_resolution() {
        let camera = TestPatternCamera::new(64, 48);
        let stream = camera.open().unwrap();
        let track = stream.video_track().unwrap();
        let frame = track.grab_frame().unwrap();
        assert_eq!(track.resolution(), (64, 48));
        assert_eq!(frame.dimensions(), (64, 48));
    }

    #[test]
    fn test_pattern_animates_between_frames() {
        let track = TestPatternTrack::new(64, 48);
        let a = track.grab_frame().unwrap();
        let b = track.grab_frame().unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_pattern_zero_size_is_clamped() {
        let camera = TestPatternCamera::new(0, 0);
        let stream = camera.open().unwrap();
        assert_eq!(stream.video_track().unwrap().resolution(), (1, 1));
    }

    #[test]
    fn test_pattern_stopped_track_refuses_frames() {
        let track = TestPatternTrack::new(8, 8);
        track.stop();
        assert!(!track.is_live());
        assert!(matches!(track.grab_frame(), Err(CameraError::StreamStopped)));
    }
}
