use image::RgbImage;
use paper2md_core::CameraError;

/// A single live video track inside a [`MediaStream`].
pub trait VideoTrack: Send + Sync {
    /// Human-readable source label (device path, file name, ...).
    fn label(&self) -> &str;
    /// Native pixel dimensions of the frames this track produces.
    fn resolution(&self) -> (u32, u32);
    /// The most recent frame. Fails once the track has been stopped.
    fn grab_frame(&self) -> Result<RgbImage, CameraError>;
    /// Stop the track and release its device. Idempotent.
    fn stop(&self);
    fn is_live(&self) -> bool;
}

/// A source that can grant a live [`MediaStream`].
pub trait CameraDevice: Send + Sync {
    fn name(&self) -> &str;
    fn open(&self) -> Result<MediaStream, CameraError>;
}

/// A granted set of video tracks, exclusively owned by one capture session.
pub struct MediaStream {
    tracks: Vec<Box<dyn VideoTrack>>,
    stopped: bool,
}

impl MediaStream {
    pub fn new(tracks: Vec<Box<dyn VideoTrack>>) -> Self {
        Self {
            tracks,
            stopped: false,
        }
    }

    pub fn single(track: impl VideoTrack + 'static) -> Self {
        Self::new(vec![Box::new(track)])
    }

    pub fn video_track(&self) -> Option<&dyn VideoTrack> {
        self.tracks.first().map(|t| t.as_ref())
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Stop every track. Returns how many tracks were stopped by this call;
    /// a stream is only ever stopped once, so later calls return 0.
    pub fn stop(&mut self) -> usize {
        if self.stopped {
            return 0;
        }
        self.stopped = true;
        for track in &self.tracks {
            tracing::debug!(track = %track.label(), "stopping track");
            track.stop();
        }
        self.tracks.len()
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let labels: Vec<&str> = self.tracks.iter().map(|t| t.label()).collect();
        f.debug_struct("MediaStream")
            .field("tracks", &labels)
            .field("stopped", &self.stopped)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    struct CountingTrack {
        stops: Arc<AtomicUsize>,
        live: AtomicBool,
    }

    impl CountingTrack {
        fn new(stops: Arc<AtomicUsize>) -> Self {
            Self {
                stops,
                live: AtomicBool::new(true),
            }
        }
    }

    impl VideoTrack for CountingTrack {
        fn label(&self) -> &str {
            "counting"
        }

        fn resolution(&self) -> (u32, u32) {
            (4, 2)
        }

        fn grab_frame(&self) -> Result<RgbImage, CameraError> {
            if !self.is_live() {
                return Err(CameraError::StreamStopped);
            }
            Ok(RgbImage::new(4, 2))
        }

        fn stop(&self) {
            self.stops.fetch_add(1, Ordering::SeqCst);
            self.live.store(false, Ordering::SeqCst);
        }

        fn is_live(&self) -> bool {
            self.live.load(Ordering::SeqCst)
        }
    }

    #[test]
    fn test_stop_stops_every_track_once() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut stream = MediaStream::new(vec![
            Box::new(CountingTrack::new(Arc::clone(&stops))),
            Box::new(CountingTrack::new(Arc::clone(&stops))),
        ]);
        assert_eq!(stream.stop(), 2);
        assert_eq!(stream.stop(), 0);
        assert!(stream.is_stopped());
        drop(stream);
        assert_eq!(stops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_drop_stops_unstopped_stream() {
        let stops = Arc::new(AtomicUsize::new(0));
        let stream = MediaStream::single(CountingTrack::new(Arc::clone(&stops)));
        drop(stream);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_video_track_is_first_track() {
        let stops = Arc::new(AtomicUsize::new(0));
        let stream = MediaStream::single(CountingTrack::new(stops));
        let track = stream.video_track().unwrap();
        assert_eq!(track.resolution(), (4, 2));
        assert_eq!(stream.track_count(), 1);
    }

    #[test]
    fn test_empty_stream_stops_nothing() {
        let mut stream = MediaStream::new(Vec::new());
        assert!(stream.video_track().is_none());
        assert_eq!(stream.stop(), 0);
    }

    #[test]
    fn test_grab_after_stop_fails() {
        let stops = Arc::new(AtomicUsize::new(0));
        let mut stream = MediaStream::single(CountingTrack::new(stops));
        stream.stop();
        let result = stream.video_track().unwrap().grab_frame();
        assert!(matches!(result, Err(CameraError::StreamStopped)));
    }
}
