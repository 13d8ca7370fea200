use crate::dialog::DialogContent;
use paper2md_camera::{capture_still, CameraDevice, MediaStream};
use paper2md_core::{
    Credential, DialogStatus, EncodedImage, Notifier, PreviewFrame, RecognitionError,
    RecognizedText, SnapshotFormat, WorkflowError,
};
use paper2md_document::{append_text, Document};
use paper2md_engine::RecognitionEngine;
use std::sync::Arc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Live,
    Unavailable,
    Ended,
}

/// One capture-and-recognize run, owning the camera stream for its lifetime.
///
/// A session is opened once ([`begin`](Self::begin)), submits at most one
/// request, and is ended once ([`end`](Self::end)). Ending stops every track
/// of the held stream; further calls stop nothing.
pub struct CaptureSession {
    camera: Arc<dyn CameraDevice>,
    engine: Arc<dyn RecognitionEngine>,
    document: Arc<dyn Document>,
    notifier: Arc<dyn Notifier>,
    format: SnapshotFormat,
    stream: Option<MediaStream>,
    phase: Phase,
    alert: Option<String>,
    device_label: String,
    resolution: Option<(u32, u32)>,
    requests_sent: usize,
}

impl CaptureSession {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        engine: Arc<dyn RecognitionEngine>,
        document: Arc<dyn Document>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let device_label = camera.name().to_string();
        Self {
            camera,
            engine,
            document,
            notifier,
            format: SnapshotFormat::default(),
            stream: None,
            phase: Phase::Idle,
            alert: None,
            device_label,
            resolution: None,
            requests_sent: 0,
        }
    }

    pub fn with_format(mut self, format: SnapshotFormat) -> Self {
        self.format = format;
        self
    }

    /// Request a live stream from `camera` and bind it to the session.
    ///
    /// On failure the user gets a blocking alert and the session stays
    /// [`DialogStatus::Unavailable`]; there is no retry.
    pub fn begin(&mut self, camera: &dyn CameraDevice) -> DialogStatus {
        if self.phase != Phase::Idle {
            tracing::warn!(status = self.status().label(), "session already started");
            return self.status();
        }

        match camera.open() {
            Ok(stream) => {
                if let Some(track) = stream.video_track() {
                    self.device_label = track.label().to_string();
                    self.resolution = Some(track.resolution());
                }
                tracing::info!(
                    device = %self.device_label,
                    resolution = ?self.resolution,
                    tracks = stream.track_count(),
                    "camera stream connected"
                );
                self.stream = Some(stream);
                self.phase = Phase::Live;
            }
            Err(e) => {
                let message = format!("could not connect stream: {e}");
                tracing::error!(device = %camera.name(), "camera acquisition failed: {e}");
                self.notifier.alert(&message);
                self.alert = Some(message);
                self.phase = Phase::Unavailable;
            }
        }
        self.status()
    }

    pub fn status(&self) -> DialogStatus {
        match self.phase {
            Phase::Idle => DialogStatus::Connecting,
            Phase::Live => DialogStatus::Live,
            Phase::Unavailable => DialogStatus::Unavailable,
            Phase::Ended => DialogStatus::Closed,
        }
    }

    pub fn device_label(&self) -> &str {
        &self.device_label
    }

    pub fn resolution(&self) -> Option<(u32, u32)> {
        self.resolution
    }

    pub fn engine_name(&self) -> &str {
        self.engine.name()
    }

    pub fn document_name(&self) -> &str {
        self.document.name()
    }

    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    pub fn requests_sent(&self) -> usize {
        self.requests_sent
    }

    /// Downscaled copy of the current frame, or `None` without a live stream.
    pub fn preview(&self, max_width: u32, max_height: u32) -> Option<PreviewFrame> {
        let track = self.stream.as_ref()?.video_track()?;
        match track.grab_frame() {
            Ok(frame) => Some(paper2md_camera::preview(&frame, max_width, max_height)),
            Err(e) => {
                tracing::debug!(device = %self.device_label, "no preview frame: {e}");
                None
            }
        }
    }

    /// Snapshot the current frame at native resolution and encode it.
    pub fn snapshot(&self) -> Result<EncodedImage, WorkflowError> {
        if self.phase != Phase::Live {
            return Err(WorkflowError::NoStream);
        }
        let stream = self.stream.as_ref().ok_or(WorkflowError::NoStream)?;
        let image = capture_still(stream, self.format)?;
        tracing::debug!(
            width = image.width,
            height = image.height,
            bytes = image.bytes.len(),
            mime = %image.mime,
            "snapshot encoded"
        );
        Ok(image)
    }

    /// Send one recognition request and wait for its result.
    pub async fn recognize(
        &self,
        image: &EncodedImage,
        credential: &Credential,
    ) -> Result<RecognizedText, RecognitionError> {
        self.engine.recognize(image, credential).await
    }

    /// Send one recognition request on its own task. Dropping the handle
    /// detaches the request: it runs to completion and its result is lost.
    pub fn spawn_recognition(
        &self,
        image: EncodedImage,
        credential: Credential,
    ) -> JoinHandle<Result<RecognizedText, RecognitionError>> {
        let engine = Arc::clone(&self.engine);
        tokio::spawn(async move { engine.recognize(&image, &credential).await })
    }

    /// Apply a finished request: append on success, notice on failure, then
    /// end the session either way.
    pub async fn deliver(
        &mut self,
        result: Result<RecognizedText, WorkflowError>,
    ) -> Result<RecognizedText, WorkflowError> {
        let result = match result {
            Ok(text) => append_text(self.document.as_ref(), &text.text)
                .await
                .map(|()| text)
                .map_err(WorkflowError::from),
            Err(e) => Err(e),
        };

        match &result {
            Ok(text) => tracing::info!(
                document = %self.document.name(),
                chars = text.text.chars().count(),
                "recognized text inserted"
            ),
            Err(e) => self.notifier.notice(&e.to_string()),
        }

        self.end();
        result
    }

    /// Take a photo, recognize it and deliver the result.
    ///
    /// Without a live stream this returns [`WorkflowError::NoStream`] and does
    /// nothing else: no request, no notice, and the session stays open. Every
    /// other outcome has already been delivered when this returns.
    pub async fn capture_and_submit(
        &mut self,
        credential: &Credential,
    ) -> Result<RecognizedText, WorkflowError> {
        let image = match self.snapshot() {
            Err(WorkflowError::NoStream) => return Err(WorkflowError::NoStream),
            Err(e) => return self.deliver(Err(e)).await,
            Ok(image) => image,
        };
        self.requests_sent += 1;
        let result = self
            .recognize(&image, credential)
            .await
            .map_err(WorkflowError::from);
        self.deliver(result).await
    }

    /// Mark a request as sent; used by callers driving the phases directly.
    pub fn note_request(&mut self) {
        self.requests_sent += 1;
    }

    /// Stop every track and release the device. Returns the number of tracks
    /// stopped by this call.
    pub fn end(&mut self) -> usize {
        let stopped = self.stream.take().map(|mut s| s.stop()).unwrap_or(0);
        if self.phase != Phase::Ended {
            tracing::info!(device = %self.device_label, tracks = stopped, "capture session ended");
            self.phase = Phase::Ended;
        }
        stopped
    }
}

impl DialogContent for CaptureSession {
    fn on_open(&mut self) {
        let camera = Arc::clone(&self.camera);
        self.begin(camera.as_ref());
    }

    fn on_close(&mut self) {
        self.end();
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.end();
    }
}
