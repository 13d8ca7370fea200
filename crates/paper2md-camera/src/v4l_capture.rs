use crate::stream::{CameraDevice, MediaStream, VideoTrack};
use image::{ImageFormat, Rgb, RgbImage};
use paper2md_core::CameraError;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use v4l::buffer::Type;
use v4l::io::mmap::Stream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

const BUFFER_COUNT: u32 = 4;
const FIRST_FRAME_TIMEOUT: Duration = Duration::from_secs(3);

/// Video4Linux2 webcam (e.g. `/dev/video0`).
pub struct V4lCamera {
    path: PathBuf,
    name: String,
    requested: Option<(u32, u32)>,
}

impl V4lCamera {
    pub fn new(path: impl Into<PathBuf>, requested: Option<(u32, u32)>) -> Self {
        let path = path.into();
        let name = format!("v4l:{}", path.display());
        Self {
            path,
            name,
            requested,
        }
    }
}

/// Enumerate V4L2 capture nodes as `(name, path)` pairs.
pub fn list_devices() -> Vec<(String, PathBuf)> {
    v4l::context::enum_devices()
        .into_iter()
        .map(|node| {
            let name = node.name().unwrap_or_else(|| "unknown".to_string());
            (name, node.path().to_path_buf())
        })
        .collect()
}

#[derive(Debug, Clone, Copy)]
struct Negotiated {
    width: u32,
    height: u32,
    fourcc: FourCC,
}

struct Shared {
    latest: Mutex<Option<RgbImage>>,
    running: AtomicBool,
}

impl CameraDevice for V4lCamera {
    fn name(&self) -> &str {
        &self.name
    }

    fn open(&self) -> Result<MediaStream, CameraError> {
        let shared = Arc::new(Shared {
            latest: Mutex::new(None),
            running: AtomicBool::new(true),
        });
        let (ready_tx, ready_rx) = mpsc::channel();

        let worker_shared = Arc::clone(&shared);
        let path = self.path.clone();
        let requested = self.requested;
        let worker = std::thread::Builder::new()
            .name("v4l-capture".to_string())
            .spawn(move || capture_loop(path, requested, worker_shared, ready_tx))
            .map_err(|e| CameraError::StreamOpen(e.to_string()))?;

        let negotiated = match ready_rx.recv() {
            Ok(Ok(negotiated)) => negotiated,
            Ok(Err(e)) => {
                let _ = worker.join();
                return Err(e);
            }
            Err(_) => {
                let _ = worker.join();
                return Err(CameraError::StreamOpen(
                    "capture thread exited before negotiating a format".to_string(),
                ));
            }
        };

        tracing::info!(
            device = %self.path.display(),
            width = negotiated.width,
            height = negotiated.height,
            fourcc = %negotiated.fourcc,
            "v4l stream granted"
        );

        Ok(MediaStream::single(V4lTrack {
            label: self.path.display().to_string(),
            width: negotiated.width,
            height: negotiated.height,
            shared,
            worker: Mutex::new(Some(worker)),
        }))
    }
}

fn map_open_error(path: &Path, err: std::io::Error) -> CameraError {
    match err.kind() {
        std::io::ErrorKind::NotFound => CameraError::DeviceNotFound(path.display().to_string()),
        std::io::ErrorKind::PermissionDenied => {
            CameraError::AccessDenied(path.display().to_string())
        }
        _ => CameraError::StreamOpen(format!("{}: {}", path.display(), err)),
    }
}

fn negotiate(dev: &Device, requested: Option<(u32, u32)>) -> Result<Negotiated, CameraError> {
    let mjpg = FourCC::new(b"MJPG");
    let yuyv = FourCC::new(b"YUYV");

    let mut format = dev
        .format()
        .map_err(|e| CameraError::StreamOpen(e.to_string()))?;
    if let Some((width, height)) = requested {
        format.width = width;
        format.height = height;
    }

    format.fourcc = mjpg;
    let mut applied = dev
        .set_format(&format)
        .map_err(|e| CameraError::StreamOpen(e.to_string()))?;
    if applied.fourcc != mjpg {
        format.fourcc = yuyv;
        applied = dev
            .set_format(&format)
            .map_err(|e| CameraError::StreamOpen(e.to_string()))?;
    }
    if applied.fourcc != mjpg && applied.fourcc != yuyv {
        return Err(CameraError::StreamOpen(format!(
            "unsupported pixel format {}",
            applied.fourcc
        )));
    }

    Ok(Negotiated {
        width: applied.width,
        height: applied.height,
        fourcc: applied.fourcc,
    })
}

fn capture_loop(
    path: PathBuf,
    requested: Option<(u32, u32)>,
    shared: Arc<Shared>,
    ready: mpsc::Sender<Result<Negotiated, CameraError>>,
) {
    let dev = match Device::with_path(&path) {
        Ok(dev) => dev,
        Err(e) => {
            let _ = ready.send(Err(map_open_error(&path, e)));
            return;
        }
    };
    let negotiated = match negotiate(&dev, requested) {
        Ok(n) => n,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };
    let mut stream = match Stream::with_buffers(&dev, Type::VideoCapture, BUFFER_COUNT) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(map_open_error(&path, e)));
            return;
        }
    };
    let _ = ready.send(Ok(negotiated));

    while shared.running.load(Ordering::Relaxed) {
        match stream.next() {
            Ok((buf, meta)) => {
                let used = (meta.bytesused as usize).min(buf.len());
                let data = if used == 0 { buf } else { &buf[..used] };
                match decode_frame(data, &negotiated) {
                    Ok(frame) => {
                        if let Ok(mut latest) = shared.latest.lock() {
                            *latest = Some(frame);
                        }
                    }
                    Err(e) => tracing::warn!(device = %path.display(), "dropping frame: {e}"),
                }
            }
            Err(e) => {
                tracing::error!(device = %path.display(), "capture stream error: {e}");
                break;
            }
        }
    }

    shared.running.store(false, Ordering::Relaxed);
    tracing::debug!(device = %path.display(), "capture thread exiting, releasing device");
}

fn decode_frame(data: &[u8], negotiated: &Negotiated) -> Result<RgbImage, CameraError> {
    if negotiated.fourcc == FourCC::new(b"MJPG") {
        image::load_from_memory_with_format(data, ImageFormat::Jpeg)
            .map(|img| img.to_rgb8())
            .map_err(|e| CameraError::StreamError(e.to_string()))
    } else {
        yuyv_to_rgb(data, negotiated.width, negotiated.height)
    }
}

/// Convert packed YUYV 4:2:2 into RGB using BT.601 coefficients.
pub fn yuyv_to_rgb(data: &[u8], width: u32, height: u32) -> Result<RgbImage, CameraError> {
    let expected = width as usize * height as usize * 2;
    if data.len() < expected || width % 2 != 0 {
        return Err(CameraError::StreamError(format!(
            "short YUYV frame: {} bytes for {}x{}",
            data.len(),
            width,
            height
        )));
    }

    let mut image = RgbImage::new(width, height);
    for (i, chunk) in data[..expected].chunks_exact(4).enumerate() {
        let (y0, u, y1, v) = (chunk[0], chunk[1], chunk[2], chunk[3]);
        let x = (i as u32 * 2) % width;
        let y = (i as u32 * 2) / width;
        image.put_pixel(x, y, yuv_pixel(y0, u, v));
        image.put_pixel(x + 1, y, yuv_pixel(y1, u, v));
    }
    Ok(image)
}

fn yuv_pixel(y: u8, u: u8, v: u8) -> Rgb<u8> {
    let c = f32::from(y) - 16.0;
    let d = f32::from(u) - 128.0;
    let e = f32::from(v) - 128.0;
    let r = 1.164 * c + 1.596 * e;
    let g = 1.164 * c - 0.392 * d - 0.813 * e;
    let b = 1.164 * c + 2.017 * d;
    Rgb([clamp(r), clamp(g), clamp(b)])
}

fn clamp(value: f32) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

pub struct V4lTrack {
    label: String,
    width: u32,
    height: u32,
    shared: Arc<Shared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl VideoTrack for V4lTrack {
    fn label(&self) -> &str {
        &self.label
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn grab_frame(&self) -> Result<RgbImage, CameraError> {
        let deadline = Instant::now() + FIRST_FRAME_TIMEOUT;
        loop {
            if !self.is_live() {
                return Err(CameraError::StreamStopped);
            }
            if let Some(frame) = self.shared.latest.lock().ok().and_then(|l| l.clone()) {
                return Ok(frame);
            }
            if Instant::now() >= deadline {
                return Err(CameraError::StreamError(
                    "no frame received from device".to_string(),
                ));
            }
            std::thread::sleep(Duration::from_millis(10));
        }
    }

    fn stop(&self) {
        self.shared.running.store(false, Ordering::Relaxed);
        let handle = self.worker.lock().ok().and_then(|mut w| w.take());
        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!(device = %self.label, "capture thread panicked");
            }
        }
    }

    fn is_live(&self) -> bool {
        self.shared.running.load(Ordering::Relaxed)
    }
}
