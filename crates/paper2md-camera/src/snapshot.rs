use crate::stream::VideoTrack;
use image::{imageops, ImageFormat, RgbImage};
use paper2md_core::{CameraError, EncodedImage, PreviewFrame, SnapshotFormat};
use std::io::Cursor;

/// Copy the track's current frame onto a canvas of the track's native size.
///
/// Both the canvas and the copied region use the native pixel dimensions; a
/// frame larger than native is cropped from the top-left, a smaller one
/// leaves the remainder black.
pub fn snapshot(track: &dyn VideoTrack) -> Result<RgbImage, CameraError> {
    let (width, height) = track.resolution();
    let frame = track.grab_frame()?;
    if frame.dimensions() == (width, height) {
        return Ok(frame);
    }

    tracing::debug!(
        native = ?(width, height),
        delivered = ?frame.dimensions(),
        "frame size differs from native resolution, cropping"
    );
    let copy_w = width.min(frame.width());
    let copy_h = height.min(frame.height());
    let region = imageops::crop_imm(&frame, 0, 0, copy_w, copy_h).to_image();
    let mut canvas = RgbImage::new(width, height);
    imageops::replace(&mut canvas, &region, 0, 0);
    Ok(canvas)
}

pub fn encode(frame: &RgbImage, format: SnapshotFormat) -> Result<EncodedImage, CameraError> {
    let image_format = match format {
        SnapshotFormat::Png => ImageFormat::Png,
        SnapshotFormat::Jpeg => ImageFormat::Jpeg,
    };
    let mut cursor = Cursor::new(Vec::new());
    frame
        .write_to(&mut cursor, image_format)
        .map_err(|e| CameraError::Encode(e.to_string()))?;

    Ok(EncodedImage {
        bytes: cursor.into_inner(),
        mime: format.mime().to_string(),
        file_name: format!("capture.{}", format.extension()),
        width: frame.width(),
        height: frame.height(),
    })
}

/// Downscale a frame to fit within `max_width` x `max_height`, keeping aspect.
pub fn preview(frame: &RgbImage, max_width: u32, max_height: u32) -> PreviewFrame {
    if frame.width() == 0 || frame.height() == 0 || max_width == 0 || max_height == 0 {
        return PreviewFrame::default();
    }
    let scale = f64::min(
        f64::from(max_width) / f64::from(frame.width()),
        f64::from(max_height) / f64::from(frame.height()),
    )
    .min(1.0);
    let width = ((f64::from(frame.width()) * scale) as u32).max(1);
    let height = ((f64::from(frame.height()) * scale) as u32).max(1);
    let small = imageops::thumbnail(frame, width, height);

    PreviewFrame {
        width: small.width(),
        height: small.height(),
        pixels: small.pixels().map(|p| p.0).collect(),
    }
}
