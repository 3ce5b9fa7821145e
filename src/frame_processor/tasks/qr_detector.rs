// SPDX-License-Identifier: GPL-3.0-only

//! QR code detection task
//!
//! Implements [`Detector`] with the `rqrr` crate. Frames are converted to
//! luma (honouring stride), downscaled for real-time processing, and the
//! first grid that decodes wins.

use crate::backends::camera::types::{Frame, PixelFormat, StillImage};
use crate::constants::scanner::DEFAULT_MAX_DIMENSION;
use crate::errors::{DetectorError, DetectorResult};
use crate::frame_processor::{DetectFuture, Detector};
use futures::FutureExt;
use std::time::Instant;
use tracing::{debug, trace, warn};

/// QR code detector
///
/// Optimized for real-time processing with frame downscaling.
#[derive(Debug, Clone)]
pub struct QrDetector {
    /// Maximum dimension for processing (frames are downscaled to this)
    max_dimension: u32,
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl QrDetector {
    /// Create a new QR detector with default settings
    pub fn new() -> Self {
        Self {
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }

    /// Create a QR detector with custom max dimension
    pub fn with_max_dimension(max_dimension: u32) -> Self {
        Self {
            max_dimension: max_dimension.max(1),
        }
    }

    pub fn max_dimension(&self) -> u32 {
        self.max_dimension
    }
}

impl Detector for QrDetector {
    fn detect(&self, frame: Frame) -> DetectFuture {
        let max_dim = self.max_dimension;

        async move {
            // CPU-bound; keep it off the async workers
            tokio::task::spawn_blocking(move || {
                let result = detect_frame_sync(&frame, max_dim);
                frame.release();
                result
            })
            .await
            .unwrap_or_else(|e| {
                warn!(error = %e, "QR detection task panicked");
                Err(DetectorError::TaskFailed(e.to_string()))
            })
        }
        .boxed()
    }

    fn detect_static(&self, image: &StillImage) -> DetectorResult<Option<String>> {
        let luma = image.to_luma();
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return Err(DetectorError::InvalidFrame("empty image".to_string()));
        }
        let pixels = luma.into_raw();

        // Gallery photos are often large; try a fast downscaled pass first
        if width > self.max_dimension || height > self.max_dimension {
            let (small, sw, sh) = downscale_luma(&pixels, width, height, self.max_dimension);
            if let Some(payload) = decode_luma(&small, sw, sh)? {
                return Ok(Some(payload));
            }
            debug!(width, height, "Downscaled pass found nothing, retrying full resolution");
        }
        decode_luma(&pixels, width, height)
    }
}

/// Synchronous detection on a live frame (runs in blocking task)
fn detect_frame_sync(frame: &Frame, max_dimension: u32) -> DetectorResult<Option<String>> {
    let start = Instant::now();

    let luma = extract_luma(frame)?;
    let (pixels, width, height) = downscale_luma(&luma, frame.width, frame.height, max_dimension);

    trace!(
        sequence = frame.sequence,
        width,
        height,
        conversion_ms = start.elapsed().as_millis(),
        "Prepared luma image"
    );

    let result = decode_luma(&pixels, width, height);

    trace!(
        sequence = frame.sequence,
        total_ms = start.elapsed().as_millis(),
        found = matches!(result, Ok(Some(_))),
        "QR detection complete"
    );
    result
}

/// Run `rqrr` over a tightly packed luma buffer and return the first payload
fn decode_luma(pixels: &[u8], width: u32, height: u32) -> DetectorResult<Option<String>> {
    let w = width as usize;
    let h = height as usize;
    if pixels.len() < w * h {
        return Err(DetectorError::InvalidFrame(format!(
            "luma buffer holds {} bytes, expected {}",
            pixels.len(),
            w * h
        )));
    }

    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w, h, |x, y| pixels[y * w + x]);
    let grids = prepared.detect_grids();
    if grids.is_empty() {
        return Ok(None);
    }

    for grid in grids {
        match grid.decode() {
            Ok((_meta, content)) => {
                debug!(content = %content, "Decoded QR code");
                return Ok(Some(content));
            }
            Err(e) => {
                // A partially visible code; another grid may still decode
                debug!(error = ?e, "Failed to decode QR grid");
            }
        }
    }
    Ok(None)
}

/// Copy the luma channel of a frame into a packed buffer (no stride padding)
fn extract_luma(frame: &Frame) -> DetectorResult<Vec<u8>> {
    if !frame.is_consistent() {
        return Err(DetectorError::InvalidFrame(format!(
            "{}x{} stride {} with {} bytes",
            frame.width,
            frame.height,
            frame.stride,
            frame.data.len()
        )));
    }

    let width = frame.width as usize;
    let height = frame.height as usize;
    let stride = frame.stride as usize;
    let bpp = frame.format.bytes_per_pixel();
    let data: &[u8] = &frame.data;

    let mut luma = Vec::with_capacity(width * height);
    for y in 0..height {
        let row = &data[y * stride..y * stride + width * bpp];
        match frame.format {
            // Luma plane comes first
            PixelFormat::Gray8 | PixelFormat::Nv12 => luma.extend_from_slice(row),
            // Y0 U Y1 V: luma on even bytes
            PixelFormat::Yuyv => luma.extend(row.chunks_exact(2).map(|px| px[0])),
            PixelFormat::Rgba | PixelFormat::Rgb24 => {
                luma.extend(row.chunks_exact(bpp).map(|px| rgb_to_luma(px[0], px[1], px[2])))
            }
            PixelFormat::Bgra => {
                luma.extend(row.chunks_exact(4).map(|px| rgb_to_luma(px[2], px[1], px[0])))
            }
        }
    }
    Ok(luma)
}

/// BT.601 integer approximation
fn rgb_to_luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}

/// Downscale a packed luma buffer with bilinear interpolation
///
/// Returns the input unchanged when it already fits `max_dimension`.
fn downscale_luma(pixels: &[u8], width: u32, height: u32, max_dimension: u32) -> (Vec<u8>, u32, u32) {
    if width <= max_dimension && height <= max_dimension {
        return (pixels.to_vec(), width, height);
    }

    let scale = (width as f32 / max_dimension as f32).max(height as f32 / max_dimension as f32);
    let dst_width = ((width as f32 / scale) as u32).max(1);
    let dst_height = ((height as f32 / scale) as u32).max(1);

    let src_width = width as usize;
    let src_height = height as usize;
    let x_ratio = width as f32 / dst_width as f32;
    let y_ratio = height as f32 / dst_height as f32;

    let sample = |x: usize, y: usize| -> f32 { pixels.get(y * src_width + x).copied().unwrap_or(0) as f32 };

    let mut result = Vec::with_capacity((dst_width * dst_height) as usize);
    for y in 0..dst_height {
        let src_y = y as f32 * y_ratio;
        let y0 = (src_y as usize).min(src_height - 1);
        let y1 = (y0 + 1).min(src_height - 1);
        let y_frac = src_y - y0 as f32;

        for x in 0..dst_width {
            let src_x = x as f32 * x_ratio;
            let x0 = (src_x as usize).min(src_width - 1);
            let x1 = (x0 + 1).min(src_width - 1);
            let x_frac = src_x - x0 as f32;

            let value = sample(x0, y0) * (1.0 - x_frac) * (1.0 - y_frac)
                + sample(x1, y0) * x_frac * (1.0 - y_frac)
                + sample(x0, y1) * (1.0 - x_frac) * y_frac
                + sample(x1, y1) * x_frac * y_frac;
            result.push(value as u8);
        }
    }

    (result, dst_width, dst_height)
}
