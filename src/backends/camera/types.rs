// SPDX-License-Identifier: GPL-3.0-only
// Shared types for frame sources and detectors

//! Frames, still images and camera configuration types

use crate::errors::{AppError, AppResult};
use image::{DynamicImage, GrayImage};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

/// Which physical camera supplies frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    /// User-facing (selfie) camera
    Front,
    /// World-facing camera
    #[default]
    Back,
}

impl CameraFacing {
    /// The other lens (the "flip camera" button)
    pub fn flipped(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

impl std::fmt::Display for CameraFacing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CameraFacing::Front => write!(f, "front"),
            CameraFacing::Back => write!(f, "back"),
        }
    }
}

/// Rotation hint attached to each frame (degrees clockwise)
///
/// Sensors are often mounted at 90° or 270° relative to the display.
/// The decoder is orientation independent, so the hint is informational
/// for consumers that render the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    /// Create rotation from an integer degree value (normalised to 0-360).
    /// Values that are not a multiple of 90 map to `None`.
    pub fn from_degrees(degrees: i32) -> Self {
        match degrees.rem_euclid(360) {
            90 => Rotation::Rotate90,
            180 => Rotation::Rotate180,
            270 => Rotation::Rotate270,
            _ => Rotation::None,
        }
    }

    /// Get the rotation in degrees
    pub fn degrees(&self) -> u32 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }

    /// Check if rotation swaps width and height
    pub fn swaps_dimensions(&self) -> bool {
        matches!(self, Rotation::Rotate90 | Rotation::Rotate270)
    }
}

impl std::fmt::Display for Rotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Pixel layout of a frame's main plane
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PixelFormat {
    /// 8-bit luma only
    Gray8,
    /// 32-bit R G B A
    Rgba,
    /// 32-bit B G R A
    Bgra,
    /// 24-bit R G B
    Rgb24,
    /// Semi-planar 4:2:0; the Y plane comes first
    Nv12,
    /// Packed 4:2:2 (Y0 U Y1 V)
    Yuyv,
}

impl PixelFormat {
    /// Bytes per pixel in the first plane
    pub fn bytes_per_pixel(&self) -> usize {
        match self {
            Self::Gray8 | Self::Nv12 => 1,
            Self::Yuyv => 2,
            Self::Rgb24 => 3,
            Self::Rgba | Self::Bgra => 4,
        }
    }

    /// Parse a FourCC / GStreamer style format name
    pub fn from_fourcc(name: &str) -> Option<Self> {
        match name {
            "GRAY8" | "GREY" | "Y8" => Some(Self::Gray8),
            "RGBA" | "RGBx" => Some(Self::Rgba),
            "BGRA" | "BGRx" => Some(Self::Bgra),
            "RGB" | "RGB3" => Some(Self::Rgb24),
            "NV12" => Some(Self::Nv12),
            "YUYV" | "YUY2" => Some(Self::Yuyv),
            _ => None,
        }
    }
}

type ReleaseHook = Box<dyn FnOnce() + Send>;

/// A single frame owned by the frame pipeline
///
/// The producer may attach a release hook that returns the underlying
/// buffer to its pool. The hook runs exactly once, when the frame is
/// dropped, so every path that discards a frame also releases it.
pub struct Frame {
    pub width: u32,
    pub height: u32,
    /// Row stride of the first plane in bytes (may include padding)
    pub stride: u32,
    pub format: PixelFormat,
    pub rotation: Rotation,
    /// Monotonic counter assigned by the producer
    pub sequence: u64,
    pub captured_at: Instant,
    pub data: Arc<[u8]>,
    release: Option<ReleaseHook>,
}

impl Frame {
    /// Create a frame over shared pixel data
    pub fn new(
        width: u32,
        height: u32,
        stride: u32,
        format: PixelFormat,
        data: impl Into<Arc<[u8]>>,
    ) -> Self {
        Self {
            width,
            height,
            stride,
            format,
            rotation: Rotation::None,
            sequence: 0,
            captured_at: Instant::now(),
            data: data.into(),
            release: None,
        }
    }

    /// Create a tightly packed 8-bit greyscale frame
    pub fn gray(width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self::new(width, height, width, PixelFormat::Gray8, data)
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    /// Attach a hook that runs when the frame is released.
    ///
    /// Replaces (and immediately runs) any hook set earlier.
    pub fn on_release(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        if let Some(previous) = self.release.replace(Box::new(hook)) {
            previous();
        }
        self
    }

    /// Release the frame back to its producer
    pub fn release(self) {
        drop(self);
    }

    /// Validate that the buffer covers every row the header describes
    pub fn is_consistent(&self) -> bool {
        if self.width == 0 || self.height == 0 {
            return false;
        }
        let row_bytes = self.width as usize * self.format.bytes_per_pixel();
        if (self.stride as usize) < row_bytes {
            return false;
        }
        let needed = self.stride as usize * (self.height as usize - 1) + row_bytes;
        self.data.len() >= needed
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        if let Some(hook) = self.release.take() {
            hook();
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .field("format", &self.format)
            .field("rotation", &self.rotation)
            .field("sequence", &self.sequence)
            .field("bytes", &self.data.len())
            .field("has_release_hook", &self.release.is_some())
            .finish()
    }
}

/// An already captured image (gallery pick) for one-shot scanning
#[derive(Debug, Clone)]
pub struct StillImage {
    image: DynamicImage,
}

impl StillImage {
    /// Load and decode an image file
    pub fn open(path: &Path) -> AppResult<Self> {
        let image = image::open(path).map_err(|e| {
            AppError::Storage(format!("Failed to load image '{}': {}", path.display(), e))
        })?;
        Ok(Self { image })
    }

    /// Decode an in-memory encoded image (PNG, JPEG, ...)
    pub fn from_bytes(bytes: &[u8]) -> AppResult<Self> {
        let image = image::load_from_memory(bytes)?;
        Ok(Self { image })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Greyscale copy used by decoders
    pub fn to_luma(&self) -> GrayImage {
        self.image.to_luma8()
    }
}

impl From<DynamicImage> for StillImage {
    fn from(image: DynamicImage) -> Self {
        Self { image }
    }
}

impl From<GrayImage> for StillImage {
    fn from(image: GrayImage) -> Self {
        Self {
            image: DynamicImage::ImageLuma8(image),
        }
    }
}

/// Frame receiver type returned by a binding
pub type FrameReceiver = futures::channel::mpsc::Receiver<Frame>;

/// Frame sender type held by a producer
pub type FrameSender = futures::channel::mpsc::Sender<Frame>;
