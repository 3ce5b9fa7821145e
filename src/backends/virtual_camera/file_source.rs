// SPDX-License-Identifier: GPL-3.0-only

//! Image loading for the file-backed camera

use crate::backends::camera::types::{Frame, PixelFormat};
use crate::constants::file_formats;
use crate::errors::{BindingError, BindingResult};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Decoded RGBA pixels shared by every frame of a binding
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl LoadedImage {
    /// Build a frame header over the shared pixels (no copy)
    pub fn frame(&self) -> Frame {
        Frame::new(
            self.width,
            self.height,
            self.width * 4, // RGBA = 4 bytes per pixel
            PixelFormat::Rgba,
            Arc::clone(&self.data),
        )
    }
}

/// Load an image file as RGBA frame data
pub fn load_image(path: &Path) -> BindingResult<LoadedImage> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default();

    if !file_formats::is_image_extension(&extension) {
        return Err(BindingError::InitializationFailed(format!(
            "Unsupported file format: {}",
            extension
        )));
    }

    info!(path = %path.display(), "Loading image file");

    let img = image::open(path).map_err(|e| {
        BindingError::InitializationFailed(format!(
            "Failed to load image '{}': {}",
            path.display(),
            e
        ))
    })?;

    let rgba = img.to_rgba8();
    let width = rgba.width();
    let height = rgba.height();
    let data: Vec<u8> = rgba.into_raw();

    info!(width, height, "Image loaded successfully");

    Ok(LoadedImage {
        width,
        height,
        data: Arc::from(data.into_boxed_slice()),
    })
}
