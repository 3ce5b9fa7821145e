// SPDX-License-Identifier: GPL-3.0-only

//! Application-wide constants

/// Directory name used under the platform config and cache directories
pub const APP_DIR: &str = "qrscan";

/// Scanner defaults
pub mod scanner {
    /// Frames are downscaled to this size before decoding
    ///
    /// QR codes held in front of a phone camera are large enough to decode
    /// at this resolution, and it keeps per-frame latency low.
    pub const DEFAULT_MAX_DIMENSION: u32 = 640;

    /// Smallest accepted downscale target
    pub const MIN_MAX_DIMENSION: u32 = 64;

    /// Haptic feedback length on a successful scan (ms), for the UI layer
    pub const DEFAULT_VIBRATE_MS: u64 = 100;
}

/// File-backed camera timing
pub mod virtual_camera {
    /// Frame rate for image streaming
    pub const DEFAULT_FPS: u32 = 30;

    /// Frames buffered between producer and session
    pub const DEFAULT_QUEUE_DEPTH: usize = 4;

    /// Frame buffers that may be held downstream at once
    pub const DEFAULT_POOL_SIZE: usize = 3;
}

/// QR generator output
pub mod generator {
    /// Target edge length of generated images in pixels
    pub const DEFAULT_SIZE: u32 = 512;

    /// Light border around the symbol, in modules
    pub const QUIET_ZONE_MODULES: u32 = 4;

    /// Cache subdirectory for shared images
    pub const CACHE_SUBDIR: &str = "images";

    /// File name overwritten on every share
    pub const SHARE_FILE_NAME: &str = "shared_qr.png";
}

/// Supported still image formats
pub mod file_formats {
    /// Supported image file extensions
    pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp"];

    /// Check if a file extension is a supported image format
    pub fn is_image_extension(ext: &str) -> bool {
        IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str())
    }
}
