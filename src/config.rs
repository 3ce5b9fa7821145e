// SPDX-License-Identifier: GPL-3.0-only

use crate::backends::camera::CameraFacing;
use crate::constants::{APP_DIR, generator, scanner, virtual_camera};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

const CONFIG_FILE_NAME: &str = "config.json";

/// User configuration, persisted as JSON
///
/// Missing fields take their default, unknown fields are ignored, so older
/// and newer config files both load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Lens used when a scan starts
    pub default_facing: CameraFacing,
    /// Turn the torch on as soon as scanning starts
    pub torch_on_start: bool,
    /// Frames are downscaled to this edge length before decoding
    pub detector_max_dimension: u32,
    /// Frames buffered between the camera and the session
    pub frame_queue_depth: usize,
    /// Frame rate of the file-backed camera
    pub virtual_camera_fps: u32,
    /// Frame buffers the file-backed camera may have outstanding
    pub frame_pool_size: usize,
    /// Edge length of generated QR images
    pub generator_size: u32,
    /// Haptic feedback duration on success (consumed by the UI layer)
    pub vibrate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_facing: CameraFacing::Back,
            torch_on_start: false,
            detector_max_dimension: scanner::DEFAULT_MAX_DIMENSION,
            frame_queue_depth: virtual_camera::DEFAULT_QUEUE_DEPTH,
            virtual_camera_fps: virtual_camera::DEFAULT_FPS,
            frame_pool_size: virtual_camera::DEFAULT_POOL_SIZE,
            generator_size: generator::DEFAULT_SIZE,
            vibrate_ms: scanner::DEFAULT_VIBRATE_MS,
        }
    }
}

impl Config {
    /// Location of the config file in the platform config directory
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE_NAME))
    }

    /// Load the user's config, falling back to defaults
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_or_default(&path),
            None => {
                debug!("No config directory on this platform, using defaults");
                Self::default()
            }
        }
    }

    /// Load from `path`; a missing or malformed file yields defaults
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            debug!(path = %path.display(), "Config file not found, using defaults");
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable config");
                Self::default()
            }
        }
    }

    /// Load from `path`, reporting every failure
    pub fn load_from(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&text)
            .map_err(|e| AppError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config.sanitized())
    }

    /// Write to `path`, creating parent directories
    pub fn save_to(&self, path: &Path) -> AppResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| AppError::Config(e.to_string()))?;
        std::fs::write(path, text)?;
        debug!(path = %path.display(), "Config saved");
        Ok(())
    }

    /// Clamp values that would stall or break the pipeline
    fn sanitized(mut self) -> Self {
        self.detector_max_dimension = self
            .detector_max_dimension
            .max(scanner::MIN_MAX_DIMENSION);
        self.frame_queue_depth = self.frame_queue_depth.max(1);
        self.frame_pool_size = self.frame_pool_size.max(1);
        self.virtual_camera_fps = self.virtual_camera_fps.clamp(1, 240);
        self.generator_size = self.generator_size.max(1);
        self
    }
}
