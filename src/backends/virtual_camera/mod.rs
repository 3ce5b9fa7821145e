// SPDX-License-Identifier: GPL-3.0-only

//! File-backed virtual camera
//!
//! Replays a still image per facing as a continuous frame stream, the way
//! a phone camera would deliver preview frames:
//!
//! ```text
//!  image file (per facing)
//!        │ decoded once per bind
//!        ▼
//! ┌──────────────────┐
//! │ capture loop     │  ← paced at the configured fps
//! │ + buffer pool    │    frames dropped while all buffers are held
//! └──────────────────┘
//!        │ try_send (lossy)
//!        ▼
//!   FrameReceiver → ScanSession
//! ```

mod file_source;
mod frame_pool;

pub use file_source::{LoadedImage, load_image};
pub use frame_pool::{FramePool, PoolLease};

use crate::backends::camera::{
    CameraFacing, CaptureLoopController, FrameReceiver, FrameSource, LoopAction,
};
use crate::config::Config;
use crate::errors::{BindingError, BindingResult, TorchError};
use crate::flash::FlashDevice;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, trace, warn};

/// Frame source that streams image files as camera frames
pub struct FileFrameSource {
    images: HashMap<CameraFacing, PathBuf>,
    fps: u32,
    queue_depth: usize,
    pool: FramePool,
    flash: Option<FlashDevice>,
    torch_on: bool,
    capture: Option<CaptureLoopController>,
    bound_facing: Option<CameraFacing>,
}

impl FileFrameSource {
    /// Create a source with no cameras attached
    pub fn new(fps: u32, queue_depth: usize, pool_size: usize) -> Self {
        Self {
            images: HashMap::new(),
            fps: fps.max(1),
            queue_depth: queue_depth.max(1),
            pool: FramePool::new(pool_size),
            flash: None,
            torch_on: false,
            capture: None,
            bound_facing: None,
        }
    }

    /// Create a source using the frame pacing settings from `config`
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.virtual_camera_fps,
            config.frame_queue_depth,
            config.frame_pool_size,
        )
    }

    /// Attach an image as the camera for `facing`
    pub fn with_image(mut self, facing: CameraFacing, path: impl Into<PathBuf>) -> Self {
        self.images.insert(facing, path.into());
        self
    }

    /// Use a flash LED as the torch
    pub fn with_flash(mut self, flash: FlashDevice) -> Self {
        self.flash = Some(flash);
        self
    }

    /// Buffer accounting shared with produced frames
    pub fn pool(&self) -> &FramePool {
        &self.pool
    }

    /// Facing of the active binding
    pub fn bound_facing(&self) -> Option<CameraFacing> {
        self.bound_facing
    }

    fn stop_capture(&mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
    }
}

impl FrameSource for FileFrameSource {
    fn bind(&mut self, facing: CameraFacing) -> BindingResult<FrameReceiver> {
        // One binding at a time, like a single camera device
        self.unbind();

        let path = self
            .images
            .get(&facing)
            .ok_or(BindingError::NoCameraFound(facing))?;
        let image = load_image(path)?;

        let (mut sender, receiver) = futures::channel::mpsc::channel(self.queue_depth);
        let pool = self.pool.clone();
        let interval = Duration::from_secs_f64(1.0 / self.fps as f64);
        let mut sequence = 0u64;

        let name = format!("file-camera-{}", facing);
        let capture = CaptureLoopController::start(&name, Some(interval), move || {
            let Some(lease) = pool.try_acquire() else {
                trace!(sequence, "All frame buffers held downstream, skipping frame");
                return LoopAction::Continue;
            };
            sequence += 1;
            let frame = image
                .frame()
                .with_sequence(sequence)
                .on_release(move || drop(lease));

            match sender.try_send(frame) {
                Ok(()) => LoopAction::Continue,
                Err(e) if e.is_disconnected() => {
                    debug!("Frame receiver dropped, stopping capture loop");
                    LoopAction::Stop
                }
                // Queue full: the rejected frame is dropped here and its lease returned
                Err(_) => LoopAction::Continue,
            }
        });

        info!(%facing, fps = self.fps, "File camera bound");
        self.capture = Some(capture);
        self.bound_facing = Some(facing);

        if self.torch_on {
            if let Err(e) = self.set_torch(true) {
                debug!(error = %e, "Torch not restored after bind");
            }
        }

        Ok(receiver)
    }

    fn set_torch(&mut self, on: bool) -> Result<(), TorchError> {
        let flash = self.flash.as_ref().ok_or(TorchError::Unavailable)?;
        flash
            .torch(on)
            .map_err(|e| TorchError::Io(e.to_string()))?;
        self.torch_on = on;
        debug!(led = flash.name(), on, "Torch updated");
        Ok(())
    }

    fn unbind(&mut self) {
        if self.capture.is_none() {
            return;
        }
        self.stop_capture();
        if self.torch_on {
            if let Some(flash) = &self.flash {
                if let Err(e) = flash.torch(false) {
                    warn!(error = %e, "Failed to switch torch off on unbind");
                }
            }
        }
        if let Some(facing) = self.bound_facing.take() {
            info!(%facing, "File camera unbound");
        }
    }
}

impl Drop for FileFrameSource {
    fn drop(&mut self) {
        self.unbind();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;
    use image::{GrayImage, Luma};
    use std::path::Path;

    fn write_test_image(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("qrscan-vcam-{}-{}", tag, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("frame.png");
        GrayImage::from_pixel(8, 6, Luma([200u8])).save(&path).unwrap();
        path
    }

    #[test]
    fn test_bind_without_image_reports_missing_camera() {
        let mut source = FileFrameSource::new(30, 2, 2).with_image(CameraFacing::Back, "/x.png");
        let err = source.bind(CameraFacing::Front).unwrap_err();
        assert_eq!(err, BindingError::NoCameraFound(CameraFacing::Front));
        assert_eq!(source.bound_facing(), None);
    }

    #[test]
    fn test_torch_without_flash_is_unavailable() {
        let mut source = FileFrameSource::new(30, 2, 2);
        assert_eq!(source.set_torch(true), Err(TorchError::Unavailable));
    }

    #[tokio::test]
    async fn test_streams_frames_and_returns_buffers() {
        let path = write_test_image("stream");
        let mut source = FileFrameSource::new(200, 4, 2).with_image(CameraFacing::Back, &path);
        let mut receiver = source.bind(CameraFacing::Back).unwrap();

        let first = receiver.next().await.unwrap();
        assert_eq!((first.width, first.height), (8, 6));
        assert!(first.is_consistent());
        let second = receiver.next().await.unwrap();
        assert!(second.sequence > first.sequence);

        // Both buffers are held here, so the pool is exhausted
        assert_eq!(source.pool().outstanding(), 2);
        drop(first);
        drop(second);

        source.unbind();
        drop(receiver);
        assert_eq!(source.pool().outstanding(), 0);
        assert_eq!(source.bound_facing(), None);
        std::fs::remove_dir_all(path.parent().unwrap_or(Path::new("/tmp"))).ok();
    }

    #[tokio::test]
    async fn test_rebind_ends_previous_stream() {
        let path = write_test_image("rebind");
        let mut source = FileFrameSource::new(100, 2, 4)
            .with_image(CameraFacing::Back, &path)
            .with_image(CameraFacing::Front, &path);

        let mut back = source.bind(CameraFacing::Back).unwrap();
        let _front = source.bind(CameraFacing::Front).unwrap();
        assert_eq!(source.bound_facing(), Some(CameraFacing::Front));

        // Old sender is gone; drain whatever was queued then observe the end
        while back.next().await.is_some() {}
    }
}
