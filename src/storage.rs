// SPDX-License-Identifier: MPL-2.0

//! Storage utilities for generated QR images

use crate::constants::APP_DIR;
use crate::constants::generator::{CACHE_SUBDIR, SHARE_FILE_NAME};
use crate::errors::{AppError, AppResult};
use chrono::Local;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory holding images handed to other apps
pub fn share_cache_dir() -> AppResult<PathBuf> {
    dirs::cache_dir()
        .map(|dir| dir.join(APP_DIR).join(CACHE_SUBDIR))
        .ok_or_else(|| AppError::Storage("No cache directory on this platform".to_string()))
}

/// Write PNG bytes to the share cache, replacing the previous share
pub async fn save_to_cache(png: &[u8]) -> AppResult<PathBuf> {
    let dir = share_cache_dir()?;
    save_png(&dir.join(SHARE_FILE_NAME), png).await
}

/// Write PNG bytes to `path`, creating parent directories
pub async fn save_png(path: &Path, png: &[u8]) -> AppResult<PathBuf> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, png).await?;
    debug!(path = %path.display(), bytes = png.len(), "Saved QR image");
    Ok(path.to_path_buf())
}

/// `qr_YYYYMMDD_HHMMSS.png` inside `dir`
pub fn timestamped_path(dir: &Path) -> PathBuf {
    let stamp = Local::now().format("%Y%m%d_%H%M%S");
    dir.join(format!("qr_{}.png", stamp))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamped_path_shape() {
        let path = timestamped_path(Path::new("/tmp/out"));
        let name = path.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("qr_"));
        assert!(name.ends_with(".png"));
        // qr_ + 8 digits + _ + 6 digits + .png
        assert_eq!(name.len(), 3 + 8 + 1 + 6 + 4);
        assert_eq!(path.parent(), Some(Path::new("/tmp/out")));
    }

    #[tokio::test]
    async fn test_save_png_overwrites() {
        let dir = std::env::temp_dir().join(format!("qrscan-storage-{}", uuid::Uuid::new_v4()));
        let path = dir.join("nested").join(SHARE_FILE_NAME);

        save_png(&path, b"first").await.unwrap();
        let saved = save_png(&path, b"second").await.unwrap();

        assert_eq!(saved, path);
        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        std::fs::remove_dir_all(&dir).ok();
    }
}
