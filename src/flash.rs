// SPDX-License-Identifier: GPL-3.0-only

//! Torch control via Linux sysfs flash LEDs
//!
//! Discovers LEDs exposed at `/sys/class/leds/*:flash` and drives them in
//! torch mode through the `brightness` file, which is group-writable on
//! most phone distributions.

use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const LEDS_DIR: &str = "/sys/class/leds";

/// A flash LED usable as a continuous torch
#[derive(Debug, Clone)]
pub struct FlashDevice {
    /// Sysfs path, e.g. `/sys/class/leds/white:flash`
    path: PathBuf,
    /// Maximum brightness value (from `max_brightness` file)
    max_brightness: u32,
    /// Directory basename
    name: String,
}

impl FlashDevice {
    /// Scan `/sys/class/leds/` for writable `*:flash` entries
    pub fn discover() -> Vec<FlashDevice> {
        Self::discover_in(Path::new(LEDS_DIR))
    }

    /// Scan an arbitrary LED class directory
    pub fn discover_in(leds_dir: &Path) -> Vec<FlashDevice> {
        let Ok(entries) = std::fs::read_dir(leds_dir) else {
            debug!(dir = %leds_dir.display(), "No LED class directory; torch unavailable");
            return Vec::new();
        };

        let mut devices: Vec<FlashDevice> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                if !name.ends_with(":flash") {
                    return None;
                }
                Self::probe(entry.path(), name)
            })
            .collect();

        // White before yellow on dual-tone modules
        devices.sort_by(|a, b| a.name.cmp(&b.name));
        devices
    }

    /// Accept an LED only if it has a usable range and we may drive it
    fn probe(path: PathBuf, name: String) -> Option<FlashDevice> {
        let max_path = path.join("max_brightness");
        let max_brightness = match std::fs::read_to_string(&max_path) {
            Ok(text) => text.trim().parse::<u32>().ok().filter(|&v| v > 0),
            Err(e) => {
                warn!(path = %max_path.display(), error = %e, "Cannot read max_brightness");
                return None;
            }
        };
        let Some(max_brightness) = max_brightness else {
            warn!(path = %max_path.display(), "Invalid max_brightness value");
            return None;
        };

        let brightness = path.join("brightness");
        if let Err(e) = std::fs::OpenOptions::new().write(true).open(&brightness) {
            warn!(
                path = %brightness.display(),
                error = %e,
                "Cannot write brightness; user may need to be in the 'feedbackd' group"
            );
            return None;
        }

        info!(name = %name, max_brightness, "Discovered flash LED");
        Some(FlashDevice {
            path,
            max_brightness,
            name,
        })
    }

    /// Get the device name (e.g. "white:flash")
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Switch the torch fully on or off
    pub fn torch(&self, on: bool) -> io::Result<()> {
        let value = if on { self.max_brightness } else { 0 };
        std::fs::write(self.path.join("brightness"), value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_led(root: &Path, name: &str, max: &str) -> PathBuf {
        let dir = root.join(name);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("max_brightness"), max).unwrap();
        std::fs::write(dir.join("brightness"), "0").unwrap();
        dir
    }

    fn scratch_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("qrscan-flash-{}-{}", tag, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_discover_missing_directory() {
        assert!(FlashDevice::discover_in(Path::new("/nonexistent/leds")).is_empty());
    }

    #[test]
    fn test_discover_and_toggle_torch() {
        let root = scratch_dir("toggle");
        let led = fake_led(&root, "white:flash", "255\n");
        fake_led(&root, "red:status", "1");
        fake_led(&root, "yellow:flash", "0");

        let devices = FlashDevice::discover_in(&root);
        assert_eq!(devices.len(), 1);
        assert_eq!(devices[0].name(), "white:flash");

        devices[0].torch(true).unwrap();
        assert_eq!(std::fs::read_to_string(led.join("brightness")).unwrap(), "255");
        devices[0].torch(false).unwrap();
        assert_eq!(std::fs::read_to_string(led.join("brightness")).unwrap(), "0");

        std::fs::remove_dir_all(&root).ok();
    }
}
