// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! This module provides command-line functionality for:
//! - Scanning a still image
//! - Running a live scan session against file-backed cameras
//! - Generating QR code images
//! - Showing the effective configuration

use qrscan::backends::camera::{CameraFacing, StillImage};
use qrscan::backends::virtual_camera::FileFrameSource;
use qrscan::config::Config;
use qrscan::flash::FlashDevice;
use qrscan::frame_processor::{DetectionResult, Detector, QrDetector};
use qrscan::generator::generate_qr_png;
use qrscan::session::ScanSession;
use qrscan::storage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Options for `qrscan live`
pub struct LiveOptions {
    pub back: PathBuf,
    pub front: Option<PathBuf>,
    pub facing: Option<CameraFacing>,
    pub torch: bool,
    pub switch_after: Option<Duration>,
    pub timeout: Duration,
}

/// Decode a QR code from an image file
pub fn scan_image(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let image = StillImage::open(path)?;
    println!("Image: {} ({}x{})", path.display(), image.width(), image.height());

    let rt = tokio::runtime::Runtime::new()?;
    let result = rt.block_on(async {
        // Gallery picks go through an unstarted session, as on the scan screen
        let (session, _) = ScanSession::with_channel(
            Box::new(FileFrameSource::from_config(&config)),
            detector_for(&config),
        );
        session.scan_static(image).await
    });

    match result {
        Some(result) => {
            print_result(&result);
            Ok(())
        }
        None => Err("No QR found".into()),
    }
}

/// Run a live scan session until a code is latched
pub fn live_scan(options: LiveOptions) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let facing = options.facing.unwrap_or(config.default_facing);

    let mut source = FileFrameSource::from_config(&config).with_image(CameraFacing::Back, &options.back);
    if let Some(front) = &options.front {
        source = source.with_image(CameraFacing::Front, front);
    }
    if let Some(flash) = FlashDevice::discover().into_iter().next() {
        println!("Torch: {}", flash.name());
        source = source.with_flash(flash);
    }

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run_session(
        source,
        detector_for(&config),
        facing,
        options.torch || config.torch_on_start,
        options.switch_after,
        options.timeout,
    ))
}

async fn run_session(
    source: FileFrameSource,
    detector: Arc<dyn Detector>,
    facing: CameraFacing,
    torch: bool,
    switch_after: Option<Duration>,
    timeout: Duration,
) -> Result<(), Box<dyn std::error::Error>> {
    let (session, result) = ScanSession::with_channel(Box::new(source), detector);
    let session = Arc::new(session);

    // Set up Ctrl+C handler
    let handler_session = Arc::clone(&session);
    ctrlc::set_handler(move || handler_session.terminate())?;

    session.set_torch(torch);
    session.start(facing)?;
    println!("Scanning with {} camera... (press Ctrl+C to stop)", facing);

    if let Some(delay) = switch_after {
        let switcher = Arc::clone(&session);
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let next = switcher.facing().flipped();
            match switcher.set_facing(next) {
                Ok(()) => println!("Switched to {} camera", switcher.facing()),
                Err(e) => eprintln!("Camera switch failed: {}", e),
            }
        });
    }

    let outcome = tokio::time::timeout(timeout, result).await;
    session.terminate();
    debug!(session = %session.id(), "Live scan finished");

    match outcome {
        Ok(Ok(result)) => {
            print_result(&result);
            Ok(())
        }
        Ok(Err(_)) => Err("Scan cancelled".into()),
        Err(_) => Err(format!("No QR found within {} seconds", timeout.as_secs()).into()),
    }
}

/// Encode text as a QR code PNG
pub fn generate(
    text: &str,
    output: Option<PathBuf>,
    size: Option<u32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let png = generate_qr_png(text, size.unwrap_or(config.generator_size))?;

    let rt = tokio::runtime::Runtime::new()?;
    let path = rt.block_on(async {
        match output {
            Some(path) if path.is_dir() => storage::save_png(&storage::timestamped_path(&path), &png).await,
            Some(path) => storage::save_png(&path, &png).await,
            None => storage::save_to_cache(&png).await,
        }
    })?;

    println!("QR code saved: {}", path.display());
    Ok(())
}

/// Print the effective configuration, optionally writing it out
pub fn show_config(save: bool) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load();
    let path = Config::default_path();

    match &path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# no config directory"),
    }
    println!("{}", serde_json::to_string_pretty(&config)?);

    if save {
        let path = path.ok_or("No config directory on this platform")?;
        config.save_to(&path)?;
        println!("Config saved: {}", path.display());
    }
    Ok(())
}

fn detector_for(config: &Config) -> Arc<dyn Detector> {
    Arc::new(QrDetector::with_max_dimension(config.detector_max_dimension))
}

fn print_result(result: &DetectionResult) {
    let action = result.action();
    println!("{}", result.payload);
    println!("Action: {}", action.action_label());
}
