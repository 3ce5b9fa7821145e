// SPDX-License-Identifier: MPL-2.0

//! qrscan - QR code scanning sessions and QR generation
//!
//! The heart of the crate is [`session::ScanSession`], a small state machine
//! that turns a lossy stream of camera frames into at most one decoded
//! payload, surviving camera switches and torch changes along the way.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`session`]: Scan session state machine
//! - [`backends`]: Frame sources (the `FrameSource` trait and a file-backed camera)
//! - [`frame_processor`]: Detector trait, rqrr detector and payload classification
//! - [`generator`]: Text to QR image
//! - [`flash`]: Flash LED used as a torch
//! - [`config`]: User configuration handling
//! - [`storage`]: Saving generated images
//!
//! # Example
//!
//! ```no_run
//! use qrscan::backends::camera::CameraFacing;
//! use qrscan::backends::virtual_camera::FileFrameSource;
//! use qrscan::frame_processor::QrDetector;
//! use qrscan::session::ScanSession;
//! use std::sync::Arc;
//!
//! # async fn scan() -> Result<(), Box<dyn std::error::Error>> {
//! let source = FileFrameSource::new(30, 4, 3).with_image(CameraFacing::Back, "code.png");
//! let (session, result) = ScanSession::with_channel(Box::new(source), Arc::new(QrDetector::new()));
//! session.start(CameraFacing::Back)?;
//! println!("{}", result.await?.payload);
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod constants;
pub mod errors;
pub mod flash;
pub mod frame_processor;
pub mod generator;
pub mod session;
pub mod storage;

// Re-export commonly used types
pub use backends::camera::{CameraFacing, Frame, FrameSource, StillImage};
pub use config::Config;
pub use errors::{AppError, AppResult, BindingError, DetectorError, SessionError};
pub use frame_processor::{DetectionResult, Detector, QrAction, QrDetector};
pub use session::{ScanSession, SessionState};
