// SPDX-License-Identifier: MPL-2.0

//! Frame analysis
//!
//! The [`Detector`] trait is the seam between a scan session and the
//! decoding backend. [`tasks::QrDetector`] implements it with `rqrr`.

pub mod tasks;
pub mod types;

pub use tasks::QrDetector;
pub use types::{DetectionResult, Provenance, QrAction, WifiSecurity};

use crate::backends::camera::types::{Frame, StillImage};
use crate::errors::DetectorResult;
use futures::future::BoxFuture;

/// Future returned by [`Detector::detect`]
pub type DetectFuture = BoxFuture<'static, DetectorResult<Option<String>>>;

/// Barcode decoding backend
///
/// Both methods follow a "take the first" contract: the payload of the
/// first code found, or `None`. A session never has more than one `detect`
/// call in flight, so implementations need no internal serialization.
pub trait Detector: Send + Sync {
    /// Decode one live frame
    ///
    /// The returned future owns the frame and releases it when it
    /// completes. It must not do work until polled.
    fn detect(&self, frame: Frame) -> DetectFuture;

    /// Decode one still image synchronously
    fn detect_static(&self, image: &StillImage) -> DetectorResult<Option<String>>;
}
