// SPDX-License-Identifier: MPL-2.0

//! Frame source abstraction
//!
//! A scan session never talks to camera hardware directly. It binds a
//! [`FrameSource`] for a facing and consumes the frame stream that the
//! binding returns.
//!
//! ```text
//! ┌─────────────────────┐
//! │    ScanSession      │  ← state machine, one detection at a time
//! └──────────┬──────────┘
//!            │ bind / set_torch / unbind
//!            ▼
//! ┌─────────────────────┐
//! │  FrameSource trait  │  ← common interface
//! └──────────┬──────────┘
//!            │
//!            ▼
//!   ┌─────────────────┐
//!   │ FileFrameSource │  ← file-backed virtual camera
//!   └─────────────────┘
//! ```

pub mod frame_loop;
pub mod types;

pub use frame_loop::{CaptureLoopController, LoopAction};
pub use types::*;

use crate::errors::{BindingResult, TorchError};

/// Producer of camera frames for a selectable facing
///
/// Implementations deliver frames through the returned receiver and may
/// drop frames when the consumer falls behind. Every frame must carry
/// whatever release hook its buffer needs; consumers release frames by
/// dropping them.
pub trait FrameSource: Send {
    /// Start producing frames from the camera with the given facing
    ///
    /// # Returns
    /// * `Ok(FrameReceiver)` - Stream of frames for this binding
    /// * `Err(BindingError)` - Permission missing or hardware unavailable
    fn bind(&mut self, facing: CameraFacing) -> BindingResult<FrameReceiver>;

    /// Turn the torch on or off for the active binding
    fn set_torch(&mut self, on: bool) -> Result<(), TorchError>;

    /// Stop producing frames and release the camera
    ///
    /// Dropping the sender side ends the stream returned by `bind`.
    fn unbind(&mut self);
}
