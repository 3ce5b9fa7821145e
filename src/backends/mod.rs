// SPDX-License-Identifier: MPL-2.0

//! Backend abstraction layer for frame capture
//!
//! - [`camera`]: The `FrameSource` trait, frame types and the capture loop
//! - [`virtual_camera`]: File-backed camera that replays images as frames

pub mod camera;
pub mod virtual_camera;
