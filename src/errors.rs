// SPDX-License-Identifier: GPL-3.0-only

//! Error types for the scanner

use crate::backends::camera::types::{CameraFacing, PixelFormat};
use crate::session::SessionState;
use std::fmt;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Result of binding a frame source
pub type BindingResult<T> = Result<T, BindingError>;

/// Result of a detector invocation
pub type DetectorResult<T> = Result<T, DetectorError>;

/// Top-level error type used by the binary and the file helpers
#[derive(Debug, Clone)]
pub enum AppError {
    /// Scan session errors
    Session(SessionError),
    /// Frame source binding errors
    Binding(BindingError),
    /// Decoding backend errors
    Detector(DetectorError),
    /// QR generation errors
    Generate(GenerateError),
    /// Configuration errors
    Config(String),
    /// Storage/filesystem errors
    Storage(String),
    /// Generic error with message
    Other(String),
}

/// A frame source could not be acquired or bound.
///
/// Fatal to the `start` call that produced it; the caller may retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// Camera permission was not granted
    PermissionDenied,
    /// No camera with the requested facing exists
    NoCameraFound(CameraFacing),
    /// The camera exists but could not be opened
    InitializationFailed(String),
    /// Another client holds the camera
    Busy,
}

/// Torch control failures. Never surfaced by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TorchError {
    /// The active camera has no controllable torch
    Unavailable,
    /// Writing the LED state failed
    Io(String),
}

/// Decoding backend failures.
///
/// A session treats every variant as "no payload in this frame".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectorError {
    /// The frame's pixel layout cannot be converted to luma
    UnsupportedFormat(PixelFormat),
    /// Frame dimensions or buffer size are inconsistent
    InvalidFrame(String),
    /// The backend failed while decoding
    Decode(String),
    /// The blocking detection task panicked or was cancelled
    TaskFailed(String),
}

/// Errors returned by session operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Frame source binding failed
    Binding(BindingError),
    /// The operation is not allowed in the current state
    InvalidState(SessionState),
}

/// QR generation errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// Nothing to encode
    EmptyInput,
    /// The text exceeds QR capacity
    DataTooLong,
    /// Encoder rejected the input
    Encode(String),
    /// Rendering or PNG encoding failed
    Image(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Session(e) => write!(f, "Session error: {}", e),
            AppError::Binding(e) => write!(f, "Camera error: {}", e),
            AppError::Detector(e) => write!(f, "Detector error: {}", e),
            AppError::Generate(e) => write!(f, "Generate error: {}", e),
            AppError::Config(msg) => write!(f, "Configuration error: {}", msg),
            AppError::Storage(msg) => write!(f, "Storage error: {}", msg),
            AppError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BindingError::PermissionDenied => write!(f, "Camera permission required"),
            BindingError::NoCameraFound(facing) => write!(f, "No {} camera found", facing),
            BindingError::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            BindingError::Busy => write!(f, "Camera is busy"),
        }
    }
}

impl fmt::Display for TorchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TorchError::Unavailable => write!(f, "No torch available"),
            TorchError::Io(msg) => write!(f, "Torch I/O error: {}", msg),
        }
    }
}

impl fmt::Display for DetectorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectorError::UnsupportedFormat(format) => {
                write!(f, "Unsupported pixel format: {:?}", format)
            }
            DetectorError::InvalidFrame(msg) => write!(f, "Invalid frame: {}", msg),
            DetectorError::Decode(msg) => write!(f, "Decode failed: {}", msg),
            DetectorError::TaskFailed(msg) => write!(f, "Detection task failed: {}", msg),
        }
    }
}

impl fmt::Display for SessionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionError::Binding(e) => write!(f, "{}", e),
            SessionError::InvalidState(state) => {
                write!(f, "Operation not allowed in state {}", state)
            }
        }
    }
}

impl fmt::Display for GenerateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenerateError::EmptyInput => write!(f, "Please enter some text"),
            GenerateError::DataTooLong => write!(f, "Text is too long for a QR code"),
            GenerateError::Encode(msg) => write!(f, "Encoding failed: {}", msg),
            GenerateError::Image(msg) => write!(f, "Image output failed: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}
impl std::error::Error for BindingError {}
impl std::error::Error for TorchError {}
impl std::error::Error for DetectorError {}
impl std::error::Error for SessionError {}
impl std::error::Error for GenerateError {}

impl From<BindingError> for SessionError {
    fn from(err: BindingError) -> Self {
        SessionError::Binding(err)
    }
}

// Conversions from sub-errors to AppError
impl From<SessionError> for AppError {
    fn from(err: SessionError) -> Self {
        AppError::Session(err)
    }
}

impl From<BindingError> for AppError {
    fn from(err: BindingError) -> Self {
        AppError::Binding(err)
    }
}

impl From<DetectorError> for AppError {
    fn from(err: DetectorError) -> Self {
        AppError::Detector(err)
    }
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        AppError::Generate(err)
    }
}

impl From<String> for AppError {
    fn from(msg: String) -> Self {
        AppError::Other(msg)
    }
}

impl From<&str> for AppError {
    fn from(msg: &str) -> Self {
        AppError::Other(msg.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<image::ImageError> for AppError {
    fn from(err: image::ImageError) -> Self {
        AppError::Storage(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_error_names_facing() {
        let err = BindingError::NoCameraFound(CameraFacing::Front);
        assert_eq!(err.to_string(), "No front camera found");
    }

    #[test]
    fn test_binding_error_converts_through_session() {
        let err: AppError = SessionError::from(BindingError::Busy).into();
        assert!(matches!(err, AppError::Session(SessionError::Binding(BindingError::Busy))));
        assert_eq!(err.to_string(), "Session error: Camera is busy");
    }

    #[test]
    fn test_invalid_state_message() {
        let err = SessionError::InvalidState(SessionState::Terminated);
        assert_eq!(err.to_string(), "Operation not allowed in state terminated");
    }
}
