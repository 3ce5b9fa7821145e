// SPDX-License-Identifier: MPL-2.0

//! Integration tests for constants module

use qrscan::constants::{file_formats, generator, scanner, virtual_camera};

#[test]
fn test_image_extensions_case_insensitive() {
    assert!(file_formats::is_image_extension("png"));
    assert!(file_formats::is_image_extension("JPG"));
    assert!(!file_formats::is_image_extension("mp4"));
    assert!(!file_formats::is_image_extension(""));
}

#[test]
fn test_scanner_dimension_bounds() {
    assert!(scanner::MIN_MAX_DIMENSION <= scanner::DEFAULT_MAX_DIMENSION);
}

#[test]
fn test_virtual_camera_buffers_nonzero() {
    // A zero-sized queue or pool would stall the file camera
    assert!(virtual_camera::DEFAULT_QUEUE_DEPTH > 0);
    assert!(virtual_camera::DEFAULT_POOL_SIZE > 0);
    assert!(virtual_camera::DEFAULT_FPS > 0);
}

#[test]
fn test_generator_share_file_is_png() {
    assert!(generator::SHARE_FILE_NAME.ends_with(".png"));
    // A quiet zone narrower than 4 modules breaks some readers
    assert!(generator::QUIET_ZONE_MODULES >= 4);
}
