// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for QR generation

use qrscan::errors::GenerateError;
use qrscan::frame_processor::{Detector, QrAction, QrDetector};
use qrscan::generator::{generate_qr_image, generate_qr_png};
use qrscan::StillImage;

#[test]
fn test_generated_png_scans_back() {
    let text = "mailto:team@example.com?subject=Lunch%20plans";
    let png = generate_qr_png(text, 300).unwrap();

    let image = StillImage::from_bytes(&png).unwrap();
    let payload = QrDetector::new().detect_static(&image).unwrap();

    assert_eq!(payload.as_deref(), Some(text));
    assert!(matches!(QrAction::parse(text), QrAction::Email { .. }));
}

#[test]
fn test_large_still_image_is_downscaled_and_decoded() {
    let image = StillImage::from(generate_qr_image("tel:+15551234567", 1600).unwrap());
    assert!(image.width() > 640);

    let payload = QrDetector::with_max_dimension(320).detect_static(&image).unwrap();
    assert_eq!(payload.as_deref(), Some("tel:+15551234567"));
}

#[test]
fn test_generate_rejects_empty_text() {
    assert_eq!(generate_qr_png("", 256), Err(GenerateError::EmptyInput));
}
